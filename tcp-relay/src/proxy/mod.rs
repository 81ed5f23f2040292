//! Listening, dialing and byte relaying

pub mod forwarder;
pub mod listener;
pub mod runner;

pub use forwarder::{ConnectionForwarder, ConnectionPair, PairCloser, RelayHandle};
pub use listener::RuleListener;
pub use runner::{ProxyRunner, RuleOutcome, RunningProxy};
