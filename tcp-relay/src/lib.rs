//! TCP port-forwarding relay: one listener per rule, raw bytes copied both ways

pub mod config;
pub mod error;
pub mod proxy;

// Re-export commonly used types
pub use config::{Config, ConfigLoader, FileRuleSource, ForwardingRule, RelaySettings, RuleSource};
pub use error::{RelayError, Result, RuleError};
pub use proxy::{ConnectionForwarder, ProxyRunner, RuleListener, RunningProxy};
