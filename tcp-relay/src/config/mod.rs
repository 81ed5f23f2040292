//! Configuration management for the relay

pub mod loader;
pub mod schema;
pub mod source;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::{Config, ForwardingRule, RelaySettings};
pub use source::{FileRuleSource, RuleSource, StaticRuleSource};
pub use validator::ConfigValidator;
