//! Rule sources feeding the runner

use super::loader::ConfigLoader;
use super::schema::{Config, ForwardingRule, RelaySettings};
use super::validator::ConfigValidator;
use crate::error::Result;
use std::path::PathBuf;

/// Trait for anything that can produce an ordered list of forwarding rules
pub trait RuleSource: Send + Sync {
    /// Produce the configuration to run. An error here is the only
    /// process-fatal condition; individual bad rules are dropped instead.
    fn load(&self) -> Result<Config>;
}

/// Rules read from a file on disk
pub struct FileRuleSource {
    path: PathBuf,
}

impl FileRuleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RuleSource for FileRuleSource {
    fn load(&self) -> Result<Config> {
        ConfigLoader::load_from_file(&self.path)
    }
}

/// Rules held in memory
pub struct StaticRuleSource {
    config: Config,
}

impl StaticRuleSource {
    pub fn new(settings: RelaySettings, rules: Vec<ForwardingRule>) -> Self {
        Self {
            config: Config { settings, rules },
        }
    }
}

impl RuleSource for StaticRuleSource {
    fn load(&self) -> Result<Config> {
        let mut config = self.config.clone();
        config.rules = ConfigValidator::validate(config.rules);
        Ok(config)
    }
}
