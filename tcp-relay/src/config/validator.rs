//! Rule validation

use super::schema::ForwardingRule;
use crate::error::RuleError;
use std::collections::HashSet;
use tracing::warn;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Filter a rule list down to the rules that can be started.
    ///
    /// Rejected rules are logged and dropped; the rest keep their order.
    pub fn validate(rules: Vec<ForwardingRule>) -> Vec<ForwardingRule> {
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(rules.len());

        for rule in rules {
            match Self::check_rule(&rule, &seen) {
                Ok(()) => {
                    seen.insert(rule.listen_port.clone());
                    valid.push(rule);
                }
                Err(e) => warn!("Skipping rule {}: {}", rule, e),
            }
        }

        valid
    }

    /// Check a single rule against the listen ports already accepted
    pub fn check_rule(
        rule: &ForwardingRule,
        seen_ports: &HashSet<String>,
    ) -> Result<(), RuleError> {
        for (field, value) in [
            ("listen port", &rule.listen_port),
            ("target host", &rule.target_host),
            ("target port", &rule.target_port),
        ] {
            if value.trim().is_empty() {
                return Err(RuleError::EmptyField { field });
            }
        }

        if seen_ports.contains(&rule.listen_port) {
            return Err(RuleError::DuplicatePort {
                port: rule.listen_port.clone(),
            });
        }

        Ok(())
    }
}
