//! Configuration file loading

use super::schema::{Config, ForwardingRule};
use super::validator::ConfigValidator;
use crate::error::{RelayError, Result, RuleError};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate config from a file.
    ///
    /// `.toml` files carry settings and a `[[rules]]` table; anything else is
    /// read as a plain rule file with one `listenPort targetHost targetPort`
    /// record per line.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| RelayError::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));

        let mut config = if is_toml {
            Self::parse_toml(&contents)?
        } else {
            Config {
                settings: Default::default(),
                rules: Self::parse_rules(&contents),
            }
        };

        config.rules = ConfigValidator::validate(config.rules);
        debug!("Loaded {} rule(s) from {:?}", config.rules.len(), path);
        Ok(config)
    }

    /// Parse a TOML document
    pub fn parse_toml(contents: &str) -> Result<Config> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Parse a plain rule file. Malformed lines are logged and skipped,
    /// never fatal to the rest of the batch.
    pub fn parse_rules(contents: &str) -> Vec<ForwardingRule> {
        let mut rules = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            match Self::parse_rule_line(line) {
                None => {}
                Some(Ok(rule)) => rules.push(rule),
                Some(Err(source)) => {
                    let err = RelayError::InvalidRule {
                        line: idx + 1,
                        source,
                    };
                    warn!("Skipping {:?}: {}", line, err);
                }
            }
        }
        rules
    }

    /// Parse one line of a plain rule file.
    ///
    /// Returns `None` for blank lines and `#` comments.
    pub fn parse_rule_line(line: &str) -> Option<std::result::Result<ForwardingRule, RuleError>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Some(Err(RuleError::FieldCount {
                count: fields.len(),
            }));
        }

        Some(Ok(ForwardingRule::new(fields[0], fields[1], fields[2])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_malformed_line_is_skipped() {
        let rules = ConfigLoader::parse_rules("8080 10.0.0.1 80\nbad line\n9090 10.0.0.2 90\n");

        assert_eq!(
            rules,
            vec![
                ForwardingRule::new("8080", "10.0.0.1", "80"),
                ForwardingRule::new("9090", "10.0.0.2", "90"),
            ]
        );
    }

    #[test]
    fn test_field_count() {
        assert_eq!(
            ConfigLoader::parse_rule_line("8080 host"),
            Some(Err(RuleError::FieldCount { count: 2 }))
        );
        assert_eq!(
            ConfigLoader::parse_rule_line("8080 host 80 extra"),
            Some(Err(RuleError::FieldCount { count: 4 }))
        );
    }

    #[test]
    fn test_whitespace_and_comments() {
        assert_eq!(ConfigLoader::parse_rule_line(""), None);
        assert_eq!(ConfigLoader::parse_rule_line("   "), None);
        assert_eq!(ConfigLoader::parse_rule_line("# 8080 host 80"), None);
        assert_eq!(
            ConfigLoader::parse_rule_line("  8080\thost   80 "),
            Some(Ok(ForwardingRule::new("8080", "host", "80")))
        );
    }

    #[test]
    fn test_ports_stay_textual() {
        let rule = ConfigLoader::parse_rule_line("http example.com https")
            .unwrap()
            .unwrap();
        assert_eq!(rule.listen_port, "http");
        assert_eq!(rule.target_port, "https");
    }

    #[test]
    fn test_load_plain_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "8080 10.0.0.1 80").unwrap();
        writeln!(file, "bad line").unwrap();
        writeln!(file, "9090 10.0.0.2 90").unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].listen_port, "8080");
        assert_eq!(config.rules[1].listen_port, "9090");
        assert_eq!(config.settings, Default::default());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[settings]
bind_host = "127.0.0.1"
half_close = false

[[rules]]
listen_port = "8080"
target_host = "10.0.0.1"
target_port = "80"

[[rules]]
listen_port = ""
target_host = "10.0.0.2"
target_port = "90"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.settings.bind_host, "127.0.0.1");
        assert_eq!(config.settings.buffer_size, 8192);
        assert!(!config.settings.half_close);
        assert_eq!(config.rules, vec![ForwardingRule::new("8080", "10.0.0.1", "80")]);
    }

    #[test]
    fn test_invalid_toml_is_fatal() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[[rules]\nlisten_port = ").unwrap();

        let result = ConfigLoader::load_from_file(file.path());
        assert!(matches!(result, Err(RelayError::ConfigParse(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.conf");

        match ConfigLoader::load_from_file(&path) {
            Err(RelayError::ConfigLoad { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected ConfigLoad error, got {:?}", other),
        }
    }
}
