//! Configuration schema types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete relay configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: RelaySettings,
    #[serde(default)]
    pub rules: Vec<ForwardingRule>,
}

/// One listen-port to target-host:port forwarding directive.
///
/// Ports stay textual: a port that is not numeric surfaces later as a
/// bind or dial error for this rule only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ForwardingRule {
    pub listen_port: String,
    pub target_host: String,
    pub target_port: String,
}

impl ForwardingRule {
    pub fn new(
        listen_port: impl Into<String>,
        target_host: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            listen_port: listen_port.into(),
            target_host: target_host.into(),
            target_port: target_port.into(),
        }
    }

    /// Address the relay dials for every accepted connection
    pub fn target_addr(&self) -> String {
        join_host_port(&self.target_host, &self.target_port)
    }

    /// Address the listener binds, on the given interface
    pub fn listen_addr(&self, bind_host: &str) -> String {
        join_host_port(bind_host, &self.listen_port)
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{} -> {}", self.listen_port, self.target_addr())
    }
}

/// Tunables shared by every listener
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelaySettings {
    /// Interface listeners bind on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// Per-direction copy buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Propagate end-of-stream as a write shutdown instead of closing the pair.
    ///
    /// The pair then stays open until both directions end. A client that
    /// disconnects while the target stays silent holds the target socket
    /// open until the target closes its side. Set to `false` to close the
    /// pair as soon as either direction ends.
    #[serde(default = "default_half_close")]
    pub half_close: bool,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_buffer_size() -> usize {
    8 * 1024
}

fn default_half_close() -> bool {
    true
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            buffer_size: default_buffer_size(),
            half_close: default_half_close(),
        }
    }
}

/// Join host and port, bracketing bare IPv6 literals
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RelaySettings::default();
        assert_eq!(settings.bind_host, "0.0.0.0");
        assert_eq!(settings.buffer_size, 8192);
        assert!(settings.half_close);
    }

    #[test]
    fn test_target_addr() {
        let rule = ForwardingRule::new("8080", "10.0.0.1", "80");
        assert_eq!(rule.target_addr(), "10.0.0.1:80");
        assert_eq!(rule.listen_addr("0.0.0.0"), "0.0.0.0:8080");
    }

    #[test]
    fn test_ipv6_target_is_bracketed() {
        let rule = ForwardingRule::new("8080", "::1", "80");
        assert_eq!(rule.target_addr(), "[::1]:80");

        let rule = ForwardingRule::new("8080", "[fe80::1]", "80");
        assert_eq!(rule.target_addr(), "[fe80::1]:80");
    }

    #[test]
    fn test_display() {
        let rule = ForwardingRule::new("9090", "example.com", "90");
        assert_eq!(rule.to_string(), ":9090 -> example.com:90");
    }
}
