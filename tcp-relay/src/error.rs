//! Error types for relay operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid rule on line {line}: {source}")]
    InvalidRule {
        line: usize,
        #[source]
        source: RuleError,
    },

    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Failed to connect to target {target}: {source}")]
    Dial {
        target: String,
        source: std::io::Error,
    },

    #[error("Failed to accept client connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a single forwarding rule is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("expected 3 fields, got {count}")]
    FieldCount { count: usize },

    #[error("empty {field}")]
    EmptyField { field: &'static str },

    #[error("listen port {port} already used by an earlier rule")]
    DuplicatePort { port: String },
}
