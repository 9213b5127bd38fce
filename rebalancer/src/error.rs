//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during a rebalancer run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read input file {path}: {source}")]
    InputRead { path: PathBuf, source: csv::Error },

    #[error("{path} row {row}: {reason}")]
    InputRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error(transparent)]
    Engine(#[from] taxfolio::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
