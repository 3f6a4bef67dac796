//! Crate-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OmniError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("file too large: {path} ({size} bytes, limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },
}

pub type OmniResult<T> = Result<T, OmniError>;
