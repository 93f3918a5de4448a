use std::path::PathBuf;
use thiserror::Error;

/// Main error type for servicemap operations
#[derive(Error, Debug)]
pub enum ServicemapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parser error: {0}")]
    Parser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Analysis root {path} is not accessible: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ServicemapError>;
