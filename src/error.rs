use crate::models::NodeId;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("operation was cancelled")]
    Cancelled,
    #[error("failed to resolve children of '{id}': {source}")]
    Resolve {
        id: NodeId,
        #[source]
        source: BoxError,
    },
}

impl TreeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TreeError::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum DecorationError {
    #[error("decoration request was cancelled")]
    Cancelled,
    #[error("decoration provider failed: {0}")]
    Provider(String),
}

impl DecorationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecorationError::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
