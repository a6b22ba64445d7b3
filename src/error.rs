// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OmsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse structure {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    /// The periodic distance from an atom to itself is not zero.
    #[error("the self distance of atom {index} appears to be non-zero ({distance})")]
    CorruptDistanceMatrix { index: usize, distance: f64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration {path}: {detail}")]
    Config { path: PathBuf, detail: String },

    #[error("worker failed: {0}")]
    Worker(String),
}

pub type OmsResult<T> = Result<T, OmsError>;

impl OmsError {
    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
