//! Shared error type for training, data handling, and model IO.

use std::io;

/// Errors surfaced by the histboost core.
///
/// Every failure is propagated to the caller; nothing is retried or
/// swallowed at this layer. The CLI maps any variant to a non-zero exit
/// code, the HTTP server maps them onto 400/404/500.
#[derive(Debug, thiserror::Error)]
pub enum BoostError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("parse error at row {row}, col {col}: {message}")]
    Parse {
        row: usize,
        col: usize,
        message: String,
    },

    #[error("model is not trained yet")]
    NotTrained,

    #[error("invalid model format: {0}")]
    ModelFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BoostError>;
