//! Error type shared by the engine and its storage layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    /// Input rejected before anything was written, e.g. a malformed backup.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} `{name}` already exists")]
    NameConflict { kind: &'static str, name: String },

    /// An atomic multi-collection operation failed and was rolled back.
    #[error("transaction rolled back, nothing was modified: {0}")]
    Transaction(#[source] Box<Error>),

    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn rolled_back(self) -> Self {
        match self {
            Self::Transaction(_) => self,
            other => Self::Transaction(Box::new(other)),
        }
    }
}
