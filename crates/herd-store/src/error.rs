use herd_shared::constants::NETWORK_ERROR_MESSAGE;
use herd_shared::{DecodeError, TreeError};
use thiserror::Error;

/// Errors produced by the sync layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A single-document read found nothing at the key.
    #[error("The requested document {collection}/{key} does not exist")]
    NotFound { collection: String, key: String },

    /// The backend could not be reached or rejected the call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A document did not decode into the requested entity.
    #[error(transparent)]
    Malformed(#[from] DecodeError),

    /// A comment tree mutation was rejected.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// SQLite error in the local document store.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored document body could not be (de)serialised.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// An operation was driven through a transition its state forbids.
    #[error("Operation cannot move from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// A command's precondition did not hold (e.g. service unavailable).
    #[error("{0}")]
    Rejected(String),
}

impl StoreError {
    /// Text placed into an operation's failure state.
    ///
    /// Transport-level failures collapse to the fixed network message; the
    /// underlying cause is logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Transport(_) | StoreError::Sqlite(_) | StoreError::Io(_) => {
                NETWORK_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Transport(_) | StoreError::Sqlite(_) | StoreError::Io(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
