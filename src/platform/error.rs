//! Error type shared by the library and the CLI.

use thiserror::Error;

pub type JfuzzResult<T> = Result<T, JfuzzError>;

#[derive(Debug, Error)]
pub enum JfuzzError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed document: {0}")]
    Parse(String),

    #[error("session already has a document loaded")]
    AlreadyLoaded,

    #[error("session has no document loaded")]
    NotLoaded,

    #[error("session was already mutated; create a new session and load the document again")]
    AlreadyConsumed,

    #[error("mutation oracle {program:?} is not available: {reason}")]
    OracleUnavailable { program: String, reason: String },

    #[error("mutation oracle failed: {0}")]
    Oracle(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
