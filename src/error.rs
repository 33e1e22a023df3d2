// src/error.rs
use thiserror::Error;

/// Outcome of a poll request that did not produce a result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PollError {
    #[error("Unknown poll")]
    UnknownPoll,
    #[error("Database connection error")]
    DatabaseConnection,
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for PollError {
    fn from(err: sqlx::Error) -> Self {
        PollError::Backend(err.to_string())
    }
}
