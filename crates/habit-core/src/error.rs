//! Error types for habit-core

use thiserror::Error;

/// Result type alias using habit-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in habit-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Habit not found in local state or on the remote
    #[error("Habit not found: {0}")]
    NotFound(String),

    /// Completion toggles are only accepted for today and earlier
    #[error("Cannot mark {day} before it happens (today is {today})")]
    FutureDay { day: String, today: String },

    /// Remote collaborator rejected or failed a request
    #[error("Remote error: {0}")]
    Remote(String),

    /// Loading habits failed; local state was left untouched
    #[error("Failed to load habits: {0}")]
    Load(String),

    /// A mutation failed and local state was resynchronized from the remote
    #[error("Failed to {operation} habit: {reason}")]
    Mutation {
        operation: &'static str,
        reason: String,
        resynced: bool,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
