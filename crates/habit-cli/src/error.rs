use std::io;

use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] habit_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to connect to the server: {0}")]
    Connect(#[source] AuthError),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Supabase is not configured. Run `habit config init --supabase-url <URL> --supabase-anon-key <KEY>`, or set HABIT_SUPABASE_URL and HABIT_SUPABASE_ANON_KEY."
    )]
    NotConfigured,
    #[error("Habit name cannot be empty")]
    EmptyHabitName,
    #[error("Habit ID cannot be empty")]
    EmptyHabitId,
    #[error("Habit not found for id/prefix/name: {0}")]
    HabitNotFound(String),
    #[error("{0}")]
    AmbiguousHabit(String),
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Position must be 1 or greater")]
    InvalidPosition,
}
