//! habit-core - Core library for habit-grid
//!
//! This crate contains the habit models, the completion store that keeps
//! local state in step with the hosted backend, and the calendar grid
//! generator used by every client to draw completion history.

pub mod auth;
pub mod config;
pub mod error;
pub mod grid;
pub mod models;
pub mod remote;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use grid::{CalendarGrid, CellState, GridCell, GridLayout, MAX_TRAILING_DAYS};
pub use models::{CompletionState, DayKey, Habit, HabitFields, HabitId};
pub use store::{HabitStore, PendingToggle};
