//! Data models for habit-grid

mod day_key;
mod habit;

pub use day_key::{CompletionState, DayKey};
pub use habit::{
    normalize_color, Habit, HabitFields, HabitId, AVAILABLE_ICONS, COLOR_PALETTE, DEFAULT_COLOR,
    DEFAULT_ICON,
};
