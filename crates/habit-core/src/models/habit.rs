//! Habit model

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CompletionState, DayKey};
use crate::{Error, Result};

pub const DEFAULT_ICON: &str = "⭐";
pub const DEFAULT_COLOR: &str = "#4CAF50";

/// Icons offered by the habit form.
pub const AVAILABLE_ICONS: [&str; 16] = [
    "⭐", "💪", "📚", "🏃", "💧", "🧘", "🎯", "✍️", "🌱", "🎵", "🍎", "💤", "📱", "🏠", "💰", "❤️",
];

/// Colors offered by the habit form.
pub const COLOR_PALETTE: [&str; 8] = [
    "#4CAF50", "#2196F3", "#FF9800", "#E91E63", "#9C27B0", "#00BCD4", "#FFC107", "#795548",
];

const MAX_ICON_CHARS: usize = 8;

/// Identifier assigned to a habit by the backend.
///
/// The value is opaque to clients; it is only compared and sent back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user-editable display fields of a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitFields {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub color: String,
}

impl HabitFields {
    /// Fields for a habit with the default icon and color.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: DEFAULT_ICON.to_string(),
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Trim and validate every field, filling defaults for blank icon/color.
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Please enter a habit name".to_string()));
        }

        let icon = self.icon.trim();
        let icon = if icon.is_empty() {
            DEFAULT_ICON.to_string()
        } else if icon.chars().any(char::is_whitespace) || icon.chars().count() > MAX_ICON_CHARS
        {
            return Err(Error::InvalidInput(format!(
                "Icon must be a single glyph, got '{icon}'"
            )));
        } else {
            icon.to_string()
        };

        Ok(Self {
            name,
            icon,
            description: self.description.trim().to_string(),
            color: normalize_color(&self.color)?,
        })
    }
}

/// Normalize a hex color to `#RRGGBB` upper case; blank means the default.
pub fn normalize_color(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_COLOR.to_string());
    }

    let invalid = || Error::InvalidInput(format!("'{trimmed}' is not a hex color like #4CAF50"));
    let digits = trimmed.strip_prefix('#').ok_or_else(invalid)?;
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    match digits.len() {
        6 => Ok(format!("#{}", digits.to_ascii_uppercase())),
        3 => {
            let expanded = digits
                .chars()
                .flat_map(|ch| [ch, ch])
                .collect::<String>()
                .to_ascii_uppercase();
            Ok(format!("#{expanded}"))
        }
        _ => Err(invalid()),
    }
}

/// A habit together with the days it was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub color: String,
    /// Explicit list position; lower sorts first
    pub position: i64,
    /// Days marked done, iterated oldest first
    pub completed_days: BTreeSet<DayKey>,
}

impl Habit {
    /// Whether the habit is marked done on `day`.
    #[must_use]
    pub fn is_completed_on(&self, day: DayKey) -> bool {
        self.completed_days.contains(&day)
    }

    #[must_use]
    pub fn state_on(&self, day: DayKey) -> CompletionState {
        CompletionState::from_completed(self.is_completed_on(day))
    }

    /// Flip membership of `day` and return the new state.
    pub fn toggle_day(&mut self, day: DayKey) -> CompletionState {
        if self.completed_days.remove(&day) {
            CompletionState::Incomplete
        } else {
            self.completed_days.insert(day);
            CompletionState::Complete
        }
    }

    /// Force membership of `day` to match `state`.
    pub fn set_state(&mut self, day: DayKey, state: CompletionState) {
        if state.is_complete() {
            self.completed_days.insert(day);
        } else {
            self.completed_days.remove(&day);
        }
    }

    #[must_use]
    pub fn fields(&self) -> HabitFields {
        HabitFields {
            name: self.name.clone(),
            icon: self.icon.clone(),
            description: self.description.clone(),
            color: self.color.clone(),
        }
    }

    /// Most recent completed day, if any.
    #[must_use]
    pub fn last_completed(&self) -> Option<DayKey> {
        self.completed_days.iter().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn habit() -> Habit {
        Habit {
            id: HabitId::new("h1"),
            name: "Read".to_string(),
            icon: "📚".to_string(),
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
            position: 0,
            completed_days: BTreeSet::new(),
        }
    }

    fn day(value: &str) -> DayKey {
        value.parse().unwrap()
    }

    #[test]
    fn fields_default_icon_and_color() {
        let fields = HabitFields::new("  Drink Water ").normalized().unwrap();
        assert_eq!(fields.name, "Drink Water");
        assert_eq!(fields.icon, DEFAULT_ICON);
        assert_eq!(fields.color, DEFAULT_COLOR);
        assert_eq!(fields.description, "");
    }

    #[test]
    fn fields_reject_blank_name() {
        assert!(HabitFields::new("   ").normalized().is_err());
    }

    #[test]
    fn fields_accept_multi_codepoint_icons() {
        for icon in AVAILABLE_ICONS {
            let fields = HabitFields::new("x").with_icon(icon).normalized().unwrap();
            assert_eq!(fields.icon, icon);
        }
        assert!(HabitFields::new("x")
            .with_icon("two words")
            .normalized()
            .is_err());
    }

    #[test]
    fn normalize_color_variants() {
        assert_eq!(normalize_color("#4caf50").unwrap(), "#4CAF50");
        assert_eq!(normalize_color("#abc").unwrap(), "#AABBCC");
        assert_eq!(normalize_color("").unwrap(), DEFAULT_COLOR);
        assert!(normalize_color("4CAF50").is_err());
        assert!(normalize_color("#12345").is_err());
        assert!(normalize_color("#GGGGGG").is_err());
    }

    #[test]
    fn toggle_day_is_self_inverse() {
        let mut habit = habit();
        let target = day("2024-05-01");

        assert_eq!(habit.toggle_day(target), CompletionState::Complete);
        assert!(habit.is_completed_on(target));
        assert_eq!(habit.toggle_day(target), CompletionState::Incomplete);
        assert!(habit.completed_days.is_empty());
    }

    #[test]
    fn set_state_never_duplicates() {
        let mut habit = habit();
        let target = day("2024-05-01");
        habit.set_state(target, CompletionState::Complete);
        habit.set_state(target, CompletionState::Complete);
        assert_eq!(habit.completed_days.len(), 1);
    }

    #[test]
    fn completed_days_iterate_chronologically() {
        let mut habit = habit();
        habit.toggle_day(day("2024-03-02"));
        habit.toggle_day(day("2023-12-31"));
        habit.toggle_day(day("2024-01-15"));

        let ordered = habit
            .completed_days
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(ordered, vec!["2023-12-31", "2024-01-15", "2024-03-02"]);
        assert_eq!(habit.last_completed(), Some(day("2024-03-02")));
        assert_eq!(habit.state_on(day("2024-01-15")), CompletionState::Complete);
        assert_eq!(habit.state_on(day("2024-01-16")), CompletionState::Incomplete);
    }
}
