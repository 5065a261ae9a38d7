//! Remote persistence collaborator.
//!
//! The backend owns durable storage in two tables, `habits` and
//! `habit_completions`. This module defines the row shapes, the
//! [`HabitRemote`] trait the completion store talks to, and the
//! client-side join that turns rows into [`Habit`] values.

mod memory;
pub(crate) mod postgrest;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{normalize_color, CompletionState, DayKey, Habit, HabitFields, HabitId};
use crate::Result;

pub use memory::{InMemoryRemote, RemoteOperation};
pub use postgrest::{normalize_rest_url, PostgrestRemote, DEFAULT_REQUEST_TIMEOUT};

/// A row of the `habits` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl HabitRecord {
    /// Attach a completion set, filling defaults for nullable columns.
    #[must_use]
    pub fn into_habit(self, completed_days: BTreeSet<DayKey>) -> Habit {
        let fields = HabitFields {
            name: self.name,
            icon: self.icon.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            color: self.color.unwrap_or_default(),
        };
        let color = normalize_color(&fields.color).unwrap_or_else(|_| fields.color.clone());
        let icon = if fields.icon.trim().is_empty() {
            crate::models::DEFAULT_ICON.to_string()
        } else {
            fields.icon
        };

        Habit {
            id: HabitId::new(self.id),
            name: fields.name,
            icon,
            description: fields.description,
            color,
            position: self.position.unwrap_or_default(),
            completed_days,
        }
    }
}

/// A row of the `habit_completions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub habit_id: String,
    pub completion_date: NaiveDate,
}

impl CompletionRecord {
    #[must_use]
    pub fn day(&self) -> DayKey {
        DayKey::from_date(self.completion_date)
    }
}

/// Payload for inserting a new habit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHabit {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub color: String,
    pub position: i64,
    pub user_id: String,
}

impl NewHabit {
    #[must_use]
    pub fn new(fields: HabitFields, position: i64, user_id: impl Into<String>) -> Self {
        Self {
            name: fields.name,
            icon: fields.icon,
            description: fields.description,
            color: fields.color,
            position,
            user_id: user_id.into(),
        }
    }
}

/// Full `habits` row written by a bulk position upsert.
///
/// The upsert inserts-or-merges on `id`, so every non-null column travels
/// with the new position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitPositionRow {
    pub id: HabitId,
    #[serde(flatten)]
    pub row: NewHabit,
}

impl HabitPositionRow {
    #[must_use]
    pub fn new(habit: &Habit, user_id: impl Into<String>) -> Self {
        Self {
            id: habit.id.clone(),
            row: NewHabit::new(habit.fields(), habit.position, user_id),
        }
    }
}

/// Persistence operations offered by the backend.
///
/// Every query is implicitly scoped to the authenticated user by the
/// backend's row-level policies; `list_habits` additionally filters by
/// `user_id`.
#[async_trait]
pub trait HabitRemote: Send + Sync {
    /// Habits owned by `user_id`, by position then creation time.
    async fn list_habits(&self, user_id: &str) -> Result<Vec<HabitRecord>>;

    /// Completion rows belonging to any of `habit_ids`.
    async fn list_completions(&self, habit_ids: &[HabitId]) -> Result<Vec<CompletionRecord>>;

    async fn create_habit(&self, habit: &NewHabit) -> Result<HabitRecord>;

    async fn update_habit(&self, id: &HabitId, fields: &HabitFields) -> Result<HabitRecord>;

    /// Delete a habit; the backend cascades to its completion rows.
    async fn delete_habit(&self, id: &HabitId) -> Result<()>;

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        day: DayKey,
    ) -> Result<Option<CompletionRecord>>;

    /// Store a completion row. A row that already exists for the pair counts
    /// as stored.
    async fn insert_completion(&self, habit_id: &HabitId, day: DayKey) -> Result<()>;

    async fn delete_completion(&self, completion_id: &str) -> Result<()>;

    /// Write new positions for `rows` in a single request; either every row
    /// is updated or none is.
    async fn update_habit_positions(&self, rows: &[HabitPositionRow]) -> Result<()>;
}

/// Flip the stored completion for `(habit_id, day)` and report the new state.
///
/// Looks the row up first so that at most one row exists per pair. The
/// lookup and the write are separate requests, so a second session toggling
/// the same pair in between can still race.
pub async fn toggle_completion(
    remote: &dyn HabitRemote,
    habit_id: &HabitId,
    day: DayKey,
) -> Result<CompletionState> {
    if let Some(existing) = remote.find_completion(habit_id, day).await? {
        remote.delete_completion(&existing.id).await?;
        Ok(CompletionState::Incomplete)
    } else {
        remote.insert_completion(habit_id, day).await?;
        Ok(CompletionState::Complete)
    }
}

/// Join habit rows with completion rows by habit id.
pub fn join_completions(
    habits: Vec<HabitRecord>,
    completions: Vec<CompletionRecord>,
) -> Vec<Habit> {
    let mut days_by_habit: HashMap<String, BTreeSet<DayKey>> = HashMap::new();
    for completion in completions {
        let day = completion.day();
        days_by_habit
            .entry(completion.habit_id)
            .or_default()
            .insert(day);
    }

    habits
        .into_iter()
        .map(|record| {
            let days = days_by_habit.remove(&record.id).unwrap_or_default();
            record.into_habit(days)
        })
        .collect()
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Number(value) => value.to_string(),
    })
}
