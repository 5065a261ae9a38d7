//! In-process implementation of [`HabitRemote`].
//!
//! Behaves like the hosted tables: ids are assigned on insert, a unique
//! constraint covers `(habit_id, completion_date)` and deleting a habit
//! cascades to its completions. Individual operations can be made to fail
//! to exercise the store's resync path.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{CompletionRecord, HabitPositionRow, HabitRecord, HabitRemote, NewHabit};
use crate::models::{DayKey, HabitFields, HabitId};
use crate::{Error, Result};

/// Operations that can be targeted by fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    ListHabits,
    ListCompletions,
    CreateHabit,
    UpdateHabit,
    DeleteHabit,
    FindCompletion,
    InsertCompletion,
    DeleteCompletion,
    UpdatePositions,
}

#[derive(Default)]
struct Tables {
    habits: Vec<(HabitRecord, String)>,
    completions: Vec<CompletionRecord>,
    fail_next: HashSet<RemoteOperation>,
    offline: bool,
    requests: HashMap<RemoteOperation, usize>,
}

impl Tables {
    fn begin(&mut self, operation: RemoteOperation) -> Result<()> {
        *self.requests.entry(operation).or_default() += 1;
        if self.offline || self.fail_next.remove(&operation) {
            return Err(Error::Remote(format!(
                "{operation:?} failed: network request failed"
            )));
        }
        Ok(())
    }
}

/// Shared in-memory tables; clones observe the same data.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail once.
    pub fn fail_next(&self, operation: RemoteOperation) {
        self.lock().fail_next.insert(operation);
    }

    /// Fail every call until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of calls made for `operation`, including failed ones.
    pub fn request_count(&self, operation: RemoteOperation) -> usize {
        self.lock().requests.get(&operation).copied().unwrap_or(0)
    }

    /// Total calls across all operations.
    pub fn total_requests(&self) -> usize {
        self.lock().requests.values().sum()
    }

    /// Number of completion rows stored for `(habit_id, day)`.
    pub fn stored_completions(&self, habit_id: &HabitId, day: DayKey) -> usize {
        self.lock()
            .completions
            .iter()
            .filter(|row| row.habit_id == habit_id.as_str() && row.day() == day)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl HabitRemote for InMemoryRemote {
    async fn list_habits(&self, user_id: &str) -> Result<Vec<HabitRecord>> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::ListHabits)?;

        let mut rows = tables
            .habits
            .iter()
            .filter(|(_, owner)| owner == user_id)
            .map(|(row, _)| row.clone())
            .collect::<Vec<_>>();
        rows.sort_by_key(|row| (row.position.unwrap_or(i64::MAX), row.created_at));
        Ok(rows)
    }

    async fn list_completions(&self, habit_ids: &[HabitId]) -> Result<Vec<CompletionRecord>> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::ListCompletions)?;

        Ok(tables
            .completions
            .iter()
            .filter(|row| habit_ids.iter().any(|id| id.as_str() == row.habit_id))
            .cloned()
            .collect())
    }

    async fn create_habit(&self, habit: &NewHabit) -> Result<HabitRecord> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::CreateHabit)?;

        // Keep created_at strictly increasing so ordering is deterministic.
        let offset = i64::try_from(tables.habits.len()).unwrap_or(i64::MAX);
        let record = HabitRecord {
            id: Uuid::now_v7().to_string(),
            name: habit.name.clone(),
            icon: Some(habit.icon.clone()),
            description: Some(habit.description.clone()),
            color: Some(habit.color.clone()),
            position: Some(habit.position),
            created_at: Utc::now() + Duration::microseconds(offset),
        };
        tables.habits.push((record.clone(), habit.user_id.clone()));
        Ok(record)
    }

    async fn update_habit(&self, id: &HabitId, fields: &HabitFields) -> Result<HabitRecord> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::UpdateHabit)?;

        let (row, _) = tables
            .habits
            .iter_mut()
            .find(|(row, _)| row.id == id.as_str())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        row.name.clone_from(&fields.name);
        row.icon = Some(fields.icon.clone());
        row.description = Some(fields.description.clone());
        row.color = Some(fields.color.clone());
        Ok(row.clone())
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<()> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::DeleteHabit)?;

        tables.habits.retain(|(row, _)| row.id != id.as_str());
        tables.completions.retain(|row| row.habit_id != id.as_str());
        Ok(())
    }

    async fn find_completion(
        &self,
        habit_id: &HabitId,
        day: DayKey,
    ) -> Result<Option<CompletionRecord>> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::FindCompletion)?;

        Ok(tables
            .completions
            .iter()
            .find(|row| row.habit_id == habit_id.as_str() && row.day() == day)
            .cloned())
    }

    async fn insert_completion(&self, habit_id: &HabitId, day: DayKey) -> Result<()> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::InsertCompletion)?;

        if !tables.habits.iter().any(|(row, _)| row.id == habit_id.as_str()) {
            return Err(Error::Remote(format!(
                "insert violates foreign key: habit {habit_id} does not exist"
            )));
        }
        if tables
            .completions
            .iter()
            .any(|row| row.habit_id == habit_id.as_str() && row.day() == day)
        {
            // Unique (habit_id, completion_date): the row is already there.
            return Ok(());
        }

        tables.completions.push(CompletionRecord {
            id: Uuid::now_v7().to_string(),
            habit_id: habit_id.to_string(),
            completion_date: day.date(),
        });
        Ok(())
    }

    async fn delete_completion(&self, completion_id: &str) -> Result<()> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::DeleteCompletion)?;

        tables.completions.retain(|row| row.id != completion_id);
        Ok(())
    }

    async fn update_habit_positions(&self, rows: &[HabitPositionRow]) -> Result<()> {
        let mut tables = self.lock();
        tables.begin(RemoteOperation::UpdatePositions)?;

        for update in rows {
            if let Some((row, _)) = tables
                .habits
                .iter_mut()
                .find(|(row, _)| row.id == update.id.as_str())
            {
                row.position = Some(update.row.position);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::toggle_completion;

    async fn seeded() -> (InMemoryRemote, HabitId) {
        let remote = InMemoryRemote::new();
        let record = remote
            .create_habit(&NewHabit::new(HabitFields::new("Water"), 0, "user-1"))
            .await
            .unwrap();
        (remote, HabitId::new(record.id))
    }

    #[tokio::test]
    async fn toggle_inserts_then_deletes() {
        let (remote, habit_id) = seeded().await;
        let day = DayKey::parse_legacy("2024-5-1").unwrap();

        let first = toggle_completion(&remote, &habit_id, day).await.unwrap();
        assert!(first.is_complete());
        assert_eq!(remote.stored_completions(&habit_id, day), 1);

        let second = toggle_completion(&remote, &habit_id, day).await.unwrap();
        assert!(!second.is_complete());
        assert_eq!(remote.stored_completions(&habit_id, day), 0);
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_single_row() {
        let (remote, habit_id) = seeded().await;
        let day: DayKey = "2024-06-01".parse().unwrap();

        remote.insert_completion(&habit_id, day).await.unwrap();
        remote.insert_completion(&habit_id, day).await.unwrap();
        assert_eq!(remote.stored_completions(&habit_id, day), 1);
    }

    #[tokio::test]
    async fn insert_for_unknown_habit_is_rejected() {
        let (remote, _) = seeded().await;
        let day: DayKey = "2024-06-01".parse().unwrap();

        let missing = HabitId::new("missing");
        assert!(remote.insert_completion(&missing, day).await.is_err());
        assert_eq!(remote.stored_completions(&missing, day), 0);
    }

    #[tokio::test]
    async fn delete_habit_cascades() {
        let (remote, habit_id) = seeded().await;
        let day: DayKey = "2024-06-01".parse().unwrap();
        remote.insert_completion(&habit_id, day).await.unwrap();

        remote.delete_habit(&habit_id).await.unwrap();
        assert_eq!(remote.stored_completions(&habit_id, day), 0);
        assert!(remote.list_habits("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn habits_are_scoped_to_user() {
        let (remote, _) = seeded().await;
        assert_eq!(remote.list_habits("user-1").await.unwrap().len(), 1);
        assert!(remote.list_habits("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fail_next_fails_once() {
        let (remote, _) = seeded().await;
        remote.fail_next(RemoteOperation::ListHabits);

        assert!(remote.list_habits("user-1").await.is_err());
        assert!(remote.list_habits("user-1").await.is_ok());
        assert_eq!(remote.request_count(RemoteOperation::ListHabits), 2);
    }
}
