//! Completion store.
//!
//! [`HabitStore`] owns the habits loaded for one user and keeps them in step
//! with a [`HabitRemote`]. Completion toggles are applied locally first and
//! then committed; when any remote mutation fails, the store reloads the
//! whole list and reports the failure as [`Error::Mutation`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{CompletionState, DayKey, Habit, HabitFields, HabitId};
use crate::remote::{
    join_completions, toggle_completion, HabitPositionRow, HabitRemote, NewHabit,
};
use crate::{Error, Result};

/// An optimistic toggle that has been applied locally but not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending toggle must be committed"]
pub struct PendingToggle {
    pub habit_id: HabitId,
    pub day: DayKey,
    /// Membership shown to the user until the commit resolves.
    pub expected: CompletionState,
}

pub struct HabitStore {
    remote: Arc<dyn HabitRemote>,
    user_id: String,
    habits: Vec<Habit>,
}

impl std::fmt::Debug for HabitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabitStore")
            .field("user_id", &self.user_id)
            .field("habits", &self.habits.len())
            .finish_non_exhaustive()
    }
}

impl HabitStore {
    pub fn new(remote: Arc<dyn HabitRemote>, user_id: impl Into<String>) -> Self {
        Self {
            remote,
            user_id: user_id.into(),
            habits: Vec::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Habits in display order.
    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn habit(&self, id: &HabitId) -> Option<&Habit> {
        self.habits.iter().find(|habit| &habit.id == id)
    }

    fn index_of(&self, id: &HabitId) -> Result<usize> {
        self.habits
            .iter()
            .position(|habit| &habit.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Replace local state with the user's habits and their completions.
    ///
    /// On failure local state is left as it was.
    pub async fn load_all(&mut self) -> Result<&[Habit]> {
        let habits = self.fetch_all().await.map_err(|err| {
            warn!(user_id = %self.user_id, error = %err, "Failed to load habits");
            Error::Load(err.to_string())
        })?;

        debug!(count = habits.len(), "Loaded habits");
        self.habits = habits;
        Ok(&self.habits)
    }

    async fn fetch_all(&self) -> Result<Vec<Habit>> {
        let records = self.remote.list_habits(&self.user_id).await?;
        let ids = records
            .iter()
            .map(|record| HabitId::new(record.id.clone()))
            .collect::<Vec<_>>();
        let completions = self.remote.list_completions(&ids).await?;
        Ok(join_completions(records, completions))
    }

    /// Reload a single habit and its completions.
    pub async fn load_habit(&mut self, id: &HabitId) -> Result<&Habit> {
        let records = self
            .remote
            .list_habits(&self.user_id)
            .await
            .map_err(|err| Error::Load(err.to_string()))?;
        let record = records
            .into_iter()
            .find(|record| record.id == id.as_str())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let completions = self
            .remote
            .list_completions(std::slice::from_ref(id))
            .await
            .map_err(|err| Error::Load(err.to_string()))?;

        let habit = join_completions(vec![record], completions)
            .pop()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let index = match self.index_of(id) {
            Ok(index) => {
                self.habits[index] = habit;
                index
            }
            Err(_) => {
                self.habits.push(habit);
                self.habits.len() - 1
            }
        };
        Ok(&self.habits[index])
    }

    /// Create a habit at the end of the list.
    pub async fn create(&mut self, fields: HabitFields) -> Result<&Habit> {
        let fields = fields.normalized()?;
        let position = self
            .habits
            .iter()
            .map(|habit| habit.position + 1)
            .max()
            .unwrap_or(0);
        let new_habit = NewHabit::new(fields, position, self.user_id.clone());

        match self.remote.create_habit(&new_habit).await {
            Ok(record) => {
                let habit = record.into_habit(std::collections::BTreeSet::new());
                info!(habit_id = %habit.id, name = %habit.name, "Created habit");
                self.habits.push(habit);
                let last = self.habits.len() - 1;
                Ok(&self.habits[last])
            }
            Err(err) => Err(self.resync_after("add", err).await),
        }
    }

    /// Replace the display fields of a habit. Completions are re-read, never written.
    pub async fn update(&mut self, id: &HabitId, fields: HabitFields) -> Result<&Habit> {
        let fields = fields.normalized()?;
        self.index_of(id)?;

        let result = async {
            let record = self.remote.update_habit(id, &fields).await?;
            let completions = self
                .remote
                .list_completions(std::slice::from_ref(id))
                .await?;
            Ok::<_, Error>(join_completions(vec![record], completions))
        }
        .await;

        match result {
            Ok(mut updated) => {
                let index = self.index_of(id)?;
                if let Some(habit) = updated.pop() {
                    self.habits[index] = habit;
                }
                info!(habit_id = %id, "Updated habit");
                Ok(&self.habits[index])
            }
            Err(err) => Err(self.resync_after("update", err).await),
        }
    }

    /// Delete a habit; the remote cascades to its completions.
    pub async fn delete(&mut self, id: &HabitId) -> Result<()> {
        self.index_of(id)?;

        match self.remote.delete_habit(id).await {
            Ok(()) => {
                self.habits.retain(|habit| &habit.id != id);
                info!(habit_id = %id, "Deleted habit");
                Ok(())
            }
            Err(err) => Err(self.resync_after("delete", err).await),
        }
    }

    /// Apply a toggle locally without touching the remote.
    ///
    /// Days after `today` and unknown habits are rejected and leave local
    /// state unchanged.
    pub fn begin_toggle(
        &mut self,
        id: &HabitId,
        day: DayKey,
        today: DayKey,
    ) -> Result<PendingToggle> {
        if day > today {
            return Err(Error::FutureDay {
                day: day.to_string(),
                today: today.to_string(),
            });
        }
        let index = self.index_of(id)?;
        let expected = self.habits[index].toggle_day(day);

        Ok(PendingToggle {
            habit_id: id.clone(),
            day,
            expected,
        })
    }

    /// Persist a toggle started with [`Self::begin_toggle`].
    ///
    /// Local membership ends up matching what the remote reports. On failure
    /// the optimistic change is discarded and the full list is reloaded.
    pub async fn commit_toggle(&mut self, pending: PendingToggle) -> Result<CompletionState> {
        let PendingToggle {
            habit_id,
            day,
            expected,
        } = pending;

        match toggle_completion(self.remote.as_ref(), &habit_id, day).await {
            Ok(actual) => {
                if actual != expected {
                    warn!(
                        habit_id = %habit_id,
                        %day,
                        "Remote completion state differed from local state"
                    );
                }
                if let Ok(index) = self.index_of(&habit_id) {
                    self.habits[index].set_state(day, actual);
                }
                debug!(habit_id = %habit_id, %day, ?actual, "Toggled completion");
                Ok(actual)
            }
            Err(err) => {
                if let Ok(index) = self.index_of(&habit_id) {
                    self.habits[index].set_state(day, expected.flipped());
                }
                Err(self.resync_after("update", err).await)
            }
        }
    }

    /// Toggle completion of `day` for a habit.
    pub async fn toggle(
        &mut self,
        id: &HabitId,
        day: DayKey,
        today: DayKey,
    ) -> Result<CompletionState> {
        let pending = self.begin_toggle(id, day, today)?;
        self.commit_toggle(pending).await
    }

    /// Toggle the day before `today`.
    pub async fn complete_yesterday(
        &mut self,
        id: &HabitId,
        today: DayKey,
    ) -> Result<CompletionState> {
        let yesterday = today
            .previous()
            .ok_or_else(|| Error::InvalidInput(format!("no day before {today}")))?;
        self.toggle(id, yesterday, today).await
    }

    /// Move a habit to `new_index` and persist the renumbered positions.
    ///
    /// Indexes past the end move the habit last.
    pub async fn reorder(&mut self, id: &HabitId, new_index: usize) -> Result<()> {
        let from = self.index_of(id)?;
        let to = new_index.min(self.habits.len().saturating_sub(1));

        let habit = self.habits.remove(from);
        self.habits.insert(to, habit);

        let mut changed = Vec::new();
        for (index, habit) in self.habits.iter_mut().enumerate() {
            let position = i64::try_from(index).unwrap_or(i64::MAX);
            if habit.position != position {
                habit.position = position;
                changed.push(HabitPositionRow::new(habit, self.user_id.clone()));
            }
        }

        if changed.is_empty() {
            return Ok(());
        }

        match self.remote.update_habit_positions(&changed).await {
            Ok(()) => {
                info!(habit_id = %id, from, to, "Reordered habit");
                Ok(())
            }
            Err(err) => Err(self.resync_after("reorder", err).await),
        }
    }

    async fn resync_after(&mut self, operation: &'static str, err: Error) -> Error {
        warn!(operation, error = %err, "Habit mutation failed, reloading habits");
        let resynced = match self.fetch_all().await {
            Ok(habits) => {
                self.habits = habits;
                info!(count = self.habits.len(), "Resynced habits");
                true
            }
            Err(reload_err) => {
                warn!(error = %reload_err, "Resync failed");
                false
            }
        };

        Error::Mutation {
            operation,
            reason: err.to_string(),
            resynced,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::remote::{InMemoryRemote, RemoteOperation};

    const USER: &str = "user-1";

    fn day(value: &str) -> DayKey {
        value.parse().unwrap()
    }

    fn store() -> (HabitStore, InMemoryRemote) {
        let remote = InMemoryRemote::new();
        let store = HabitStore::new(Arc::new(remote.clone()), USER);
        (store, remote)
    }

    async fn store_with(names: &[&str]) -> (HabitStore, InMemoryRemote, Vec<HabitId>) {
        let (mut store, remote) = store();
        let mut ids = Vec::new();
        for name in names {
            ids.push(store.create(HabitFields::new(*name)).await.unwrap().id.clone());
        }
        (store, remote, ids)
    }

    fn names(store: &HabitStore) -> Vec<&str> {
        store.habits().iter().map(|habit| habit.name.as_str()).collect()
    }

    #[tokio::test]
    async fn created_habit_is_listed_with_no_completions() {
        let (mut store, remote) = store();
        let fields = HabitFields::new("Drink Water")
            .with_icon("💧")
            .with_color("#4CAF50");
        let created = store.create(fields).await.unwrap().clone();

        assert_eq!(created.icon, "💧");
        assert!(created.completed_days.is_empty());

        let mut fresh = HabitStore::new(Arc::new(remote), USER);
        let loaded = fresh.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Drink Water");
        assert_eq!(loaded[0].color, "#4CAF50");
        assert!(loaded[0].completed_days.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_name_without_request() {
        let (mut store, remote) = store();
        let err = store.create(HabitFields::new("   ")).await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(remote.total_requests(), 0);
    }

    #[tokio::test]
    async fn toggle_inserts_then_deletes_record() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");

        let state = store.toggle(&ids[0], today, today).await.unwrap();
        assert_eq!(state, CompletionState::Complete);
        assert_eq!(remote.stored_completions(&ids[0], today), 1);
        assert!(store.habit(&ids[0]).unwrap().is_completed_on(today));

        let state = store.toggle(&ids[0], today, today).await.unwrap();
        assert_eq!(state, CompletionState::Incomplete);
        assert_eq!(remote.stored_completions(&ids[0], today), 0);
        assert!(store.habit(&ids[0]).unwrap().completed_days.is_empty());
    }

    #[tokio::test]
    async fn toggling_future_day_is_rejected_without_request() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let before = remote.total_requests();
        let snapshot = store.habits().to_vec();

        let err = store
            .toggle(&ids[0], day("2024-06-16"), day("2024-06-15"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::FutureDay { .. }));
        assert_eq!(remote.total_requests(), before);
        assert_eq!(store.habits(), snapshot.as_slice());
    }

    #[tokio::test]
    async fn unknown_habit_is_not_found() {
        let (mut store, remote, _) = store_with(&["Read"]).await;
        let before = remote.total_requests();
        let today = day("2024-06-15");

        let err = store
            .toggle(&HabitId::new("missing"), today, today)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(remote.total_requests(), before);
    }

    #[tokio::test]
    async fn begin_toggle_is_visible_before_commit() {
        let (mut store, _, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");

        let pending = store.begin_toggle(&ids[0], today, today).unwrap();
        assert_eq!(pending.expected, CompletionState::Complete);
        assert!(store.habit(&ids[0]).unwrap().is_completed_on(today));

        let state = store.commit_toggle(pending).await.unwrap();
        assert_eq!(state, CompletionState::Complete);
    }

    #[tokio::test]
    async fn failed_toggle_resyncs_from_remote() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");
        remote.fail_next(RemoteOperation::InsertCompletion);

        let err = store.toggle(&ids[0], today, today).await.unwrap_err();

        match err {
            Error::Mutation {
                operation,
                resynced,
                ..
            } => {
                assert_eq!(operation, "update");
                assert!(resynced);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!store.habit(&ids[0]).unwrap().is_completed_on(today));
        assert_eq!(remote.request_count(RemoteOperation::ListHabits), 1);
    }

    #[tokio::test]
    async fn failed_resync_is_reported() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");
        remote.set_offline(true);

        let err = store.toggle(&ids[0], today, today).await.unwrap_err();

        assert!(matches!(err, Error::Mutation { resynced: false, .. }));
        assert!(!store.habit(&ids[0]).unwrap().is_completed_on(today));
    }

    #[tokio::test]
    async fn commit_adopts_remote_state() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");

        // Another session completed the day after our last load.
        let mut other = HabitStore::new(Arc::new(remote.clone()), USER);
        other.load_all().await.unwrap();
        other.toggle(&ids[0], today, today).await.unwrap();

        let pending = store.begin_toggle(&ids[0], today, today).unwrap();
        assert_eq!(pending.expected, CompletionState::Complete);
        let state = store.commit_toggle(pending).await.unwrap();

        assert_eq!(state, CompletionState::Incomplete);
        assert!(!store.habit(&ids[0]).unwrap().is_completed_on(today));
        assert_eq!(remote.stored_completions(&ids[0], today), 0);
    }

    #[tokio::test]
    async fn complete_yesterday_toggles_previous_day() {
        let (mut store, _, ids) = store_with(&["Read"]).await;
        let today = day("2024-03-01");

        store.complete_yesterday(&ids[0], today).await.unwrap();

        let habit = store.habit(&ids[0]).unwrap();
        assert!(habit.is_completed_on(day("2024-02-29")));
        assert!(!habit.is_completed_on(today));
    }

    #[tokio::test]
    async fn load_failure_is_explicit_and_keeps_state() {
        let (mut store, remote, _) = store_with(&["Read", "Run"]).await;
        remote.fail_next(RemoteOperation::ListCompletions);

        let err = store.load_all().await.unwrap_err();

        assert!(matches!(err, Error::Load(_)));
        assert_eq!(names(&store), vec!["Read", "Run"]);
    }

    #[tokio::test]
    async fn empty_load_is_not_an_error() {
        let (mut store, _) = store();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_joins_completions_per_habit() {
        let (mut store, remote, ids) = store_with(&["Read", "Run"]).await;
        let today = day("2024-06-15");
        store.toggle(&ids[1], today, today).await.unwrap();
        store.toggle(&ids[1], day("2024-06-14"), today).await.unwrap();

        let mut fresh = HabitStore::new(Arc::new(remote), USER);
        let habits = fresh.load_all().await.unwrap();

        assert!(habits[0].completed_days.is_empty());
        assert_eq!(
            habits[1].completed_days.iter().copied().collect::<Vec<_>>(),
            vec![day("2024-06-14"), today]
        );
    }

    #[tokio::test]
    async fn update_keeps_completions() {
        let (mut store, _, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");
        store.toggle(&ids[0], today, today).await.unwrap();

        let fields = HabitFields::new("Read more")
            .with_icon("📚")
            .with_description("20 pages")
            .with_color("#2196f3");
        let updated = store.update(&ids[0], fields).await.unwrap();

        assert_eq!(updated.name, "Read more");
        assert_eq!(updated.color, "#2196F3");
        assert_eq!(updated.description, "20 pages");
        assert!(updated.is_completed_on(today));
    }

    #[tokio::test]
    async fn failed_update_resyncs() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        remote.fail_next(RemoteOperation::UpdateHabit);

        let err = store
            .update(&ids[0], HabitFields::new("Renamed"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Mutation {
                operation: "update",
                resynced: true,
                ..
            }
        ));
        assert_eq!(names(&store), vec!["Read"]);
    }

    #[tokio::test]
    async fn delete_cascades_completions() {
        let (mut store, remote, ids) = store_with(&["Read", "Run"]).await;
        let today = day("2024-06-15");
        store.toggle(&ids[0], today, today).await.unwrap();

        store.delete(&ids[0]).await.unwrap();

        assert_eq!(names(&store), vec!["Run"]);
        assert_eq!(remote.stored_completions(&ids[0], today), 0);
    }

    #[tokio::test]
    async fn failed_delete_keeps_habit_after_resync() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        remote.fail_next(RemoteOperation::DeleteHabit);

        let err = store.delete(&ids[0]).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to delete habit: Remote error: DeleteHabit failed: network request failed"
        );
        assert_eq!(names(&store), vec!["Read"]);
    }

    #[tokio::test]
    async fn reorder_persists_positions() {
        let (mut store, remote, ids) = store_with(&["Read", "Run", "Sleep"]).await;

        store.reorder(&ids[2], 0).await.unwrap();
        assert_eq!(names(&store), vec!["Sleep", "Read", "Run"]);
        assert_eq!(remote.request_count(RemoteOperation::UpdatePositions), 1);

        let mut fresh = HabitStore::new(Arc::new(remote), USER);
        fresh.load_all().await.unwrap();
        assert_eq!(names(&fresh), vec!["Sleep", "Read", "Run"]);
        let positions = fresh
            .habits()
            .iter()
            .map(|habit| habit.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_to_same_index_sends_nothing() {
        let (mut store, remote, ids) = store_with(&["Read", "Run"]).await;

        store.reorder(&ids[1], 7).await.unwrap();

        assert_eq!(names(&store), vec!["Read", "Run"]);
        assert_eq!(remote.request_count(RemoteOperation::UpdatePositions), 0);
    }

    #[tokio::test]
    async fn failed_reorder_restores_remote_order() {
        let (mut store, remote, ids) = store_with(&["Read", "Run"]).await;
        remote.fail_next(RemoteOperation::UpdatePositions);

        let err = store.reorder(&ids[1], 0).await.unwrap_err();

        assert!(matches!(err, Error::Mutation { operation: "reorder", .. }));
        assert_eq!(names(&store), vec!["Read", "Run"]);

        let mut fresh = HabitStore::new(Arc::new(remote), USER);
        fresh.load_all().await.unwrap();
        let positions = fresh
            .habits()
            .iter()
            .map(|habit| habit.position)
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn load_habit_refreshes_single_entry() {
        let (mut store, remote, ids) = store_with(&["Read"]).await;
        let today = day("2024-06-15");
        let mut other = HabitStore::new(Arc::new(remote), USER);
        other.load_all().await.unwrap();
        other.toggle(&ids[0], today, today).await.unwrap();

        let habit = store.load_habit(&ids[0]).await.unwrap();
        assert!(habit.is_completed_on(today));
    }
}
