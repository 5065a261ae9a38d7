use habit_core::{CompletionState, DayKey, HabitStore};

use crate::commands::common::{resolve_habit, state_label};
use crate::error::CliError;

pub async fn run_toggle(
    store: &mut HabitStore,
    query: &str,
    day: DayKey,
    today: DayKey,
) -> Result<CompletionState, CliError> {
    let id = resolve_habit(store, query)?.id.clone();
    let state = store.toggle(&id, day, today).await?;
    print_toggle(store, &id, day);
    Ok(state)
}

pub async fn run_yesterday(
    store: &mut HabitStore,
    query: &str,
    today: DayKey,
) -> Result<CompletionState, CliError> {
    let id = resolve_habit(store, query)?.id.clone();
    let state = store.complete_yesterday(&id, today).await?;
    if let Some(yesterday) = today.previous() {
        print_toggle(store, &id, yesterday);
    }
    Ok(state)
}

fn print_toggle(store: &HabitStore, id: &habit_core::HabitId, day: DayKey) {
    if let Some(habit) = store.habit(id) {
        println!(
            "{} {}: {} is {}",
            habit.icon,
            habit.name,
            day,
            state_label(habit.state_on(day).is_complete())
        );
    }
}
