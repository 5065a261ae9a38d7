use habit_core::HabitStore;

use crate::commands::common::{resolve_habit, short_id};
use crate::error::CliError;

/// Move a habit to a one-based `position`.
pub async fn run_reorder(
    store: &mut HabitStore,
    query: &str,
    position: usize,
) -> Result<(), CliError> {
    let index = position.checked_sub(1).ok_or(CliError::InvalidPosition)?;
    let id = resolve_habit(store, query)?.id.clone();

    store.reorder(&id, index).await?;
    for (index, habit) in store.habits().iter().enumerate() {
        println!("{:>2}. {} {}  {}", index + 1, habit.icon, habit.name, short_id(habit));
    }
    Ok(())
}
