use habit_core::HabitStore;

use crate::commands::common::resolve_habit;
use crate::error::CliError;

pub async fn run_delete(store: &mut HabitStore, query: &str) -> Result<(), CliError> {
    let habit = resolve_habit(store, query)?;
    let (id, name) = (habit.id.clone(), habit.name.clone());

    store.delete(&id).await?;
    println!("Deleted {name} ({id})");
    Ok(())
}
