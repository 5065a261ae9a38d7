use habit_core::{DayKey, GridLayout, HabitStore};

use crate::commands::common::{format_grid_lines, format_habit_header, habit_grid, resolve_habit};
use crate::error::CliError;

pub fn run_grid(
    store: &HabitStore,
    query: &str,
    layout: GridLayout,
    as_json: bool,
    today: DayKey,
) -> Result<(), CliError> {
    let habit = resolve_habit(store, query)?;
    let grid = habit_grid(habit, today, layout);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!("{}", format_habit_header(habit, &grid));
    for line in format_grid_lines(&grid, None) {
        println!("{line}");
    }
    println!(
        "    {} of {} days complete",
        grid.completed_count(),
        grid.day_cells().filter(|(day, _)| *day <= today).count()
    );
    Ok(())
}
