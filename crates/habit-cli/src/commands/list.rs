use habit_core::{DayKey, GridLayout, HabitStore};

use crate::commands::common::{
    format_grid_lines, format_habit_header, habit_grid, habit_to_list_item, HabitListItem,
};
use crate::error::CliError;

pub fn run_list(
    store: &HabitStore,
    weeks: usize,
    as_json: bool,
    today: DayKey,
) -> Result<(), CliError> {
    if as_json {
        let items = store
            .habits()
            .iter()
            .map(|habit| habit_to_list_item(habit, today))
            .collect::<Vec<HabitListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for line in format_habit_list(store, weeks, today) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_habit_list(store: &HabitStore, weeks: usize, today: DayKey) -> Vec<String> {
    if store.habits().is_empty() {
        return vec!["No habits yet. Add one with `habit add <name>`.".to_string()];
    }

    let mut lines = Vec::new();
    for habit in store.habits() {
        let grid = habit_grid(habit, today, GridLayout::CalendarYear);
        lines.push(format_habit_header(habit, &grid));
        lines.extend(format_grid_lines(&grid, Some(weeks.max(1))));
        lines.push(String::new());
    }
    lines.pop();
    lines
}
