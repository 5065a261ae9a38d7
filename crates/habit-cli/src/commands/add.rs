use habit_core::{HabitFields, HabitStore};

use crate::commands::common::short_id;
use crate::error::CliError;

pub fn build_fields(
    name_parts: &[String],
    icon: Option<String>,
    description: Option<String>,
    color: Option<String>,
) -> Result<HabitFields, CliError> {
    let name = name_parts.join(" ").trim().to_string();
    if name.is_empty() {
        return Err(CliError::EmptyHabitName);
    }

    let mut fields = HabitFields::new(name);
    if let Some(icon) = icon {
        fields = fields.with_icon(icon);
    }
    if let Some(description) = description {
        fields = fields.with_description(description);
    }
    if let Some(color) = color {
        fields = fields.with_color(color);
    }
    Ok(fields)
}

pub async fn run_add(store: &mut HabitStore, fields: HabitFields) -> Result<(), CliError> {
    let habit = store.create(fields).await?;
    println!("{} {} {}", short_id(habit), habit.icon, habit.name);
    Ok(())
}
