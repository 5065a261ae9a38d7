use habit_core::{HabitFields, HabitStore};

use crate::commands::common::{resolve_habit, short_id};
use crate::error::CliError;

#[derive(Debug, Default)]
pub struct FieldChanges {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl FieldChanges {
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.icon.is_none()
            && self.description.is_none()
            && self.color.is_none()
    }

    /// Overlay the changes on the current fields.
    pub fn apply(self, mut fields: HabitFields) -> HabitFields {
        if let Some(name) = self.name {
            fields.name = name;
        }
        if let Some(icon) = self.icon {
            fields.icon = icon;
        }
        if let Some(description) = self.description {
            fields.description = description;
        }
        if let Some(color) = self.color {
            fields.color = color;
        }
        fields
    }
}

pub async fn run_edit(
    store: &mut HabitStore,
    query: &str,
    changes: FieldChanges,
) -> Result<(), CliError> {
    let habit = resolve_habit(store, query)?;
    let id = habit.id.clone();

    if changes.is_empty() {
        println!("Nothing to change for {} {}", habit.icon, habit.name);
        return Ok(());
    }

    let fields = changes.apply(habit.fields());
    let updated = store.update(&id, fields).await?;
    println!(
        "{} {} {}  {}",
        short_id(updated),
        updated.icon,
        updated.name,
        updated.color
    );
    Ok(())
}
