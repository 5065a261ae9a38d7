use std::sync::Arc;

use habit_core::config::SupabaseConfig;
use habit_core::remote::PostgrestRemote;
use habit_core::{CalendarGrid, CellState, DayKey, GridCell, GridLayout, Habit, HabitStore};
use serde::Serialize;

use crate::auth::SupabaseAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Serialize)]
pub struct HabitListItem {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub color: String,
    pub position: i64,
    pub completed_today: bool,
    pub completed_count: usize,
    pub last_completed: Option<DayKey>,
    pub completed_days: Vec<DayKey>,
}

pub fn habit_to_list_item(habit: &Habit, today: DayKey) -> HabitListItem {
    HabitListItem {
        id: habit.id.to_string(),
        name: habit.name.clone(),
        icon: habit.icon.clone(),
        description: habit.description.clone(),
        color: habit.color.clone(),
        position: habit.position,
        completed_today: habit.is_completed_on(today),
        completed_count: habit.completed_days.len(),
        last_completed: habit.last_completed(),
        completed_days: habit.completed_days.iter().copied().collect(),
    }
}

pub fn short_id(habit: &Habit) -> String {
    habit.id.as_str().chars().take(SHORT_ID_LEN).collect()
}

/// Resolve the backend settings for a profile, falling back to the environment.
pub fn resolve_supabase_config(
    global_profile: Option<&str>,
) -> Result<(String, SupabaseConfig), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);

    let from_profile = config
        .profile(&profile_name)
        .map(|profile| profile.supabase_config())
        .transpose()
        .map_err(|error| CliError::Config(format!("Profile '{profile_name}': {error}")))?
        .flatten();

    let supabase = match from_profile {
        Some(supabase) => supabase,
        None => SupabaseConfig::from_env()?.ok_or(CliError::NotConfigured)?,
    };
    Ok((profile_name, supabase))
}

/// Establish a session and load the user's habits.
pub async fn open_store(global_profile: Option<&str>) -> Result<HabitStore, CliError> {
    let (profile_name, supabase) = resolve_supabase_config(global_profile)?;
    let auth = SupabaseAuthService::new(&profile_name, &supabase)
        .map_err(|error| CliError::Config(error.to_string()))?;
    let session = auth.ensure_session().await.map_err(|error| {
        tracing::error!("Session setup failed for profile '{}': {}", profile_name, error);
        CliError::Connect(error)
    })?;

    let remote = PostgrestRemote::with_timeout(
        &supabase.url,
        supabase.anon_key.clone(),
        session.access_token.clone(),
        supabase.request_timeout(),
    )?;
    let mut store = HabitStore::new(Arc::new(remote), session.user.id);
    store.load_all().await?;
    Ok(store)
}

pub fn normalize_habit_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyHabitId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Find a habit by exact id, unique id prefix, or case-insensitive name.
pub fn resolve_habit<'a>(store: &'a HabitStore, query: &str) -> Result<&'a Habit, CliError> {
    let query = normalize_habit_query(query)?;
    let habits = store.habits();

    if let Some(habit) = habits.iter().find(|habit| habit.id.as_str() == query) {
        return Ok(habit);
    }

    let by_prefix = habits
        .iter()
        .filter(|habit| habit.id.as_str().starts_with(&query))
        .collect::<Vec<_>>();
    let candidates = if by_prefix.is_empty() {
        habits
            .iter()
            .filter(|habit| habit.name.to_lowercase() == query.to_lowercase())
            .collect::<Vec<_>>()
    } else {
        by_prefix
    };

    match candidates.as_slice() {
        [] => Err(CliError::HabitNotFound(query)),
        [habit] => Ok(habit),
        _ => {
            let options = candidates
                .iter()
                .take(3)
                .map(|habit| format!("{} ({})", short_id(habit), habit.name))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousHabit(format!(
                "Habit '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to `today`.
pub fn parse_day_arg(value: Option<&str>, today: DayKey) -> Result<DayKey, CliError> {
    match value.map(str::trim) {
        None | Some("" | "today") => Ok(today),
        Some("yesterday") => today
            .previous()
            .ok_or_else(|| CliError::InvalidDate("yesterday".to_string())),
        Some(raw) => raw
            .parse::<DayKey>()
            .map_err(|_| CliError::InvalidDate(raw.to_string())),
    }
}

pub const fn cell_glyph(cell: &GridCell) -> char {
    match cell.state() {
        None | Some(CellState::Future) => ' ',
        Some(CellState::PastIncomplete) => '·',
        Some(CellState::PastComplete) => '■',
        Some(CellState::TodayIncomplete) => '□',
        Some(CellState::TodayComplete) => '▣',
    }
}

pub const fn checkmark(completed: bool) -> &'static str {
    if completed {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn format_habit_header(habit: &Habit, grid: &CalendarGrid) -> String {
    let done = grid.today_state().is_complete();
    let mut header = format!(
        "{} {} {}  {}  {}",
        checkmark(done),
        habit.icon,
        habit.name,
        short_id(habit),
        habit.color
    );
    if !habit.description.is_empty() {
        header.push_str("\n    ");
        header.push_str(&habit.description);
    }
    header
}

/// Render grid rows (one per weekday). `max_weeks` limits output to a window
/// starting at the grid's initial scroll column.
pub fn format_grid_lines(grid: &CalendarGrid, max_weeks: Option<usize>) -> Vec<String> {
    let start = match max_weeks {
        Some(width) if width < grid.week_count() => grid
            .initial_scroll_week()
            .min(grid.week_count() - width),
        _ => 0,
    };
    let end = max_weeks.map_or(grid.week_count(), |width| {
        (start + width).min(grid.week_count())
    });

    (0..7)
        .map(|weekday| {
            grid.weeks[start..end]
                .iter()
                .map(|column| cell_glyph(&column[weekday]))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .map(|row| format!("    {row}"))
        .collect()
}

pub fn habit_grid(habit: &Habit, today: DayKey, layout: GridLayout) -> CalendarGrid {
    CalendarGrid::generate(today, &habit.completed_days, habit.color.clone(), layout)
}

pub fn state_label(completed: bool) -> &'static str {
    if completed {
        "complete"
    } else {
        "incomplete"
    }
}
