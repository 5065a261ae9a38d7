//! Calendar grid generation.
//!
//! A grid is a list of week columns, each holding seven day cells ordered
//! oldest to newest from top to bottom. Grids are recomputed from the
//! current completion set on every render and hold no state of their own.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CompletionState, DayKey};

pub const DAYS_PER_WEEK: usize = 7;

/// Longest span a `Trailing` layout covers; larger requests are clamped.
pub const MAX_TRAILING_DAYS: u32 = 3660;

/// Weeks left visible to the left of today's column after the initial scroll.
const SCROLL_LEAD_WEEKS: usize = 4;

/// Which span of days a grid covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GridLayout {
    /// Every day of today's calendar year, Jan 1 in the top-left cell.
    #[default]
    CalendarYear,
    /// From Jan 1 up to today, with today in the bottom-right cell.
    YearToDate,
    /// The trailing `days` days up to today, with today in the bottom-right cell.
    Trailing { days: u32 },
}

impl GridLayout {
    /// Same layout with `Trailing` days capped at [`MAX_TRAILING_DAYS`].
    #[must_use]
    pub fn bounded(self) -> Self {
        match self {
            Self::Trailing { days } => Self::Trailing {
                days: days.min(MAX_TRAILING_DAYS),
            },
            other => other,
        }
    }
}

/// Render classification of one day cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Future,
    TodayIncomplete,
    TodayComplete,
    PastComplete,
    PastIncomplete,
}

impl CellState {
    /// Classify `day` relative to `today` and the completion set.
    #[must_use]
    pub fn classify(day: DayKey, today: DayKey, completed_days: &BTreeSet<DayKey>) -> Self {
        let completed = completed_days.contains(&day);
        match day.cmp(&today) {
            std::cmp::Ordering::Greater => Self::Future,
            std::cmp::Ordering::Equal if completed => Self::TodayComplete,
            std::cmp::Ordering::Equal => Self::TodayIncomplete,
            std::cmp::Ordering::Less if completed => Self::PastComplete,
            std::cmp::Ordering::Less => Self::PastIncomplete,
        }
    }

    /// Future cells are disabled; every other cell accepts a toggle.
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        !matches!(self, Self::Future)
    }

    #[must_use]
    pub const fn is_today(self) -> bool {
        matches!(self, Self::TodayComplete | Self::TodayIncomplete)
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::TodayComplete | Self::PastComplete)
    }
}

/// One slot of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GridCell {
    Day { day: DayKey, state: CellState },
    /// Padding after the last day of a calendar-year grid.
    Empty,
}

impl GridCell {
    #[must_use]
    pub const fn day(&self) -> Option<DayKey> {
        match self {
            Self::Day { day, .. } => Some(*day),
            Self::Empty => None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> Option<CellState> {
        match self {
            Self::Day { state, .. } => Some(*state),
            Self::Empty => None,
        }
    }
}

pub type WeekColumn = [GridCell; DAYS_PER_WEEK];

/// Render-ready completion grid for one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarGrid {
    pub today: DayKey,
    pub color: String,
    pub layout: GridLayout,
    pub weeks: Vec<WeekColumn>,
}

impl CalendarGrid {
    /// Build the grid for `layout` as seen on `today`.
    #[must_use]
    pub fn generate(
        today: DayKey,
        completed_days: &BTreeSet<DayKey>,
        color: impl Into<String>,
        layout: GridLayout,
    ) -> Self {
        let layout = layout.bounded();
        let span = GridSpan::for_layout(today, layout);
        let weeks = (0..span.weeks)
            .map(|week| {
                std::array::from_fn(|weekday| {
                    let index = week * DAYS_PER_WEEK + weekday;
                    span.day_at(index).map_or(GridCell::Empty, |day| GridCell::Day {
                        day,
                        state: CellState::classify(day, today, completed_days),
                    })
                })
            })
            .collect();

        Self {
            today,
            color: color.into(),
            layout,
            weeks,
        }
    }

    #[must_use]
    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// All cells with their `(week, weekday)` coordinates, column by column.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &GridCell)> + '_ {
        self.weeks.iter().enumerate().flat_map(|(week, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(weekday, cell)| (week, weekday, cell))
        })
    }

    /// Cells that represent a date (padding excluded).
    pub fn day_cells(&self) -> impl Iterator<Item = (DayKey, CellState)> + '_ {
        self.cells()
            .filter_map(|(_, _, cell)| cell.day().zip(cell.state()))
    }

    #[must_use]
    pub fn cell(&self, day: DayKey) -> Option<CellState> {
        self.day_cells()
            .find_map(|(candidate, state)| (candidate == day).then_some(state))
    }

    /// Coordinates of today's cell, if the layout includes it.
    #[must_use]
    pub fn today_position(&self) -> Option<(usize, usize)> {
        self.cells()
            .find(|(_, _, cell)| cell.state().is_some_and(CellState::is_today))
            .map(|(week, weekday, _)| (week, weekday))
    }

    /// Completion state for the header checkmark.
    #[must_use]
    pub fn today_state(&self) -> CompletionState {
        CompletionState::from_completed(
            self.cell(self.today)
                .is_some_and(CellState::is_complete),
        )
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.day_cells()
            .filter(|(_, state)| state.is_complete())
            .count()
    }

    /// Column to scroll to first so the most recent weeks are visible.
    #[must_use]
    pub fn initial_scroll_week(&self) -> usize {
        self.today_position()
            .map_or(0, |(week, _)| week.saturating_sub(SCROLL_LEAD_WEEKS))
    }
}

/// First date and number of dated cells covered by a layout.
struct GridSpan {
    start: Option<DayKey>,
    day_count: usize,
    weeks: usize,
}

impl GridSpan {
    fn for_layout(today: DayKey, layout: GridLayout) -> Self {
        match layout {
            GridLayout::CalendarYear => {
                let start = first_of_year(today.year());
                let day_count = days_in_year(today.year());
                Self {
                    start,
                    day_count,
                    weeks: day_count.div_ceil(DAYS_PER_WEEK),
                }
            }
            GridLayout::YearToDate => {
                let elapsed = first_of_year(today.year())
                    .map_or(0, |anchor| today.days_since(anchor));
                Self::ending_today(today, elapsed)
            }
            GridLayout::Trailing { days } => Self::ending_today(today, i64::from(days)),
        }
    }

    /// `ceil(elapsed / 7) + 1` full weeks whose last cell is today.
    ///
    /// Near the start of the representable calendar the first column begins
    /// at the earliest date instead, so today stays in the grid.
    fn ending_today(today: DayKey, elapsed_days: i64) -> Self {
        let elapsed = usize::try_from(elapsed_days.max(0)).unwrap_or(0);
        let weeks = elapsed.div_ceil(DAYS_PER_WEEK) + 1;
        let day_count = weeks * DAYS_PER_WEEK;
        let lead = i64::try_from(day_count - 1).unwrap_or(i64::MAX);

        Self {
            start: today
                .offset(-lead)
                .or(Some(DayKey::from_date(NaiveDate::MIN))),
            day_count,
            weeks,
        }
    }

    fn day_at(&self, index: usize) -> Option<DayKey> {
        if index >= self.day_count {
            return None;
        }
        self.start?.offset(i64::try_from(index).ok()?)
    }
}

fn first_of_year(year: i32) -> Option<DayKey> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(DayKey::from_date)
}

/// 365 or 366, from real calendar arithmetic.
#[must_use]
pub fn days_in_year(year: i32) -> usize {
    match (first_of_year(year), first_of_year(year + 1)) {
        (Some(start), Some(end)) => usize::try_from(end.days_since(start)).unwrap_or(365),
        _ => 365,
    }
}
