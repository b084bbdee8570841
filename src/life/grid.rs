//! Week-grid model — one cell per week of the assumed lifespan.
//!
//! Cells are laid out in rows of five years (260 weeks). The final row is
//! partial when the lifespan is not a multiple of five.

use serde::{Deserialize, Serialize};

use crate::life::progress::LifeProgress;

pub const WEEKS_PER_YEAR: u32 = 52;
pub const YEARS_PER_ROW: u32 = 5;
pub const WEEKS_PER_ROW: u32 = WEEKS_PER_YEAR * YEARS_PER_ROW;

/// Upper bound on a cell's reveal delay.
pub const MAX_REVEAL_DELAY_MS: u32 = 1000;

/// Floor for the fade applied to older past weeks.
const MIN_PAST_INTENSITY: f64 = 0.4;

/// Where a week sits relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekState {
    Past,
    Current,
    Future,
}

impl WeekState {
    pub fn of(index: u32, past_weeks: u32) -> Self {
        match index.cmp(&past_weeks) {
            std::cmp::Ordering::Less => Self::Past,
            std::cmp::Ordering::Equal => Self::Current,
            std::cmp::Ordering::Greater => Self::Future,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Past => "Past Weeks",
            Self::Current => "Current Week",
            Self::Future => "Future Weeks",
        }
    }
}

/// One week of the lifespan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCell {
    /// Zero-based week number across the lifespan.
    pub index: u32,
    pub state: WeekState,
    /// One-based year of life.
    pub year: u32,
    /// One-based week within that year.
    pub week_of_year: u32,
    /// First week of a year other than the first.
    pub is_year_start: bool,
    /// Entry animation delay; zero until the grid is visible.
    pub reveal_delay_ms: u32,
    /// Fade for past weeks, `None` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

impl WeekCell {
    /// Tooltip text, e.g. `Year 3, Week 12`.
    pub fn title(&self) -> String {
        format!("Year {}, Week {}", self.year, self.week_of_year)
    }
}

/// A labelled row of up to five years of weeks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridRow {
    pub label: String,
    pub cells: Vec<WeekCell>,
}

/// The full grid for one profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub rows: Vec<GridRow>,
    pub total_weeks: u32,
    pub past_weeks: u32,
}

impl WeekGrid {
    /// Lay out the grid for `progress`.
    ///
    /// `visible` gates the reveal delays: cells only stagger in once the
    /// grid is on screen. An empty progress (no birthdate) yields no rows.
    pub fn build(progress: &LifeProgress, visible: bool) -> Self {
        let total_weeks = progress.total_years * WEEKS_PER_YEAR;
        let past_weeks = progress.past_weeks;
        let total_rows = progress.total_years.div_ceil(YEARS_PER_ROW);

        let mut rows = Vec::with_capacity(total_rows as usize);
        for row in 0..total_rows {
            let cells: Vec<WeekCell> = (0..WEEKS_PER_ROW)
                .map(|week_in_row| (week_in_row, row * WEEKS_PER_ROW + week_in_row))
                .take_while(|&(_, week)| week < total_weeks)
                .map(|(week_in_row, week)| {
                    build_cell(week, week_in_row, row, past_weeks, visible)
                })
                .collect();

            if cells.is_empty() {
                continue;
            }
            rows.push(GridRow {
                label: format!("Year {}", row * YEARS_PER_ROW + 1),
                cells,
            });
        }

        Self {
            rows,
            total_weeks,
            past_weeks,
        }
    }

    /// All cells in index order.
    pub fn cells(&self) -> impl Iterator<Item = &WeekCell> {
        self.rows.iter().flat_map(|r| r.cells.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell for the week containing today, if within the lifespan.
    pub fn current(&self) -> Option<&WeekCell> {
        self.cells().find(|c| c.state == WeekState::Current)
    }

    /// Legend entries in display order.
    pub fn legend() -> [WeekState; 3] {
        [WeekState::Past, WeekState::Current, WeekState::Future]
    }
}

fn build_cell(week: u32, week_in_row: u32, row: u32, past_weeks: u32, visible: bool) -> WeekCell {
    let state = WeekState::of(week, past_weeks);
    let week_in_year = week % WEEKS_PER_YEAR;

    let intensity = (state == WeekState::Past).then(|| {
        let distance = (past_weeks - week) as f64 / past_weeks as f64;
        (1.0 - distance).max(MIN_PAST_INTENSITY)
    });

    let reveal_delay_ms = if visible {
        (week_in_row * 2 + row * 20).min(MAX_REVEAL_DELAY_MS)
    } else {
        0
    };

    WeekCell {
        index: week,
        state,
        year: week / WEEKS_PER_YEAR + 1,
        week_of_year: week_in_year + 1,
        is_year_start: week_in_year == 0 && week > 0,
        reveal_delay_ms,
        intensity,
    }
}
