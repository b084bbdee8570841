//! Life-progress calculator — age, weeks lived, weeks left.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::dates::{MS_PER_WEEK, start_of};
use crate::life::grid::WEEKS_PER_YEAR;
use crate::profile::{UserProfile, clamp_life_expectancy};

/// Derived life statistics. All zero when no birthdate is known.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeProgress {
    /// Whole years read back from the elapsed duration.
    pub age: u32,
    /// Assumed lifespan in years.
    pub total_years: u32,
    pub total_weeks: u32,
    pub past_weeks: u32,
    /// Share of the lifespan already lived, within `[0, 100]`.
    pub percent_complete: f64,
    pub weeks_left: u32,
    pub years_left: u32,
}

impl LifeProgress {
    /// Compute progress for a profile at `now`.
    pub fn for_profile(profile: &UserProfile, now: DateTime<Utc>) -> Self {
        Self::compute(profile.birthdate, Some(profile.life_expectancy() as i64), now)
    }

    /// Compute progress from raw inputs.
    ///
    /// `life_expectancy` is re-clamped here regardless of where it came from.
    /// A birthdate in the future counts as zero elapsed time: age 0 and no
    /// past weeks, so week 0 is the current cell.
    pub fn compute(
        birthdate: Option<NaiveDate>,
        life_expectancy: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let Some(birthdate) = birthdate else {
            return Self::default();
        };

        let life_expectancy = clamp_life_expectancy(life_expectancy);
        let elapsed_ms = (now - start_of(birthdate)).num_milliseconds().max(0);

        let age = epoch_years(elapsed_ms);
        let total_weeks = life_expectancy * WEEKS_PER_YEAR;
        let past_weeks = u32::try_from(elapsed_ms / MS_PER_WEEK).unwrap_or(u32::MAX);
        let percent = past_weeks as f64 / total_weeks as f64 * 100.0;

        Self {
            age,
            total_years: life_expectancy,
            total_weeks,
            past_weeks,
            percent_complete: percent.clamp(0.0, 100.0),
            weeks_left: total_weeks.saturating_sub(past_weeks),
            years_left: life_expectancy.saturating_sub(age),
        }
    }

    /// Progress for the current instant.
    pub fn now(profile: &UserProfile) -> Self {
        Self::for_profile(profile, Utc::now())
    }

    pub fn is_empty(&self) -> bool {
        self.total_weeks == 0
    }
}

/// Years elapsed, read as a date offset from the Unix epoch.
///
/// Leap days shift the boundary by a day or two compared with a
/// birthday-aware age.
fn epoch_years(elapsed_ms: i64) -> u32 {
    DateTime::from_timestamp_millis(elapsed_ms)
        .map(|dt| (dt.year() - 1970).unsigned_abs())
        .unwrap_or(0)
}
