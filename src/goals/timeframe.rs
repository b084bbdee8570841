//! Goal horizons.
//!
//! Two independent schemes: the goal list splits short/long at three
//! months, while analytics reports short/medium/long buckets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::CalendarExt;
use crate::goals::model::Goal;

/// Long-term means a target date more than three months out. Undated
/// goals are short-term.
pub fn is_long_term(goal: &Goal, now: DateTime<Utc>) -> bool {
    goal.target_date.is_some_and(|t| t > now.add_months(3))
}

/// `(short_term, long_term)`, each in input order.
pub fn split_short_long(goals: &[Goal], now: DateTime<Utc>) -> (Vec<&Goal>, Vec<&Goal>) {
    goals.iter().partition(|g| !is_long_term(g, now))
}

/// Analytics horizon of a dated goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeBucket {
    /// Within a month.
    Short,
    /// Over one month, up to three.
    Medium,
    /// Beyond three months.
    Long,
}

impl TimeframeBucket {
    /// `None` for undated goals, which analytics does not count.
    pub fn of(goal: &Goal, now: DateTime<Utc>) -> Option<Self> {
        let target = goal.target_date?;
        Some(if target <= now.add_months(1) {
            Self::Short
        } else if target <= now.add_months(3) {
            Self::Medium
        } else {
            Self::Long
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Short => "Short Term",
            Self::Medium => "Medium Term",
            Self::Long => "Long Term",
        }
    }
}

/// Quick-pick horizons for a new goal's target date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetPreset {
    Week,
    #[default]
    Month,
    Quarter,
    HalfYear,
    Year,
    FiveYear,
}

impl TargetPreset {
    pub fn target_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => now.add_weeks(1),
            Self::Month => now.add_months(1),
            Self::Quarter => now.add_months(3),
            Self::HalfYear => now.add_months(6),
            Self::Year => now.add_years(1),
            Self::FiveYear => now.add_years(5),
        }
    }
}
