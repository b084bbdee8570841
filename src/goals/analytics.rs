//! Goal analytics: horizon buckets and upcoming deadlines.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dates::CalendarExt;
use crate::goals::model::Goal;
use crate::goals::timeframe::TimeframeBucket;

/// Upcoming goals listed at most.
pub const UPCOMING_LIMIT: usize = 3;

/// Days ahead a target date counts as upcoming.
pub const UPCOMING_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByTimeframe {
    pub short_term: u32,
    pub medium_term: u32,
    pub long_term: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByStatus {
    pub completed: u32,
    pub in_progress: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalAnalytics {
    pub by_timeframe: ByTimeframe,
    pub by_status: ByStatus,
    /// Whole percent of goals completed.
    pub completion_rate: u32,
    pub total_goals: u32,
    /// Open goals due within a week, soonest first.
    pub upcoming: Vec<Goal>,
}

impl GoalAnalytics {
    pub fn compute(goals: &[Goal], now: DateTime<Utc>) -> Self {
        let mut by_timeframe = ByTimeframe::default();
        for goal in goals {
            match TimeframeBucket::of(goal, now) {
                Some(TimeframeBucket::Short) => by_timeframe.short_term += 1,
                Some(TimeframeBucket::Medium) => by_timeframe.medium_term += 1,
                Some(TimeframeBucket::Long) => by_timeframe.long_term += 1,
                None => {}
            }
        }

        let completed = goals.iter().filter(|g| g.completed).count() as u32;
        let total_goals = goals.len() as u32;
        let completion_rate = if total_goals > 0 {
            (completed as f64 / total_goals as f64 * 100.0).round() as u32
        } else {
            0
        };

        Self {
            by_timeframe,
            by_status: ByStatus {
                completed,
                in_progress: total_goals - completed,
            },
            completion_rate,
            total_goals,
            upcoming: upcoming_goals(goals, now),
        }
    }
}

/// Open goals whose target falls in `[now, now + 7 days]`, soonest first.
pub fn upcoming_goals(goals: &[Goal], now: DateTime<Utc>) -> Vec<Goal> {
    let horizon = now.add_days(UPCOMING_DAYS);
    let mut upcoming: Vec<Goal> = goals
        .iter()
        .filter(|g| !g.completed)
        .filter(|g| g.target_date.is_some_and(|t| t >= now && t <= horizon))
        .cloned()
        .collect();
    upcoming.sort_by_key(|g| g.target_date);
    upcoming.truncate(UPCOMING_LIMIT);
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn goal_in(id: &str, days: i64) -> Goal {
        Goal::new(id, id).with_target_date(now() + TimeDelta::days(days))
    }

    #[test]
    fn empty_goals() {
        let analytics = GoalAnalytics::compute(&[], now());
        assert_eq!(analytics, GoalAnalytics::default());
    }

    #[test]
    fn buckets_status_and_rate() {
        let goals = vec![
            goal_in("soon", 3),
            goal_in("mid", 45),
            goal_in("far", 400).completed(),
            Goal::new("undated", "undated"),
        ];
        let analytics = GoalAnalytics::compute(&goals, now());
        assert_eq!(
            analytics.by_timeframe,
            ByTimeframe {
                short_term: 1,
                medium_term: 1,
                long_term: 1,
            }
        );
        assert_eq!(
            analytics.by_status,
            ByStatus {
                completed: 1,
                in_progress: 3,
            }
        );
        assert_eq!(analytics.completion_rate, 25);
        assert_eq!(analytics.total_goals, 4);
    }

    #[test]
    fn completion_rate_rounds() {
        let goals = vec![goal_in("a", 1).completed(), goal_in("b", 1), goal_in("c", 1)];
        assert_eq!(GoalAnalytics::compute(&goals, now()).completion_rate, 33);
    }

    #[test]
    fn upcoming_top_three_soonest_first() {
        let goals = vec![
            goal_in("six", 6),
            goal_in("past", -1),
            goal_in("two", 2),
            goal_in("done", 1).completed(),
            goal_in("eight", 8),
            goal_in("five", 5),
            goal_in("seven", 7),
        ];
        let ids: Vec<String> = upcoming_goals(&goals, now()).into_iter().map(|g| g.id).collect();
        assert_eq!(ids, ["two", "five", "six"]);
    }
}
