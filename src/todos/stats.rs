//! Task statistics for the analytics view.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{CalendarExt, day_of};
use crate::todos::model::{Priority, Task};

/// Days covered by the completion trend, ending today.
pub const TREND_DAYS: i64 = 7;

/// How many recently completed tasks a summary lists.
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub completed: u32,
    pub total: u32,
    /// Percent in `[0, 100]`, unrounded.
    pub completion_rate: f64,
    /// Oldest day first, today last.
    pub last_7_days: Vec<DailyCompletion>,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count() as u32;
        let total = tasks.len() as u32;
        let completion_rate = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let last_7_days = (0..TREND_DAYS)
            .rev()
            .map(|back| {
                let date = today.add_days(-back);
                DailyCompletion {
                    date,
                    completed: completions_on(tasks, date),
                }
            })
            .collect();

        Self {
            completed,
            total,
            completion_rate,
            last_7_days,
        }
    }

    /// The trend day with the most completions; the earliest wins a tie.
    pub fn most_productive_day(&self) -> Option<DailyCompletion> {
        let first = *self.last_7_days.first()?;
        Some(
            self.last_7_days
                .iter()
                .fold(first, |most, day| if day.completed > most.completed { *day } else { most }),
        )
    }

    pub fn pending(&self) -> u32 {
        self.total - self.completed
    }
}

fn completions_on(tasks: &[Task], date: NaiveDate) -> u32 {
    tasks
        .iter()
        .filter_map(|t| t.completed_at)
        .filter(|at| day_of(*at) == date)
        .count() as u32
}

/// Consecutive days with a completion, counting back from today.
/// Zero when nothing was completed today.
pub fn current_streak(tasks: &[Task], today: NaiveDate) -> u32 {
    let days: HashSet<NaiveDate> = tasks.iter().filter_map(|t| t.completed_at).map(day_of).collect();

    let mut streak = 0;
    let mut day = today;
    while days.contains(&day) {
        streak += 1;
        day = day.add_days(-1);
    }
    streak
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PriorityDistribution {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl PriorityDistribution {
    pub fn compute(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut acc, t| {
            match t.priority {
                Priority::High => acc.high += 1,
                Priority::Medium => acc.medium += 1,
                Priority::Low => acc.low += 1,
            }
            acc
        })
    }

    /// Non-empty slices, high to low.
    pub fn entries(&self) -> Vec<(Priority, u32)> {
        [
            (Priority::High, self.high),
            (Priority::Medium, self.medium),
            (Priority::Low, self.low),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }
}

/// Completed tasks, most recent first, at most `limit`.
pub fn recently_completed(tasks: &[Task], limit: usize) -> Vec<&Task> {
    let mut done: Vec<&Task> = tasks.iter().filter(|t| t.completed_at.is_some()).collect();
    done.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    done.truncate(limit);
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::start_of;
    use chrono::TimeDelta;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 5, 10)
    }

    fn done_on(id: &str, day: NaiveDate) -> Task {
        let created = start_of(day.add_days(-30));
        Task::new(id, id, created).completed_at(start_of(day) + TimeDelta::hours(15))
    }

    fn open(id: &str) -> Task {
        Task::new(id, id, start_of(today()))
    }

    #[test]
    fn empty_list_has_zero_rate() {
        let stats = TaskStats::compute(&[], today());
        assert_eq!(stats.total, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.last_7_days.len(), 7);
        assert!(stats.last_7_days.iter().all(|d| d.completed == 0));
    }

    #[test]
    fn rate_and_trend() {
        let tasks = vec![
            done_on("a", today()),
            done_on("b", today().add_days(-2)),
            done_on("c", today().add_days(-2)),
            done_on("old", today().add_days(-7)),
            open("d"),
        ];
        let stats = TaskStats::compute(&tasks, today());
        assert_eq!(stats.completed, 4);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.pending(), 1);
        assert!((stats.completion_rate - 80.0).abs() < 1e-9);

        assert_eq!(stats.last_7_days[0].date, today().add_days(-6));
        assert_eq!(stats.last_7_days[6].date, today());
        let counts: Vec<u32> = stats.last_7_days.iter().map(|d| d.completed).collect();
        assert_eq!(counts, [0, 0, 0, 0, 2, 0, 1]);
    }

    #[test]
    fn most_productive_day_prefers_earliest_tie() {
        let tasks = vec![
            done_on("a", today().add_days(-5)),
            done_on("b", today().add_days(-1)),
        ];
        let stats = TaskStats::compute(&tasks, today());
        assert_eq!(
            stats.most_productive_day().map(|d| d.date),
            Some(today().add_days(-5))
        );

        // All zero: the first (oldest) day.
        let stats = TaskStats::compute(&[], today());
        assert_eq!(
            stats.most_productive_day().map(|d| d.date),
            Some(today().add_days(-6))
        );
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let tasks = vec![
            done_on("a", today()),
            done_on("b", today().add_days(-1)),
            done_on("c", today().add_days(-3)),
        ];
        assert_eq!(current_streak(&tasks, today()), 2);
    }

    #[test]
    fn streak_is_zero_without_completion_today() {
        let tasks = vec![done_on("a", today().add_days(-1)), open("b")];
        assert_eq!(current_streak(&tasks, today()), 0);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let today = date(2024, 3, 1);
        let tasks = vec![
            done_on("a", today),
            done_on("b", date(2024, 2, 29)),
            done_on("c", date(2024, 2, 28)),
        ];
        assert_eq!(current_streak(&tasks, today), 3);
    }

    #[test]
    fn priority_distribution_counts() {
        let tasks = vec![
            open("a").with_priority(Priority::High),
            open("b"),
            open("c"),
            done_on("d", today()).with_priority(Priority::High),
        ];
        let dist = PriorityDistribution::compute(&tasks);
        assert_eq!(dist, PriorityDistribution { high: 2, medium: 2, low: 0 });
        assert_eq!(dist.entries(), [(Priority::High, 2), (Priority::Medium, 2)]);
    }

    #[test]
    fn recently_completed_newest_first() {
        let tasks: Vec<Task> = (0..7)
            .map(|i| done_on(&format!("t{i}"), today().add_days(-i)))
            .chain([open("open")])
            .collect();
        let recent = recently_completed(&tasks, RECENT_LIMIT);
        let ids: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t0", "t1", "t2", "t3", "t4"]);
    }
}
