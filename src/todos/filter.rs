//! Task filtering and display ordering.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{CalendarExt, day_of};
use crate::todos::model::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn matches(&self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Low => priority == Priority::Low,
            Self::Medium => priority == Priority::Medium,
            Self::High => priority == Priority::High,
        }
    }
}

/// Due-date window, measured in whole days from today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl Timeframe {
    /// Inclusive `[today, end]` window, `None` for `All`.
    pub fn window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Self::All => None,
            Self::Today => Some((today, today)),
            Self::Week => Some((today, today.add_days(7))),
            Self::Month => Some((today, today.add_months(1))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilter {
    pub show_completed: bool,
    pub priority: PriorityFilter,
    pub timeframe: Timeframe,
}

impl Default for TodoFilter {
    fn default() -> Self {
        Self {
            show_completed: true,
            priority: PriorityFilter::All,
            timeframe: Timeframe::All,
        }
    }
}

impl TodoFilter {
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        if task.completed && !self.show_completed {
            return false;
        }
        if !self.priority.matches(task.priority) {
            return false;
        }
        // Undated tasks are never excluded by timeframe.
        match (self.timeframe.window(today), task.due_date) {
            (Some((start, end)), Some(due)) => {
                let due = day_of(due);
                due >= start && due <= end
            }
            _ => true,
        }
    }
}

/// Tasks passing `filter`, in their original order.
pub fn filter_tasks(tasks: &[Task], filter: &TodoFilter, today: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| filter.matches(t, today))
        .cloned()
        .collect()
}

/// Display order: open before done, then dated (soonest first) before
/// undated, then by priority.
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.priority.cmp(&b.priority))
}

/// Stable in-place sort by [`compare_tasks`].
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// Filter then sort, the list a task view shows.
pub fn visible_tasks(tasks: &[Task], filter: &TodoFilter, today: NaiveDate) -> Vec<Task> {
    let mut out = filter_tasks(tasks, filter, today);
    sort_tasks(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::start_of;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn make_task(id: &str, priority: Priority, due: Option<NaiveDate>) -> Task {
        let task = Task::new(id, format!("task {id}"), created()).with_priority(priority);
        match due {
            // Late in the day, so only the date part can match.
            Some(d) => task.with_due_date(start_of(d) + chrono::TimeDelta::hours(22)),
            None => task,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn default_filter_keeps_everything() {
        let today = date(2024, 1, 3);
        let tasks = vec![
            make_task("a", Priority::Low, None),
            make_task("b", Priority::High, Some(date(2030, 1, 1))),
            make_task("c", Priority::Medium, None).completed_at(created()),
        ];
        assert_eq!(filter_tasks(&tasks, &TodoFilter::default(), today).len(), 3);
    }

    #[test]
    fn hides_completed_and_other_priorities() {
        let today = date(2024, 1, 3);
        let tasks = vec![
            make_task("a", Priority::High, None),
            make_task("b", Priority::Low, None),
            make_task("c", Priority::High, None).completed_at(created()),
        ];
        let filter = TodoFilter {
            show_completed: false,
            priority: PriorityFilter::High,
            ..TodoFilter::default()
        };
        assert_eq!(ids(&filter_tasks(&tasks, &filter, today)), ["a"]);
    }

    #[test]
    fn timeframe_windows_are_inclusive_and_date_only() {
        let today = date(2024, 1, 31);
        let tasks = vec![
            make_task("yesterday", Priority::Medium, Some(date(2024, 1, 30))),
            make_task("today", Priority::Medium, Some(today)),
            make_task("week_end", Priority::Medium, Some(date(2024, 2, 7))),
            make_task("after_week", Priority::Medium, Some(date(2024, 2, 8))),
            // Jan 31 + 1 month clamps to Feb 29.
            make_task("month_end", Priority::Medium, Some(date(2024, 2, 29))),
            make_task("after_month", Priority::Medium, Some(date(2024, 3, 1))),
            make_task("undated", Priority::Medium, None),
        ];

        let only = |timeframe| TodoFilter {
            timeframe,
            ..TodoFilter::default()
        };

        assert_eq!(
            ids(&filter_tasks(&tasks, &only(Timeframe::Today), today)),
            ["today", "undated"]
        );
        assert_eq!(
            ids(&filter_tasks(&tasks, &only(Timeframe::Week), today)),
            ["today", "week_end", "undated"]
        );
        assert_eq!(
            ids(&filter_tasks(&tasks, &only(Timeframe::Month), today)),
            ["today", "week_end", "after_week", "month_end", "undated"]
        );
    }

    #[test]
    fn filtering_is_idempotent() {
        let today = date(2024, 1, 3);
        let tasks = vec![
            make_task("a", Priority::High, Some(date(2024, 1, 3))),
            make_task("b", Priority::Low, Some(date(2024, 1, 9))),
            make_task("c", Priority::High, None).completed_at(created()),
            make_task("d", Priority::Medium, Some(date(2025, 1, 1))),
        ];
        for show_completed in [true, false] {
            for priority in [
                PriorityFilter::All,
                PriorityFilter::Low,
                PriorityFilter::Medium,
                PriorityFilter::High,
            ] {
                for timeframe in [Timeframe::All, Timeframe::Today, Timeframe::Week, Timeframe::Month] {
                    let filter = TodoFilter {
                        show_completed,
                        priority,
                        timeframe,
                    };
                    let once = filter_tasks(&tasks, &filter, today);
                    let twice = filter_tasks(&once, &filter, today);
                    assert_eq!(once, twice);
                }
            }
        }
    }

    #[test]
    fn sort_puts_dated_before_undated_regardless_of_priority() {
        let mut tasks = vec![
            make_task("high_10", Priority::High, Some(date(2024, 1, 10))),
            make_task("high_none", Priority::High, None),
            make_task("medium_05", Priority::Medium, Some(date(2024, 1, 5))),
        ];
        sort_tasks(&mut tasks);
        assert_eq!(ids(&tasks), ["medium_05", "high_10", "high_none"]);
    }

    #[test]
    fn sort_completed_last_and_stable() {
        let mut tasks = vec![
            make_task("done", Priority::High, Some(date(2024, 1, 1))).completed_at(created()),
            make_task("low", Priority::Low, None),
            make_task("first_medium", Priority::Medium, None),
            make_task("second_medium", Priority::Medium, None),
            make_task("high", Priority::High, None),
        ];
        sort_tasks(&mut tasks);
        assert_eq!(
            ids(&tasks),
            ["high", "first_medium", "second_medium", "low", "done"]
        );
    }

    #[test]
    fn visible_tasks_filters_then_sorts() {
        let today = date(2024, 1, 3);
        let tasks = vec![
            make_task("later", Priority::Low, Some(date(2024, 1, 9))),
            make_task("sooner", Priority::Low, Some(date(2024, 1, 4))),
            make_task("far", Priority::Low, Some(date(2024, 6, 1))),
        ];
        let filter = TodoFilter {
            timeframe: Timeframe::Week,
            ..TodoFilter::default()
        };
        assert_eq!(ids(&visible_tasks(&tasks, &filter, today)), ["sooner", "later"]);
    }

    #[test]
    fn filter_serde_shape() {
        let filter: TodoFilter =
            serde_json::from_str(r#"{"showCompleted":false,"priority":"high","timeframe":"week"}"#)
                .unwrap();
        assert!(!filter.show_completed);
        assert_eq!(filter.priority, PriorityFilter::High);
        assert_eq!(filter.timeframe, Timeframe::Week);
    }
}
