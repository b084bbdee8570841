//! Task data model — items, priorities, and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task urgency. Orders `High < Medium < Low` so that sorting puts urgent
/// work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Rows written before priorities existed carry `null`; read those as medium.
fn de_priority<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Priority, D::Error> {
    Ok(Option::<Priority>::deserialize(d)?.unwrap_or_default())
}

/// A single task.
///
/// `completed_at` is set exactly when `completed` is true; go through
/// [`Task::set_completed`] rather than writing the fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_priority")]
    pub priority: Priority,
}

impl Task {
    /// Create an open, medium-priority task.
    pub fn new(id: impl Into<String>, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
            created_at: now,
            completed_at: None,
            due_date: None,
            priority: Priority::default(),
        }
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Builder: set priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: mark completed at `at`.
    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.set_completed(true, at);
        self
    }

    /// Set completion, keeping `completed_at` in step.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if completed == self.completed && completed == self.completed_at.is_some() {
            return;
        }
        self.completed = completed;
        self.completed_at = completed.then_some(now);
    }

    /// Flip completion.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.set_completed(!self.completed, now);
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: &TaskPatch, now: DateTime<Utc>) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed, now);
        }
        if let Some(due) = patch.due_date {
            self.due_date = due;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }
}

/// Partial update to a task. `None` leaves a field untouched; for
/// `due_date`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn new_task_defaults() {
        let task = Task::new("t1", "Buy milk", now());
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(task.due_date.is_none());
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn completion_invariant_is_kept() {
        let mut task = Task::new("t1", "Write report", now());
        task.toggle(now());
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now()));

        task.set_completed(false, now());
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn set_completed_repairs_missing_timestamp() {
        let mut task = Task::new("t1", "x", now());
        task.completed = true;
        task.set_completed(true, now());
        assert_eq!(task.completed_at, Some(now()));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let due = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let mut task = Task::new("t1", "Old", now()).with_due_date(due);

        task.apply(
            &TaskPatch {
                text: Some("New".into()),
                priority: Some(Priority::High),
                ..TaskPatch::default()
            },
            now(),
        );
        assert_eq!(task.text, "New");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, Some(due));

        task.apply(
            &TaskPatch {
                due_date: Some(None),
                ..TaskPatch::default()
            },
            now(),
        );
        assert!(task.due_date.is_none());
    }

    #[test]
    fn priority_orders_high_first() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort();
        assert_eq!(priorities, Priority::ALL);
    }

    #[test]
    fn priority_serde_snake_case() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn task_boundary_shape() {
        let json = r#"{
            "id": "abc",
            "text": "Call mom",
            "completed": true,
            "createdAt": "2024-03-01T09:00:00Z",
            "completedAt": "2024-03-02T10:00:00.000Z",
            "dueDate": null,
            "priority": null
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.completed_at.is_some());

        let out = serde_json::to_string(&task).unwrap();
        assert!(out.contains("\"createdAt\""));
        assert!(out.contains("\"completedAt\""));
        assert!(out.contains("\"dueDate\":null"));
    }

    #[test]
    fn empty_patch() {
        assert!(TaskPatch::default().is_empty());
        assert!(!TaskPatch::completed(true).is_empty());
    }
}
