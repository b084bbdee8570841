//! Goal data model — goals, their ordered steps, and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A goal, optionally with a target date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    /// Empty when the stored description is null.
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub description: String,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
}

impl Goal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            target_date: None,
            completed: false,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set target date.
    pub fn with_target_date(mut self, target: DateTime<Utc>) -> Self {
        self.target_date = Some(target);
        self
    }

    /// Builder: mark completed.
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    pub fn apply(&mut self, patch: &GoalPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(target) = patch.target_date {
            self.target_date = target;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Partial update to a goal. For `target_date`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl GoalPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

/// One step towards a goal. `order` is zero-based and contiguous within
/// the goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStep {
    pub id: String,
    pub goal_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "de_nullable_string")]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub completed: bool,
}

impl GoalStep {
    pub fn new(
        id: impl Into<String>,
        goal_id: impl Into<String>,
        title: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            goal_id: goal_id.into(),
            title: title.into(),
            description: String::new(),
            order,
            completed: false,
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn de_nullable_string<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}
