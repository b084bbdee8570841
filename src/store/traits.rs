//! `Database` trait — single async interface for all persistence.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::DatabaseError;
use crate::goals::model::{Goal, GoalPatch, GoalStep};
use crate::profile::UserProfile;
use crate::todos::model::{Task, TaskPatch};

/// Settings key the profile is stored under.
pub const PROFILE_KEY: &str = "profile";

/// Table a change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Todos,
    Goals,
    GoalSteps,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change, broadcast after the write commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub user_id: String,
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub id: String,
}

/// Backend-agnostic database trait covering tasks, goals, steps, and settings.
///
/// Every record is scoped to a `user_id`. Insert methods assign the
/// canonical id; the id carried by the argument is ignored.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// All tasks for a user, newest first.
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, DatabaseError>;

    /// Insert a task; returns the stored row when the backend reads it back.
    async fn insert_task(&self, user_id: &str, task: &Task) -> Result<Option<Task>, DatabaseError>;

    /// Apply a partial update; `NotFound` if the task does not exist.
    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Task, DatabaseError>;

    /// Delete a task. Returns whether a row was removed.
    async fn delete_task(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError>;

    // ── Goals ───────────────────────────────────────────────────────

    /// All goals for a user, newest first.
    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>, DatabaseError>;

    async fn insert_goal(&self, user_id: &str, goal: &Goal) -> Result<Option<Goal>, DatabaseError>;

    async fn update_goal(
        &self,
        user_id: &str,
        id: &str,
        patch: &GoalPatch,
    ) -> Result<Goal, DatabaseError>;

    /// Delete a goal and its steps.
    async fn delete_goal(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError>;

    // ── Goal steps ──────────────────────────────────────────────────

    /// Steps of one goal, by order.
    async fn list_goal_steps(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> Result<Vec<GoalStep>, DatabaseError>;

    /// Replace a goal's whole step list. Steps are stored in the given
    /// sequence with orders `0..len`; returns the stored list.
    async fn replace_goal_steps(
        &self,
        user_id: &str,
        goal_id: &str,
        steps: &[GoalStep],
    ) -> Result<Vec<GoalStep>, DatabaseError>;

    /// Overwrite one step's title, description, and completion.
    async fn update_goal_step(&self, user_id: &str, step: &GoalStep) -> Result<(), DatabaseError>;

    /// Delete one step and renumber the rest; returns the remaining steps.
    async fn delete_goal_step(
        &self,
        user_id: &str,
        goal_id: &str,
        step_id: &str,
    ) -> Result<Vec<GoalStep>, DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// The stored profile, life expectancy re-clamped on the way out.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        match self.get_setting(user_id, PROFILE_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| DatabaseError::Serialization(format!("profile: {e}"))),
            None => Ok(None),
        }
    }

    async fn set_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(profile)
            .map_err(|e| DatabaseError::Serialization(format!("profile: {e}")))?;
        self.set_setting(user_id, PROFILE_KEY, &value).await
    }

    // ── Realtime ────────────────────────────────────────────────────

    /// Subscribe to committed changes across all users.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent>;
}
