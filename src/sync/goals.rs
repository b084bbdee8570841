//! Goal collection — goals with optimistic writes, plus per-goal step lists.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError, ValidationError};
use crate::goals::analytics::GoalAnalytics;
use crate::goals::model::{Goal, GoalPatch, GoalStep};
use crate::goals::steps::{self, StepProgress, validate_steps};
use crate::goals::timeframe::split_short_long;
use crate::store::{ChangeTable, Database};
use crate::sync::collection::{Mutation, RemoteList};
use crate::sync::notice::{Notice, NoticeBoard};
use crate::sync::optimistic::{Tentative, temp_id};
use crate::sync::refresh::with_retry;
use crate::sync::watch::{WatchHandle, spawn_change_watcher};

pub struct GoalCollection {
    list: RemoteList<Goal>,
    /// Loaded step lists, keyed by goal id, each sorted by order.
    steps: RwLock<HashMap<String, Vec<GoalStep>>>,
}

impl GoalCollection {
    pub fn new(
        db: Arc<dyn Database>,
        user_id: impl Into<String>,
        policy: SyncConfig,
        notices: Arc<NoticeBoard>,
    ) -> Arc<Self> {
        Arc::new(Self {
            list: RemoteList::new(db, user_id, policy, notices),
            steps: RwLock::new(HashMap::new()),
        })
    }

    pub async fn goals(&self) -> Vec<Goal> {
        self.list.snapshot().await
    }

    pub async fn analytics(&self, now: DateTime<Utc>) -> GoalAnalytics {
        GoalAnalytics::compute(&self.list.snapshot().await, now)
    }

    /// `(short_term, long_term)` for the goal list view.
    pub async fn split(&self, now: DateTime<Utc>) -> (Vec<Goal>, Vec<Goal>) {
        let goals = self.list.snapshot().await;
        let (short, long) = split_short_long(&goals, now);
        (
            short.into_iter().cloned().collect(),
            long.into_iter().cloned().collect(),
        )
    }

    pub async fn refresh(&self, force: bool) -> Result<bool> {
        Ok(self.list.refresh(force).await?)
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.list.notices().list().await
    }

    // ── Goals ───────────────────────────────────────────────────────

    pub async fn add(
        &self,
        title: &str,
        description: &str,
        target_date: Option<DateTime<Utc>>,
    ) -> Result<Option<Goal>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(self
                .reject("add goal", ValidationError::EmptyField { field: "title" })
                .await);
        }

        let mut tentative = Goal::new(temp_id(), title).with_description(description.trim());
        tentative.target_date = target_date;

        let commit = self.list.db().insert_goal(self.list.user_id(), &tentative);
        Ok(self
            .list
            .mutate(Mutation::Add, Tentative::Insert(tentative.clone()), commit)
            .await?)
    }

    pub async fn update(&self, id: &str, patch: GoalPatch) -> Result<Option<Goal>> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(self
                .reject("update goal", ValidationError::EmptyField { field: "title" })
                .await);
        }
        let current = self.existing(id, "update goal").await?;
        self.write(Mutation::Update, current, patch).await
    }

    pub async fn toggle(&self, id: &str) -> Result<Option<Goal>> {
        let current = self.existing(id, "update goal").await?;
        let completed = !current.completed;
        self.write(Mutation::Toggle { completed }, current, GoalPatch::completed(completed))
            .await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.existing(id, "remove goal").await?;
        let db = self.list.db();
        let user_id = self.list.user_id();
        self.list
            .mutate(Mutation::Remove, Tentative::Remove(id.to_string()), async move {
                db.delete_goal(user_id, id).await.map(|_| None)
            })
            .await?;
        self.steps.write().await.remove(id);
        Ok(())
    }

    /// Refetch on remote goal changes for this user until the handle drops.
    pub fn watch(self: &Arc<Self>) -> WatchHandle {
        let user_id = self.list.user_id().to_string();
        let this = Arc::clone(self);
        spawn_change_watcher(
            self.list.db().subscribe_changes(),
            self.list.policy().debounce,
            move |e| e.table == ChangeTable::Goals && e.user_id == user_id,
            move || {
                let this = Arc::clone(&this);
                async move {
                    let _ = this.list.refresh(true).await;
                }
            },
        )
    }

    // ── Steps ───────────────────────────────────────────────────────

    /// Cached steps for a goal; empty until loaded.
    pub async fn steps(&self, goal_id: &str) -> Vec<GoalStep> {
        self.steps
            .read()
            .await
            .get(goal_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn progress(&self, goal_id: &str) -> StepProgress {
        StepProgress::of(&self.steps(goal_id).await)
    }

    /// Fetch a goal's steps from the store.
    pub async fn load_steps(&self, goal_id: &str) -> Result<Vec<GoalStep>> {
        let policy = self.list.policy();
        let db = self.list.db();
        let user_id = self.list.user_id();
        let fetched = with_retry("load steps", policy.fetch_attempts, policy.retry_delay, || {
            db.list_goal_steps(user_id, goal_id)
        })
        .await;

        match fetched {
            Ok(mut loaded) => {
                steps::renormalize(&mut loaded);
                self.steps
                    .write()
                    .await
                    .insert(goal_id.to_string(), loaded.clone());
                Ok(loaded)
            }
            Err(e) => {
                warn!(goal_id, error = %e, "Loading goal steps failed");
                self.list
                    .notices()
                    .error("Failed to load goal steps", e.to_string())
                    .await;
                Err(e.into())
            }
        }
    }

    /// Replace a goal's step list, in the given sequence.
    ///
    /// Rejected without a remote call if any title is blank.
    pub async fn save_steps(&self, goal_id: &str, new_steps: Vec<GoalStep>) -> Result<Vec<GoalStep>> {
        if let Err(e) = validate_steps(&new_steps) {
            return Err(self.reject("save steps", e).await);
        }

        let saved = self
            .list
            .db()
            .replace_goal_steps(self.list.user_id(), goal_id, &new_steps)
            .await;

        match saved {
            Ok(stored) => {
                info!(goal_id, count = stored.len(), "Goal steps saved");
                self.steps
                    .write()
                    .await
                    .insert(goal_id.to_string(), stored.clone());
                self.list
                    .notices()
                    .success("Steps saved", "Your goal steps have been saved.")
                    .await;
                Ok(stored)
            }
            Err(e) => self.step_write_failed(goal_id, "save steps", e).await,
        }
    }

    /// Flip one step's completion.
    pub async fn toggle_step(&self, goal_id: &str, step_id: &str) -> Result<GoalStep> {
        let updated = {
            let mut cache = self.steps.write().await;
            cache
                .get_mut(goal_id)
                .and_then(|list| steps::toggle_step(list, step_id).cloned())
        };
        let Some(updated) = updated else {
            return Err(self.unknown_step("update step", step_id).await);
        };

        match self
            .list
            .db()
            .update_goal_step(self.list.user_id(), &updated)
            .await
        {
            Ok(()) => Ok(updated),
            Err(e) => self.step_write_failed(goal_id, "update step", e).await,
        }
    }

    /// Delete one step; the remaining steps close the gap.
    pub async fn delete_step(&self, goal_id: &str, step_id: &str) -> Result<Vec<GoalStep>> {
        let removed = {
            let mut cache = self.steps.write().await;
            cache
                .get_mut(goal_id)
                .and_then(|list| steps::remove_step(list, step_id))
        };
        if removed.is_none() {
            return Err(self.unknown_step("delete step", step_id).await);
        }

        match self
            .list
            .db()
            .delete_goal_step(self.list.user_id(), goal_id, step_id)
            .await
        {
            Ok(remaining) => {
                self.steps
                    .write()
                    .await
                    .insert(goal_id.to_string(), remaining.clone());
                Ok(remaining)
            }
            Err(e) => self.step_write_failed(goal_id, "delete step", e).await,
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn write(&self, mutation: Mutation, current: Goal, patch: GoalPatch) -> Result<Option<Goal>> {
        let mut next = current;
        next.apply(&patch);
        let id = next.id.clone();

        let db = self.list.db();
        let user_id = self.list.user_id();
        let patch = &patch;
        let id_ref = id.as_str();
        Ok(self
            .list
            .mutate(mutation, Tentative::Replace(next), async move {
                db.update_goal(user_id, id_ref, patch).await.map(Some)
            })
            .await?)
    }

    /// Report a failed step write and reload the authoritative list.
    async fn step_write_failed<T>(
        &self,
        goal_id: &str,
        operation: &'static str,
        error: crate::error::DatabaseError,
    ) -> Result<T> {
        warn!(goal_id, operation, error = %error, "Goal step write failed");
        self.list
            .notices()
            .error(format!("Failed to {operation}"), error.to_string())
            .await;
        // Reload failures post their own notice.
        let _ = self.load_steps(goal_id).await;
        Err(SyncError::Remote {
            operation,
            source: error,
        }
        .into())
    }

    async fn existing(&self, id: &str, operation: &str) -> Result<Goal> {
        match self.list.find(id).await {
            Some(goal) => Ok(goal),
            None => Err(self
                .reject(
                    operation,
                    ValidationError::UnknownRecord {
                        entity: "goal",
                        id: id.to_string(),
                    },
                )
                .await),
        }
    }

    async fn unknown_step(&self, operation: &str, step_id: &str) -> crate::error::Error {
        self.reject(
            operation,
            ValidationError::UnknownRecord {
                entity: "goal step",
                id: step_id.to_string(),
            },
        )
        .await
    }

    async fn reject(&self, operation: &str, error: ValidationError) -> crate::error::Error {
        self.list
            .notices()
            .error(format!("Failed to {operation}"), error.to_string())
            .await;
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::LibSqlBackend;
    use chrono::TimeDelta;
    use std::time::Duration;

    async fn make_collection() -> Arc<GoalCollection> {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let policy = SyncConfig {
            retry_delay: Duration::from_millis(1),
            ..SyncConfig::default()
        };
        GoalCollection::new(db, "u1", policy, NoticeBoard::new())
    }

    fn draft_steps(titles: &[&str]) -> Vec<GoalStep> {
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| GoalStep::new(temp_id(), "", *t, i as u32))
            .collect()
    }

    #[tokio::test]
    async fn goal_lifecycle() {
        let goals = make_collection().await;
        let target = Utc::now() + TimeDelta::days(200);

        let goal = goals
            .add("Learn Spanish", " B2 level ", Some(target))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(goal.description, "B2 level");

        let (short, long) = goals.split(Utc::now()).await;
        assert!(short.is_empty());
        assert_eq!(long.len(), 1);

        let done = goals.toggle(&goal.id).await.unwrap().unwrap();
        assert!(done.completed);
        assert_eq!(goals.analytics(Utc::now()).await.completion_rate, 100);

        goals.remove(&goal.id).await.unwrap();
        assert!(goals.goals().await.is_empty());

        let titles: Vec<String> = goals.notices().await.into_iter().map(|n| n.title).collect();
        assert_eq!(titles, ["Goal added", "Goal completed", "Goal removed"]);
    }

    #[tokio::test]
    async fn blank_title_rejected() {
        let goals = make_collection().await;
        let err = goals.add(" ", "", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyField { field: "title" })));
    }

    #[tokio::test]
    async fn step_operations() {
        let goals = make_collection().await;
        let goal = goals.add("Run 10k", "", None).await.unwrap().unwrap();

        let saved = goals
            .save_steps(&goal.id, draft_steps(&["Buy shoes", "Run 5k", "Run 10k"]))
            .await
            .unwrap();
        assert_eq!(saved.len(), 3);
        assert!(saved.iter().all(|s| s.goal_id == goal.id));

        let toggled = goals.toggle_step(&goal.id, &saved[0].id).await.unwrap();
        assert!(toggled.completed);
        assert_eq!(goals.progress(&goal.id).await.percent(), 33);

        let remaining = goals.delete_step(&goal.id, &saved[1].id).await.unwrap();
        assert_eq!(remaining.iter().map(|s| s.order).collect::<Vec<_>>(), [0, 1]);
        assert_eq!(goals.progress(&goal.id).await.percent(), 50);

        // The store agrees with the cache.
        let reloaded = goals.load_steps(&goal.id).await.unwrap();
        assert_eq!(reloaded, goals.steps(&goal.id).await);
        assert!(reloaded[0].completed);
    }

    #[tokio::test]
    async fn invalid_steps_never_reach_the_store() {
        let goals = make_collection().await;
        let goal = goals.add("Write a book", "", None).await.unwrap().unwrap();

        let err = goals
            .save_steps(&goal.id, draft_steps(&["Outline", "  ", "Draft"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Step 2 title is empty");

        assert!(goals.load_steps(&goal.id).await.unwrap().is_empty());
        let errors: Vec<Notice> = goals
            .notices()
            .await
            .into_iter()
            .filter(|n| n.is_error())
            .collect();
        assert_eq!(errors[0].description, "Step 2 title is empty");
    }

    #[tokio::test]
    async fn unknown_step_is_rejected() {
        let goals = make_collection().await;
        let err = goals.toggle_step("g", "s").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::UnknownRecord { .. })));
    }
}
