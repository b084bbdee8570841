//! Task collection — the signed-in user's tasks with optimistic writes.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::SyncConfig;
use crate::error::{Result, ValidationError};
use crate::store::{ChangeTable, Database};
use crate::sync::collection::{Mutation, RemoteList};
use crate::sync::notice::{Notice, NoticeBoard};
use crate::sync::optimistic::{Tentative, temp_id};
use crate::sync::watch::{WatchHandle, spawn_change_watcher};
use crate::todos::filter::{TodoFilter, visible_tasks};
use crate::todos::model::{Priority, Task, TaskPatch};
use crate::todos::stats::TaskStats;

pub struct TaskCollection {
    list: RemoteList<Task>,
}

impl TaskCollection {
    pub fn new(
        db: Arc<dyn Database>,
        user_id: impl Into<String>,
        policy: SyncConfig,
        notices: Arc<NoticeBoard>,
    ) -> Arc<Self> {
        Arc::new(Self {
            list: RemoteList::new(db, user_id, policy, notices),
        })
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.list.snapshot().await
    }

    /// Filtered and sorted for display.
    pub async fn visible(&self, filter: &TodoFilter, today: NaiveDate) -> Vec<Task> {
        visible_tasks(&self.list.snapshot().await, filter, today)
    }

    pub async fn stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats::compute(&self.list.snapshot().await, today)
    }

    pub async fn refresh(&self, force: bool) -> Result<bool> {
        Ok(self.list.refresh(force).await?)
    }

    /// Add a task; returns the stored task once the remote confirms it.
    pub async fn add(
        &self,
        text: &str,
        due_date: Option<DateTime<Utc>>,
        priority: Priority,
    ) -> Result<Option<Task>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.reject("add", ValidationError::EmptyField { field: "text" }).await);
        }

        let mut tentative = Task::new(temp_id(), text, Utc::now()).with_priority(priority);
        tentative.due_date = due_date;

        let commit = self.list.db().insert_task(self.list.user_id(), &tentative);
        Ok(self
            .list
            .mutate(Mutation::Add, Tentative::Insert(tentative.clone()), commit)
            .await?)
    }

    /// Flip a task's completion.
    pub async fn toggle(&self, id: &str) -> Result<Option<Task>> {
        let current = self.existing(id, "update").await?;
        let completed = !current.completed;
        self.write(Mutation::Toggle { completed }, current, TaskPatch::completed(completed))
            .await
    }

    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        if patch.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(self
                .reject("update", ValidationError::EmptyField { field: "text" })
                .await);
        }
        let current = self.existing(id, "update").await?;
        self.write(Mutation::Update, current, patch).await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.existing(id, "remove").await?;
        let db = self.list.db();
        let user_id = self.list.user_id();
        self.list
            .mutate(Mutation::Remove, Tentative::Remove(id.to_string()), async move {
                db.delete_task(user_id, id).await.map(|_| None)
            })
            .await?;
        Ok(())
    }

    /// Refetch on remote task changes for this user until the handle drops.
    pub fn watch(self: &Arc<Self>) -> WatchHandle {
        let user_id = self.list.user_id().to_string();
        let this = Arc::clone(self);
        spawn_change_watcher(
            self.list.db().subscribe_changes(),
            self.list.policy().debounce,
            move |e| e.table == ChangeTable::Todos && e.user_id == user_id,
            move || {
                let this = Arc::clone(&this);
                async move {
                    let _ = this.list.refresh(true).await;
                }
            },
        )
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.list.notices().list().await
    }

    async fn write(&self, mutation: Mutation, current: Task, patch: TaskPatch) -> Result<Option<Task>> {
        let mut next = current;
        next.apply(&patch, Utc::now());
        let id = next.id.clone();

        let db = self.list.db();
        let user_id = self.list.user_id();
        let patch = &patch;
        let id_ref = id.as_str();
        Ok(self
            .list
            .mutate(mutation, Tentative::Replace(next), async move {
                db.update_task(user_id, id_ref, patch).await.map(Some)
            })
            .await?)
    }

    async fn existing(&self, id: &str, operation: &'static str) -> Result<Task> {
        match self.list.find(id).await {
            Some(task) => Ok(task),
            None => Err(self
                .reject(
                    operation,
                    ValidationError::UnknownRecord {
                        entity: "task",
                        id: id.to_string(),
                    },
                )
                .await),
        }
    }

    async fn reject(&self, operation: &str, error: ValidationError) -> crate::error::Error {
        self.list
            .notices()
            .error(format!("Failed to {operation} task"), error.to_string())
            .await;
        error.into()
    }
}
