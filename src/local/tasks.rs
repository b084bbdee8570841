//! Task list stored on this device while no one is signed in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::{CacheError, ValidationError};
use crate::local::kv::{KeyValueStore, get_json, set_json};
use crate::todos::filter::TodoFilter;
use crate::todos::model::{Priority, Task, TaskPatch};

pub const TASKS_KEY: &str = "lifetracker-todos";
pub const FILTER_KEY: &str = "lifetracker-todo-filter";

pub struct LocalTasks {
    store: Arc<dyn KeyValueStore>,
}

impl LocalTasks {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored tasks, newest first. An unreadable entry reads as empty.
    pub async fn load(&self) -> Result<Vec<Task>, CacheError> {
        match self.load_strict().await {
            Ok(tasks) => Ok(tasks),
            Err(CacheError::Malformed { reason, .. }) => {
                warn!(key = TASKS_KEY, %reason, "Ignoring malformed local tasks");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`load`](Self::load), but an unreadable entry is an error.
    pub async fn load_strict(&self) -> Result<Vec<Task>, CacheError> {
        Ok(get_json::<Vec<Task>>(self.store.as_ref(), TASKS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn replace(&self, tasks: &[Task]) -> Result<(), CacheError> {
        set_json(self.store.as_ref(), TASKS_KEY, &tasks).await
    }

    pub async fn add(
        &self,
        text: &str,
        due_date: Option<DateTime<Utc>>,
        priority: Priority,
    ) -> crate::error::Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyField { field: "text" }.into());
        }
        let mut task = Task::new(Uuid::new_v4().to_string(), text, Utc::now()).with_priority(priority);
        task.due_date = due_date;

        let mut tasks = self.load().await?;
        tasks.insert(0, task.clone());
        self.replace(&tasks).await?;
        Ok(task)
    }

    pub async fn toggle(&self, id: &str) -> Result<Option<Task>, CacheError> {
        self.edit(id, |task| task.toggle(Utc::now())).await
    }

    pub async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, CacheError> {
        self.edit(id, |task| task.apply(patch, Utc::now())).await
    }

    pub async fn remove(&self, id: &str) -> Result<bool, CacheError> {
        let mut tasks = self.load().await?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.replace(&tasks).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.remove(TASKS_KEY).await
    }

    /// Last filter used in the task view, or the default.
    pub async fn filter(&self) -> TodoFilter {
        match get_json(self.store.as_ref(), FILTER_KEY).await {
            Ok(filter) => filter.unwrap_or_default(),
            Err(e) => {
                warn!(key = FILTER_KEY, error = %e, "Falling back to default task filter");
                TodoFilter::default()
            }
        }
    }

    pub async fn save_filter(&self, filter: &TodoFilter) -> Result<(), CacheError> {
        set_json(self.store.as_ref(), FILTER_KEY, filter).await
    }

    async fn edit(&self, id: &str, edit: impl FnOnce(&mut Task)) -> Result<Option<Task>, CacheError> {
        let mut tasks = self.load().await?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        edit(task);
        let updated = task.clone();
        self.replace(&tasks).await?;
        Ok(Some(updated))
    }
}
