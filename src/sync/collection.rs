//! Remote-backed list shared by the task and goal collections.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{DatabaseError, SyncError};
use crate::store::Database;
use crate::sync::notice::NoticeBoard;
use crate::sync::optimistic::{Settled, Tentative, apply_optimistic};
use crate::sync::record::Record;
use crate::sync::refresh::{FetchGuard, with_retry};

/// Kind of write, for notices and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Add,
    Update,
    /// Completion flip, carrying the new state.
    Toggle { completed: bool },
    Remove,
}

impl Mutation {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update | Self::Toggle { .. } => "update",
            Self::Remove => "remove",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            Self::Add => "added",
            Self::Update | Self::Toggle { .. } => "updated",
            Self::Remove => "removed",
        }
    }

}

/// An in-memory list mirroring one user's rows of a remote table.
pub struct RemoteList<T: Record> {
    db: Arc<dyn Database>,
    user_id: String,
    items: RwLock<Vec<T>>,
    guard: FetchGuard,
    policy: SyncConfig,
    notices: Arc<NoticeBoard>,
}

impl<T: Record> RemoteList<T> {
    pub fn new(
        db: Arc<dyn Database>,
        user_id: impl Into<String>,
        policy: SyncConfig,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            db,
            user_id: user_id.into(),
            items: RwLock::new(Vec::new()),
            guard: FetchGuard::new(policy.refresh_window),
            policy,
            notices,
        }
    }

    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn policy(&self) -> SyncConfig {
        self.policy
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    pub async fn find(&self, id: &str) -> Option<T> {
        self.items.read().await.iter().find(|r| r.id() == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Replace the list with the authoritative one.
    ///
    /// Returns `Ok(false)` when skipped by the poll guard. Failures post a
    /// notice and leave the current list in place.
    pub async fn refresh(&self, force: bool) -> Result<bool, SyncError> {
        if !self.guard.should_fetch(force).await {
            debug!(noun = T::NOUN, "Skipping refresh inside poll window");
            return Ok(false);
        }

        let db = self.db();
        let user_id = self.user_id.as_str();
        let fetched = with_retry(
            "fetch",
            self.policy.fetch_attempts,
            self.policy.retry_delay,
            || T::fetch_all(db, user_id),
        )
        .await;

        match fetched {
            Ok(items) => {
                let count = items.len();
                *self.items.write().await = items;
                self.guard.mark_fetched().await;
                info!(noun = T::NOUN, user_id = %self.user_id, count, "Collection refreshed");
                Ok(true)
            }
            Err(e) => {
                warn!(noun = T::NOUN, error = %e, "Refresh failed");
                self.notices
                    .error(format!("Failed to load {}s", T::NOUN), e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    /// Run one optimistic write and reconcile the list with its outcome.
    pub async fn mutate<F>(
        &self,
        mutation: Mutation,
        change: Tentative<T>,
        commit: F,
    ) -> Result<Option<T>, SyncError>
    where
        F: Future<Output = Result<Option<T>, DatabaseError>>,
    {
        let target = change.target_id().to_string();
        let settled = apply_optimistic(&self.items, change, commit).await;
        let refetch = settled.needs_refetch();

        let result = match settled {
            Settled::Confirmed(record) => {
                info!(noun = T::NOUN, id = %target, operation = mutation.operation(), "Remote write confirmed");
                self.announce_success(mutation).await;
                Ok(record)
            }
            Settled::Unconfirmed => {
                self.announce_success(mutation).await;
                Ok(None)
            }
            Settled::Failed { error, .. } => {
                warn!(noun = T::NOUN, id = %target, operation = mutation.operation(), error = %error, "Remote write failed");
                self.notices
                    .error(
                        format!("Failed to {} {}", mutation.operation(), T::NOUN),
                        error.to_string(),
                    )
                    .await;
                Err(SyncError::Remote {
                    operation: mutation.operation(),
                    source: error,
                })
            }
        };

        if refetch {
            // A failed refetch has already posted its own notice.
            let _ = self.refresh(true).await;
        }
        result
    }

    async fn announce_success(&self, mutation: Mutation) {
        let noun = capitalize(T::NOUN);
        let (title, description) = match mutation {
            Mutation::Toggle { completed: true } => (
                format!("{noun} completed"),
                format!("Your {} has been completed.", T::NOUN),
            ),
            Mutation::Toggle { completed: false } => (
                format!("{noun} marked incomplete"),
                format!("Your {} has been marked as incomplete.", T::NOUN),
            ),
            Mutation::Remove => (
                format!("{noun} removed"),
                format!("Your {} has been removed.", T::NOUN),
            ),
            _ => (
                format!("{noun} {}", mutation.past_tense()),
                format!(
                    "Your {} has been {} successfully.",
                    T::NOUN,
                    mutation.past_tense()
                ),
            ),
        };
        self.notices.success(title, description).await;
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use crate::sync::optimistic::temp_id;
    use crate::todos::model::Task;
    use chrono::Utc;
    use std::time::Duration;

    async fn make_list() -> RemoteList<Task> {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let policy = SyncConfig {
            retry_delay: Duration::from_millis(1),
            ..SyncConfig::default()
        };
        RemoteList::new(db, "u1", policy, NoticeBoard::new())
    }

    #[test]
    fn capitalizes_nouns() {
        assert_eq!(capitalize("task"), "Task");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn refresh_respects_poll_window() {
        let list = make_list().await;
        list.db()
            .insert_task("u1", &Task::new("", "one", Utc::now()))
            .await
            .unwrap();

        assert!(list.refresh(false).await.unwrap());
        assert_eq!(list.len().await, 1);

        list.db()
            .insert_task("u1", &Task::new("", "two", Utc::now()))
            .await
            .unwrap();
        assert!(!list.refresh(false).await.unwrap());
        assert_eq!(list.len().await, 1);

        assert!(list.refresh(true).await.unwrap());
        assert_eq!(list.len().await, 2);
    }

    #[tokio::test]
    async fn confirmed_add_posts_success_notice() {
        let list = make_list().await;
        let tentative = Task::new(temp_id(), "Buy milk", Utc::now());
        let commit = list.db().insert_task("u1", &tentative);

        let stored = list
            .mutate(Mutation::Add, Tentative::Insert(tentative.clone()), commit)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(list.snapshot().await, vec![stored]);
        let notices = list.notices().list().await;
        assert_eq!(notices[0].title, "Task added");
        assert_eq!(notices[0].description, "Your task has been added successfully.");
    }

    #[tokio::test]
    async fn toggle_notice_follows_new_state() {
        let list = make_list().await;
        let record = Task::new("a", "x", Utc::now());
        for completed in [true, false] {
            list.mutate(
                Mutation::Toggle { completed },
                Tentative::Replace(record.clone()),
                async { Ok(Some(record.clone())) },
            )
            .await
            .unwrap();
        }
        let notices = list.notices().list().await;
        assert_eq!(notices[0].title, "Task completed");
        assert_eq!(notices[0].description, "Your task has been completed.");
        assert_eq!(notices[1].title, "Task marked incomplete");
        assert_eq!(notices[1].description, "Your task has been marked as incomplete.");
    }

    #[tokio::test]
    async fn failed_remove_refetches_and_reports() {
        let list = make_list().await;
        list.db()
            .insert_task("u1", &Task::new("", "keep me", Utc::now()))
            .await
            .unwrap();
        list.refresh(true).await.unwrap();
        let id = list.snapshot().await[0].id.clone();

        let err = list
            .mutate(Mutation::Remove, Tentative::Remove(id.clone()), async {
                Err(DatabaseError::Query("denied".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Remote { operation: "remove", .. }));
        assert_eq!(list.find(&id).await.map(|t| t.text), Some("keep me".to_string()));
        let errors = list.notices().errors().await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "Failed to remove task");
    }
}
