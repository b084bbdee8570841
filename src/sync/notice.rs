//! Notice board — user-visible outcome messages with broadcast fan-out.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;
use uuid::Uuid;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Oldest notices are dropped past this many.
pub const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub level: NoticeLevel,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeLevel::Success)
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeLevel::Error)
    }

    fn new(title: impl Into<String>, description: impl Into<String>, level: NoticeLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            level,
            created_at: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Recent notices, newest last.
pub struct NoticeBoard {
    notices: RwLock<VecDeque<Notice>>,
    tx: broadcast::Sender<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            notices: RwLock::new(VecDeque::new()),
            tx,
        })
    }

    /// Subscribe to notices as they are posted.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub async fn push(&self, notice: Notice) {
        debug!(title = %notice.title, level = ?notice.level, "Notice posted");
        {
            let mut notices = self.notices.write().await;
            notices.push_back(notice.clone());
            while notices.len() > MAX_NOTICES {
                notices.pop_front();
            }
        }
        let _ = self.tx.send(notice);
    }

    pub async fn success(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(Notice::success(title, description)).await;
    }

    pub async fn error(&self, title: impl Into<String>, description: impl Into<String>) {
        self.push(Notice::error(title, description)).await;
    }

    pub async fn list(&self) -> Vec<Notice> {
        self.notices.read().await.iter().cloned().collect()
    }

    pub async fn errors(&self) -> Vec<Notice> {
        self.notices
            .read()
            .await
            .iter()
            .filter(|n| n.is_error())
            .cloned()
            .collect()
    }

    /// Remove one notice. Returns whether it was present.
    pub async fn dismiss(&self, id: Uuid) -> bool {
        let mut notices = self.notices.write().await;
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    pub async fn clear(&self) {
        self.notices.write().await.clear();
    }
}
