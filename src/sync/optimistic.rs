//! Optimistic mutations over an in-memory list.
//!
//! A tentative change is applied to the list before the remote write is
//! issued. Once the write settles the tentative record is swapped for the
//! canonical one, or dropped again, and the caller is told whether the
//! list must be refetched.

use std::future::Future;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::sync::record::Record;

/// Prefix marking ids minted locally, before the store assigns one.
pub const TEMP_ID_PREFIX: &str = "temp-";

pub fn temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// The local change applied ahead of the remote write.
#[derive(Debug, Clone)]
pub enum Tentative<T> {
    /// Prepend a new record carrying a temporary id.
    Insert(T),
    /// Overwrite the record with the same id.
    Replace(T),
    /// Drop the record with this id.
    Remove(String),
}

impl<T: Record> Tentative<T> {
    pub fn target_id(&self) -> &str {
        match self {
            Self::Insert(r) | Self::Replace(r) => r.id(),
            Self::Remove(id) => id,
        }
    }

    fn apply(&self, list: &mut Vec<T>) {
        match self {
            Self::Insert(record) => list.insert(0, record.clone()),
            Self::Replace(record) => {
                if let Some(slot) = list.iter_mut().find(|r| r.id() == record.id()) {
                    *slot = record.clone();
                }
            }
            Self::Remove(id) => list.retain(|r| r.id() != id),
        }
    }
}

/// How an optimistic mutation ended.
#[derive(Debug)]
pub enum Settled<T> {
    /// The remote accepted the write. Carries the canonical record, which
    /// is already in the list; `None` for removals.
    Confirmed(Option<T>),
    /// The remote accepted the write but returned nothing to swap in.
    Unconfirmed,
    /// The remote rejected the write. Inserts are already rolled back;
    /// `refetch` is set when only a refetch can restore the list.
    Failed { error: DatabaseError, refetch: bool },
}

impl<T> Settled<T> {
    pub fn needs_refetch(&self) -> bool {
        match self {
            Self::Confirmed(_) => false,
            Self::Unconfirmed => true,
            Self::Failed { refetch, .. } => *refetch,
        }
    }
}

/// Apply `change` to `list`, await `commit`, then reconcile.
///
/// The list lock is not held across the remote write.
pub async fn apply_optimistic<T, F>(list: &RwLock<Vec<T>>, change: Tentative<T>, commit: F) -> Settled<T>
where
    T: Record,
    F: Future<Output = Result<Option<T>, DatabaseError>>,
{
    change.apply(&mut *list.write().await);
    let target = change.target_id().to_string();

    match (commit.await, change) {
        (Ok(_), Tentative::Remove(_)) => Settled::Confirmed(None),
        (Ok(Some(canonical)), change) => {
            let mut items = list.write().await;
            if items.iter().any(|r| r.id() == target) {
                if canonical.id() != target {
                    items.retain(|r| r.id() != canonical.id());
                }
                if let Some(slot) = items.iter_mut().find(|r| r.id() == target) {
                    *slot = canonical.clone();
                }
            } else if let Some(slot) = items.iter_mut().find(|r| r.id() == canonical.id()) {
                // A refetch replaced the list while the write was in flight.
                *slot = canonical.clone();
            } else if matches!(change, Tentative::Insert(_)) {
                items.insert(0, canonical.clone());
            }
            debug!(noun = T::NOUN, tentative = %target, id = %canonical.id(), "Optimistic change confirmed");
            Settled::Confirmed(Some(canonical))
        }
        (Ok(None), _) => Settled::Unconfirmed,
        (Err(error), Tentative::Insert(_)) => {
            list.write().await.retain(|r| r.id() != target);
            debug!(noun = T::NOUN, tentative = %target, "Optimistic insert rolled back");
            Settled::Failed {
                error,
                refetch: false,
            }
        }
        (Err(error), _) => Settled::Failed {
            error,
            refetch: true,
        },
    }
}
