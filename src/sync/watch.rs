//! Change watchers — debounced refetch on realtime notifications.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::store::ChangeEvent;

/// Owns a running watcher. Dropping it aborts the background task, so no
/// refetch lands after teardown.
#[derive(Debug)]
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the watcher now.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a watcher that calls `on_change` once per burst of matching events.
///
/// After the first matching event the watcher waits `debounce`, discards
/// whatever else queued up meanwhile, then runs `on_change`. Events that
/// arrive while `on_change` runs start the next burst.
pub fn spawn_change_watcher<P, F, Fut>(
    mut rx: broadcast::Receiver<ChangeEvent>,
    debounce: Duration,
    matches: P,
    mut on_change: F,
) -> WatchHandle
where
    P: Fn(&ChangeEvent) -> bool + Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) if !matches(&event) => continue,
                // Missed events may have matched.
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }

            tokio::time::sleep(debounce).await;
            let mut coalesced = 0u32;
            loop {
                match rx.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => coalesced += 1,
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
            debug!(coalesced, "Change burst settled, refreshing");
            on_change().await;
        }
    });
    WatchHandle { task }
}
