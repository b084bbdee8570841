//! Refresh policy — poll guard and fixed-delay retries for remote fetches.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{DatabaseError, SyncError};

/// Skips unforced fetches while the last successful one is still fresh.
#[derive(Debug)]
pub struct FetchGuard {
    window: Duration,
    last_fetched: Mutex<Option<Instant>>,
}

impl FetchGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fetched: Mutex::new(None),
        }
    }

    /// Whether a fetch should go ahead now.
    pub async fn should_fetch(&self, force: bool) -> bool {
        if force {
            return true;
        }
        match *self.last_fetched.lock().await {
            Some(at) => at.elapsed() >= self.window,
            None => true,
        }
    }

    pub async fn mark_fetched(&self) {
        *self.last_fetched.lock().await = Some(Instant::now());
    }

    pub async fn reset(&self) {
        *self.last_fetched.lock().await = None;
    }
}

/// Run `op` up to `attempts` times, sleeping `delay` between tries.
///
/// Only transient failures are retried; anything else fails at once.
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DatabaseError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => {
                return Err(SyncError::Remote {
                    operation,
                    source: e,
                });
            }
            Err(e) if attempt >= attempts => {
                return Err(SyncError::RetriesExhausted {
                    attempts,
                    source: e,
                });
            }
            Err(e) => {
                warn!(operation, attempt, error = %e, "Transient failure, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn guard_skips_within_window() {
        let guard = FetchGuard::new(Duration::from_millis(80));
        assert!(guard.should_fetch(false).await);

        guard.mark_fetched().await;
        assert!(!guard.should_fetch(false).await);
        assert!(guard.should_fetch(true).await);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(guard.should_fetch(false).await);
    }

    #[tokio::test]
    async fn guard_reset() {
        let guard = FetchGuard::new(Duration::from_secs(30));
        guard.mark_fetched().await;
        guard.reset().await;
        assert!(guard.should_fetch(false).await);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = with_retry("list_tasks", 3, Duration::from_millis(5), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DatabaseError::Transport("reset".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = with_retry("list_tasks", 3, Duration::from_millis(1), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(DatabaseError::Pool("busy".into())) }
        })
        .await;
        assert!(matches!(
            result,
            Err(SyncError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = with_retry("list_goals", 3, Duration::from_millis(1), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(DatabaseError::Query("syntax".into())) }
        })
        .await;
        assert!(matches!(result, Err(SyncError::Remote { operation: "list_goals", .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
