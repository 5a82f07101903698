//! De-duplicating work queue of record keys.
//!
//! Guarantees:
//! - a key waiting in the queue is stored once, however often it is added
//! - a key is handed to at most one worker at a time
//! - a key added while in flight runs again after the current attempt

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::engine::{Action, ReconcileResult};
use crate::key::ObjectKey;

/// How completed keys re-enter the queue.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// Delay before a `Requeue` outcome is retried.
    pub requeue_delay: Duration,

    /// Delay schedule for failed attempts.
    pub backoff: BackoffPolicy,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            requeue_delay: crate::DEFAULT_REQUEUE_DELAY,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    in_flight: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
    shut_down: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    policy: QueuePolicy,
}

/// Work queue shared between the event source and the workers of one kind.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<Shared>,
}

impl WorkQueue {
    pub fn new(policy: QueuePolicy) -> Self {
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                policy,
            }),
        }
    }

    /// Enqueue a key for reconciliation.
    pub async fn add(&self, key: ObjectKey) {
        let mut state = self.inner.state.lock().await;
        if state.shut_down {
            return;
        }

        if state.in_flight.contains(&key) {
            state.dirty.insert(key);
            return;
        }

        if state.queued.insert(key.clone()) {
            state.pending.push_back(key);
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Enqueue a key once `delay` has elapsed.
    pub fn add_after(&self, key: ObjectKey, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    pub async fn next(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.inner.notify.notified();
            {
                let mut state = self.inner.state.lock().await;
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.pending.pop_front() {
                    state.queued.remove(&key);
                    state.in_flight.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Report the outcome of an attempt handed out by [`WorkQueue::next`].
    ///
    /// Failures are retried with backoff and never given up on.
    pub async fn done(&self, key: &ObjectKey, result: &ReconcileResult) {
        let mut state = self.inner.state.lock().await;
        state.in_flight.remove(key);

        let delay = match result {
            Ok(Action::Done) => {
                state.failures.remove(key);
                None
            }
            Ok(Action::Requeue) => {
                state.failures.remove(key);
                Some(self.inner.policy.requeue_delay)
            }
            Err(_) => {
                let failures = state.failures.entry(key.clone()).or_insert(0);
                *failures = failures.saturating_add(1);
                Some(self.inner.policy.backoff.delay(*failures))
            }
        };

        let dirty = state.dirty.remove(key);
        drop(state);

        if dirty {
            self.add(key.clone()).await;
        } else if let Some(delay) = delay {
            debug!(key = %key, delay_ms = delay.as_millis() as u64, "Scheduling retry");
            self.add_after(key.clone(), delay);
        }
    }

    /// Release a key without scheduling a retry (cancelled attempt).
    pub async fn forget(&self, key: &ObjectKey) {
        let mut state = self.inner.state.lock().await;
        state.in_flight.remove(key);
        state.dirty.remove(key);
    }

    /// Stop handing out keys and wake every waiting worker.
    pub async fn shutdown(&self) {
        self.inner.state.lock().await.shut_down = true;
        self.inner.notify.notify_waiters();
    }

    /// Number of keys waiting to be handed out.
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    #[cfg(test)]
    pub(crate) async fn is_in_flight(&self, key: &ObjectKey) -> bool {
        self.inner.state.lock().await.in_flight.contains(key)
    }

    /// Consecutive failures recorded for a key.
    pub async fn failures(&self, key: &ObjectKey) -> u32 {
        self.inner
            .state
            .lock()
            .await
            .failures
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ReconcileError;

    fn fast_policy() -> QueuePolicy {
        QueuePolicy {
            requeue_delay: Duration::from_millis(10),
            backoff: BackoffPolicy {
                first_retry: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                jitter: 0.0,
            },
        }
    }

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("default", name)
    }

    async fn next_within(queue: &WorkQueue, ms: u64) -> Option<ObjectKey> {
        tokio::time::timeout(Duration::from_millis(ms), queue.next())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn test_duplicate_adds_collapse() {
        let queue = WorkQueue::new(fast_policy());
        queue.add(key("a")).await;
        queue.add(key("a")).await;
        queue.add(key("b")).await;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.next().await, Some(key("a")));
        assert_eq!(queue.next().await, Some(key("b")));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_in_flight_key_not_handed_out_twice() {
        let queue = WorkQueue::new(fast_policy());
        queue.add(key("a")).await;
        let taken = queue.next().await.unwrap();

        // Re-added while in flight: held back until done.
        queue.add(key("a")).await;
        assert!(queue.is_empty().await);
        assert_eq!(next_within(&queue, 30).await, None);

        queue.done(&taken, &Ok(Action::Done)).await;
        assert_eq!(next_within(&queue, 100).await, Some(key("a")));
    }

    #[tokio::test]
    async fn test_done_without_changes_is_not_requeued() {
        let queue = WorkQueue::new(fast_policy());
        queue.add(key("a")).await;
        let taken = queue.next().await.unwrap();
        queue.done(&taken, &Ok(Action::Done)).await;

        assert_eq!(next_within(&queue, 50).await, None);
    }

    #[tokio::test]
    async fn test_requeue_comes_back_after_delay() {
        let queue = WorkQueue::new(fast_policy());
        queue.add(key("child")).await;
        let taken = queue.next().await.unwrap();
        queue.done(&taken, &Ok(Action::Requeue)).await;

        assert!(queue.is_empty().await);
        assert_eq!(next_within(&queue, 500).await, Some(key("child")));
        assert_eq!(queue.failures(&key("child")).await, 0);
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_retried() {
        let queue = WorkQueue::new(fast_policy());
        queue.add(key("a")).await;

        for attempt in 1..=3 {
            let taken = next_within(&queue, 500).await.unwrap();
            let failed: ReconcileResult = Err(ReconcileError::adapter("API error: 503"));
            queue.done(&taken, &failed).await;
            assert_eq!(queue.failures(&key("a")).await, attempt);
        }

        let taken = next_within(&queue, 500).await.unwrap();
        queue.done(&taken, &Ok(Action::Done)).await;
        assert_eq!(queue.failures(&key("a")).await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let queue = WorkQueue::new(fast_policy());
        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.next().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.shutdown().await;

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, None);

        queue.add(key("late")).await;
        assert!(queue.is_empty().await);
    }
}
