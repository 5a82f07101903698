//! The reconciliation driver.
//!
//! Every resource kind reconciles through the same five steps:
//!
//! 1. fetch the record (absent means done)
//! 2. idempotency gate (terminal records are left alone)
//! 3. dependency gate (unready parent means requeue)
//! 4. external call
//! 5. side-effect materialization and status commit
//!
//! A kind supplies these steps by implementing [`Controller`]; the driver
//! owns the ordering and the outcome mapping.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::condition::Lifecycle;
use crate::error::ReconcileError;
use crate::key::ObjectKey;

/// Successful reconciliation outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing more to do for this record.
    Done,

    /// Re-evaluate the record later; a dependency is not ready yet.
    Requeue,
}

/// Result of a reconciliation. `Err` is the `Fail` outcome.
pub type ReconcileResult = Result<Action, ReconcileError>;

/// Readiness of the record a child depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<P> {
    /// The dependency is usable; carries what the external call needs.
    Ready(P),

    /// The dependency exists but has not reached a usable state.
    Unready { parent: ObjectKey },
}

/// Capability set for one resource kind.
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    /// The stored record (spec + status).
    type Record: Send + Sync;

    /// What a satisfied dependency yields (`()` for root kinds).
    type Parent: Send + Sync;

    /// What the external call returns.
    type Created: Send + Sync;

    /// Kind name for logging.
    fn kind(&self) -> &'static str;

    /// Load the record; `Ok(None)` if it no longer exists.
    async fn fetch(&self, key: &ObjectKey) -> Result<Option<Self::Record>, ReconcileError>;

    /// Entry state read from the record's status.
    fn lifecycle(&self, record: &Self::Record) -> Lifecycle;

    /// Resolve the record's dependency.
    async fn resolve(
        &self,
        key: &ObjectKey,
        record: &Self::Record,
    ) -> Result<Readiness<Self::Parent>, ReconcileError>;

    /// Perform the side-effecting call against the external system.
    async fn call_external(
        &self,
        record: &Self::Record,
        parent: &Self::Parent,
    ) -> Result<Self::Created, ReconcileError>;

    /// Persist any objects derived from the call result.
    async fn materialize(
        &self,
        _key: &ObjectKey,
        _record: &Self::Record,
        _created: &Self::Created,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }

    /// Write the observed status for a successful reconciliation.
    async fn commit(
        &self,
        key: &ObjectKey,
        record: Self::Record,
        created: Self::Created,
    ) -> Result<(), ReconcileError>;

    /// Record a failed external call in status, if the kind tracks that.
    async fn record_failure(
        &self,
        _key: &ObjectKey,
        _record: Self::Record,
        _error: &ReconcileError,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}

/// Reconcile a single record end to end.
#[instrument(skip(controller, key), fields(kind = controller.kind(), key = %key))]
pub async fn reconcile<C>(controller: &C, key: &ObjectKey) -> ReconcileResult
where
    C: Controller + ?Sized,
{
    let Some(record) = controller.fetch(key).await? else {
        debug!("Record no longer exists");
        return Ok(Action::Done);
    };

    if controller.lifecycle(&record).is_terminal() {
        debug!("Record already synced");
        return Ok(Action::Done);
    }

    let parent = match controller.resolve(key, &record).await? {
        Readiness::Ready(parent) => parent,
        Readiness::Unready { parent } => {
            info!(parent = %parent, "Dependency not ready yet");
            return Ok(Action::Requeue);
        }
    };

    let created = match controller.call_external(&record, &parent).await {
        Ok(created) => created,
        Err(e) => {
            warn!(error = %e, "External call failed");
            controller.record_failure(key, record, &e).await?;
            return Err(e);
        }
    };

    controller.materialize(key, &record, &created).await?;
    controller.commit(key, record, created).await?;

    info!(lifecycle = Lifecycle::Synced.as_str(), "Record reconciled");
    Ok(Action::Done)
}

/// Lifecycle a record lands in after an attempt.
pub fn lifecycle_after(result: &ReconcileResult) -> Lifecycle {
    match result {
        Ok(Action::Done) => Lifecycle::Synced,
        Ok(Action::Requeue) => Lifecycle::Waiting,
        Err(_) => Lifecycle::Failed,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        parent: Option<String>,
        synced: bool,
    }

    /// In-memory controller with switchable failure points.
    #[derive(Default)]
    struct FakeController {
        items: Mutex<HashMap<ObjectKey, Item>>,
        ready_parents: Mutex<HashMap<String, String>>,
        calls: AtomicUsize,
        commits: AtomicUsize,
        failures_recorded: AtomicUsize,
        fail_call: bool,
        fail_commit: bool,
    }

    impl FakeController {
        async fn insert(&self, key: &ObjectKey, parent: Option<&str>, synced: bool) {
            self.items.lock().await.insert(
                key.clone(),
                Item {
                    parent: parent.map(str::to_string),
                    synced,
                },
            );
        }
    }

    #[async_trait]
    impl Controller for FakeController {
        type Record = Item;
        type Parent = Option<String>;
        type Created = String;

        fn kind(&self) -> &'static str {
            "Fake"
        }

        async fn fetch(&self, key: &ObjectKey) -> Result<Option<Item>, ReconcileError> {
            Ok(self.items.lock().await.get(key).cloned())
        }

        fn lifecycle(&self, record: &Item) -> Lifecycle {
            if record.synced {
                Lifecycle::Synced
            } else {
                Lifecycle::Unreconciled
            }
        }

        async fn resolve(
            &self,
            key: &ObjectKey,
            record: &Item,
        ) -> Result<Readiness<Option<String>>, ReconcileError> {
            let Some(parent) = &record.parent else {
                return Ok(Readiness::Ready(None));
            };
            match self.ready_parents.lock().await.get(parent) {
                Some(id) if !id.is_empty() => Ok(Readiness::Ready(Some(id.clone()))),
                Some(_) => Ok(Readiness::Unready {
                    parent: key.sibling(parent.clone()),
                }),
                None => Err(ReconcileError::DependencyMissing {
                    parent: key.sibling(parent.clone()),
                }),
            }
        }

        async fn call_external(
            &self,
            _record: &Item,
            parent: &Option<String>,
        ) -> Result<String, ReconcileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_call {
                return Err(ReconcileError::adapter("API error: 500"));
            }
            Ok(format!("created-under-{}", parent.clone().unwrap_or_default()))
        }

        async fn commit(
            &self,
            key: &ObjectKey,
            mut record: Item,
            _created: String,
        ) -> Result<(), ReconcileError> {
            if self.fail_commit {
                return Err(ReconcileError::persistence("status", "conflict"));
            }
            self.commits.fetch_add(1, Ordering::SeqCst);
            record.synced = true;
            self.items.lock().await.insert(key.clone(), record);
            Ok(())
        }

        async fn record_failure(
            &self,
            _key: &ObjectKey,
            _record: Item,
            _error: &ReconcileError,
        ) -> Result<(), ReconcileError> {
            self.failures_recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_record_is_done() {
        let controller = FakeController::default();
        let result = reconcile(&controller, &ObjectKey::new("default", "gone")).await;
        assert_eq!(result.unwrap(), Action::Done);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_reconcile_makes_no_call() {
        let controller = FakeController::default();
        let key = ObjectKey::new("default", "root");
        controller.insert(&key, None, false).await;

        assert_eq!(reconcile(&controller, &key).await.unwrap(), Action::Done);
        assert_eq!(reconcile(&controller, &key).await.unwrap(), Action::Done);

        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unready_parent_requeues_without_call() {
        let controller = FakeController::default();
        controller
            .ready_parents
            .lock()
            .await
            .insert("proj-a".to_string(), String::new());
        let key = ObjectKey::new("default", "child");
        controller.insert(&key, Some("proj-a"), false).await;

        let result = reconcile(&controller, &key).await;
        assert_eq!(lifecycle_after(&result), Lifecycle::Waiting);
        assert_eq!(result.unwrap(), Action::Requeue);
        assert_eq!(controller.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_parent_fails() {
        let controller = FakeController::default();
        let key = ObjectKey::new("default", "child");
        controller.insert(&key, Some("missing-proj"), false).await;

        let result = reconcile(&controller, &key).await;
        assert!(matches!(
            result,
            Err(ReconcileError::DependencyMissing { .. })
        ));
        assert_eq!(controller.calls.load(Ordering::SeqCst), 0);
        assert_eq!(controller.failures_recorded.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_call_failure_is_recorded_and_surfaced() {
        let controller = FakeController {
            fail_call: true,
            ..Default::default()
        };
        let key = ObjectKey::new("default", "root");
        controller.insert(&key, None, false).await;

        let result = reconcile(&controller, &key).await;
        assert_eq!(lifecycle_after(&result), Lifecycle::Failed);
        assert!(matches!(result, Err(ReconcileError::Adapter(_))));
        assert_eq!(controller.failures_recorded.load(Ordering::SeqCst), 1);
        assert_eq!(controller.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_failure_surfaces() {
        let controller = FakeController {
            fail_commit: true,
            ..Default::default()
        };
        let key = ObjectKey::new("default", "root");
        controller.insert(&key, None, false).await;

        let result = reconcile(&controller, &key).await;
        assert!(matches!(result, Err(ReconcileError::Persistence { .. })));
        assert_eq!(controller.calls.load(Ordering::SeqCst), 1);
    }
}
