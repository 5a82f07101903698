//! Bounded worker pool driving one controller from its work queue.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::{lifecycle_after, reconcile, Action, Controller};
use crate::queue::WorkQueue;

/// Runs `workers` concurrent reconcilers for a single kind.
pub struct Runner<C: Controller> {
    controller: Arc<C>,
    queue: WorkQueue,
    workers: usize,
}

impl<C: Controller> Runner<C> {
    pub fn new(controller: Arc<C>, queue: WorkQueue, workers: usize) -> Self {
        Self {
            controller,
            queue,
            workers: workers.max(1),
        }
    }

    /// Run until shutdown is signaled, then wait for workers to exit.
    #[instrument(skip_all, fields(kind = self.controller.kind(), workers = self.workers))]
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!("Starting controller workers");

        let mut tasks = JoinSet::new();
        for worker_id in 0..self.workers {
            tasks.spawn(run_worker(
                worker_id,
                Arc::clone(&self.controller),
                self.queue.clone(),
                shutdown.clone(),
            ));
        }

        let mut shutdown = shutdown;
        wait_for_shutdown(&mut shutdown).await;
        self.queue.shutdown().await;

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Controller worker panicked");
            }
        }

        info!("Controller workers stopped");
    }
}

async fn run_worker<C: Controller>(
    worker_id: usize,
    controller: Arc<C>,
    queue: WorkQueue,
    mut shutdown: watch::Receiver<bool>,
) {
    let kind = controller.kind();
    debug!(kind, worker_id, "Worker started");

    while let Some(key) = queue.next().await {
        // Dropping the reconcile future on shutdown abandons the attempt
        // before anything further is written.
        let result = tokio::select! {
            result = reconcile(controller.as_ref(), &key) => result,
            _ = wait_for_shutdown(&mut shutdown) => {
                info!(kind, key = %key, "Reconciliation cancelled by shutdown");
                queue.forget(&key).await;
                break;
            }
        };

        match &result {
            Ok(Action::Done) => {}
            Ok(Action::Requeue) => {
                debug!(kind, key = %key, "Requeueing until dependency is ready");
            }
            Err(e) => {
                warn!(
                    kind,
                    key = %key,
                    category = e.category(),
                    lifecycle = lifecycle_after(&result).as_str(),
                    error = %e,
                    "Reconciliation failed, will retry"
                );
            }
        }

        queue.done(&key, &result).await;
    }

    debug!(kind, worker_id, "Worker stopped");
}

/// Resolves once shutdown is signaled or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
