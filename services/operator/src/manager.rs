//! Controller manager.
//!
//! Owns one work queue and one worker pool per reconciled kind, feeds the
//! queues from store notifications, and wakes project children when their
//! project changes.

use std::sync::Arc;

use lfo_reconcile::{Controller, ObjectKey, QueuePolicy, Runner, WorkQueue, DEFAULT_WORKERS};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::controllers::{
    ApiKeyController, Context, ModelController, ProjectController, PromptController,
    ScoreConfigController,
};
use crate::resources::{ApiKeySpec, Kind, PromptSpec, ScoreConfigSpec, Spec};
use crate::store::{document_key, StoreEvent};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Workers for kinds without a concurrency constraint.
    pub workers: usize,
    pub queue: QueuePolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue: QueuePolicy::default(),
        }
    }
}

/// Worker count for a kind.
///
/// API keys and prompts are reconciled one at a time so two records never
/// race to issue against the same project.
pub fn worker_count(kind: Kind, configured: usize) -> usize {
    match kind {
        Kind::ApiKey | Kind::Prompt => 1,
        _ => configured.max(1),
    }
}

#[derive(Clone)]
struct Queues {
    project: WorkQueue,
    api_key: WorkQueue,
    model: WorkQueue,
    prompt: WorkQueue,
    score_config: WorkQueue,
}

impl Queues {
    fn new(policy: &QueuePolicy) -> Self {
        Self {
            project: WorkQueue::new(policy.clone()),
            api_key: WorkQueue::new(policy.clone()),
            model: WorkQueue::new(policy.clone()),
            prompt: WorkQueue::new(policy.clone()),
            score_config: WorkQueue::new(policy.clone()),
        }
    }

    fn get(&self, kind: Kind) -> Option<&WorkQueue> {
        match kind {
            Kind::Project => Some(&self.project),
            Kind::ApiKey => Some(&self.api_key),
            Kind::Model => Some(&self.model),
            Kind::Prompt => Some(&self.prompt),
            Kind::ScoreConfig => Some(&self.score_config),
            Kind::Secret => None,
        }
    }
}

/// Runs every controller until shutdown.
pub struct ControllerManager {
    ctx: Context,
    config: ManagerConfig,
    queues: Queues,
}

impl ControllerManager {
    pub fn new(ctx: Context, config: ManagerConfig) -> Self {
        let queues = Queues::new(&config.queue);
        Self {
            ctx,
            config,
            queues,
        }
    }

    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(workers = self.config.workers, "Starting controller manager");

        // Subscribe before the initial listing so nothing slips between.
        let mut events = self.ctx.store.subscribe();

        let mut runners = JoinSet::new();
        self.spawn(&mut runners, ProjectController::new(&self.ctx), Kind::Project, &shutdown);
        self.spawn(&mut runners, ApiKeyController::new(&self.ctx), Kind::ApiKey, &shutdown);
        self.spawn(&mut runners, ModelController::new(&self.ctx), Kind::Model, &shutdown);
        self.spawn(&mut runners, PromptController::new(&self.ctx), Kind::Prompt, &shutdown);
        self.spawn(
            &mut runners,
            ScoreConfigController::new(&self.ctx),
            Kind::ScoreConfig,
            &shutdown,
        );

        self.resync().await;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.route(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Store notifications lagged, resyncing");
                        self.resync().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Store notification channel closed");
                        break;
                    }
                },
                result = shutdown.changed() => {
                    if result.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Controller manager stopping");
        while let Some(joined) = runners.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Controller runner panicked");
            }
        }
        info!("Controller manager stopped");
    }

    fn spawn<C: Controller>(
        &self,
        runners: &mut JoinSet<()>,
        controller: C,
        kind: Kind,
        shutdown: &watch::Receiver<bool>,
    ) {
        let Some(queue) = self.queues.get(kind) else {
            return;
        };
        let runner = Runner::new(
            Arc::new(controller),
            queue.clone(),
            worker_count(kind, self.config.workers),
        );
        runners.spawn(runner.run(shutdown.clone()));
    }

    /// Enqueue every record of every reconciled kind.
    async fn resync(&self) {
        for kind in Kind::RECONCILED {
            let Some(queue) = self.queues.get(kind) else {
                continue;
            };
            let documents = match self.ctx.store.list(kind, None).await {
                Ok(documents) => documents,
                Err(e) => {
                    error!(kind = %kind, error = %e, "Failed to list records");
                    continue;
                }
            };

            debug!(kind = %kind, count = documents.len(), "Resyncing records");
            for document in documents {
                match document_key(kind, &document) {
                    Ok(key) => queue.add(key).await,
                    Err(e) => warn!(kind = %kind, error = %e, "Skipping malformed record"),
                }
            }
        }
    }

    async fn route(&self, event: StoreEvent) {
        let Some(queue) = self.queues.get(event.kind) else {
            return;
        };
        debug!(kind = %event.kind, key = %event.key, change = ?event.change, "Enqueueing");
        queue.add(event.key.clone()).await;

        if event.kind == Kind::Project {
            self.enqueue_children::<ApiKeySpec>(&event.key).await;
            self.enqueue_children::<PromptSpec>(&event.key).await;
            self.enqueue_children::<ScoreConfigSpec>(&event.key).await;
        }
    }

    /// Wake the children of `project` so they re-check its readiness.
    async fn enqueue_children<S: Spec>(&self, project: &ObjectKey) {
        let kind = S::KIND;
        let Some(queue) = self.queues.get(kind) else {
            return;
        };
        let children = match self.ctx.records::<S>().list(Some(&project.namespace)).await {
            Ok(children) => children,
            Err(e) => {
                warn!(kind = %kind, project = %project, error = %e, "Failed to list children");
                return;
            }
        };

        for child in children {
            if child.spec.project_ref() == Some(project.name.as_str()) {
                queue.add(child.key()).await;
            }
        }
    }
}
