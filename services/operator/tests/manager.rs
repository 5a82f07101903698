//! End-to-end tests for the controller manager.
//!
//! Records are written to a `MemoryStore` while the manager runs; the tests
//! poll until the controllers converge, then shut the manager down.

use std::sync::Arc;
use std::time::Duration;

use lfo_langfuse::{Call, MockLangfuse};
use lfo_operator::controllers::Context;
use lfo_operator::manager::{ControllerManager, ManagerConfig};
use lfo_operator::manifests::load_dir;
use lfo_operator::resources::{
    ApiKeySpec, Kind, Object, ProjectSpec, ProjectState, PromptSpec, ResourceStatus, SecretSpec,
    Spec,
};
use lfo_operator::store::{MemoryStore, Records};
use lfo_reconcile::{is_available, BackoffPolicy, ObjectKey, QueuePolicy};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const CONVERGE_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    store: Arc<MemoryStore>,
    langfuse: Arc<MockLangfuse>,
    ctx: Context,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Running {
    fn start(langfuse: MockLangfuse) -> Self {
        let store = Arc::new(MemoryStore::new());
        let langfuse = Arc::new(langfuse);
        let ctx = Context::new(store.clone(), langfuse.clone());

        let config = ManagerConfig {
            workers: 2,
            queue: QueuePolicy {
                requeue_delay: Duration::from_millis(20),
                backoff: BackoffPolicy {
                    first_retry: Duration::from_millis(10),
                    max_delay: Duration::from_millis(50),
                    jitter: 0.0,
                },
            },
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let manager = ControllerManager::new(ctx.clone(), config);
        let handle = tokio::spawn(manager.run(shutdown_rx));

        Self {
            store,
            langfuse,
            ctx,
            shutdown_tx,
            handle,
        }
    }

    async fn add<S: Spec>(&self, name: &str, spec: S) -> ObjectKey {
        let key = ObjectKey::new("default", name);
        self.ctx
            .records::<S>()
            .create(&Object::new(&key, spec))
            .await
            .unwrap();
        key
    }

    async fn wait_available<S>(&self, key: &ObjectKey)
    where
        S: Spec<Status = ResourceStatus>,
    {
        let records: Records<S> = self.ctx.records();
        let waited = tokio::time::timeout(CONVERGE_TIMEOUT, async {
            loop {
                if let Some(record) = records.get(key).await.unwrap() {
                    if is_available(&record.status.conditions) {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "{} {key} never became available", S::KIND);
    }

    async fn wait_project_ready(&self, key: &ObjectKey) {
        let projects: Records<ProjectSpec> = self.ctx.records();
        let waited = tokio::time::timeout(CONVERGE_TIMEOUT, async {
            loop {
                if let Some(project) = projects.get(key).await.unwrap() {
                    if project.status.state == ProjectState::Ready {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "project {key} never became ready");
    }

    async fn stop(self) {
        self.shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("manager did not stop in time")
            .unwrap();
    }
}

fn api_key(project: &str) -> ApiKeySpec {
    ApiKeySpec {
        project_ref: project.to_string(),
        name: "ci".to_string(),
        secret_name: "sec-a".to_string(),
    }
}

fn prompt(project: &str) -> PromptSpec {
    PromptSpec {
        project_ref: project.to_string(),
        name: "greeting".to_string(),
        prompt: "Hello {{name}}".to_string(),
        kind: "text".to_string(),
        config: Default::default(),
        labels: vec!["production".to_string()],
    }
}

#[tokio::test]
async fn test_children_created_before_project_converge() {
    let running = Running::start(MockLangfuse::new());

    let key_a = running.add("key-a", api_key("proj-a")).await;
    let greeting = running.add("greeting", prompt("proj-a")).await;

    // Children wait on a project that does not exist yet.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.langfuse.call_count(), 0);

    let project = running
        .add(
            "proj-a",
            ProjectSpec {
                name: "proj-a".to_string(),
            },
        )
        .await;

    running.wait_project_ready(&project).await;
    running.wait_available::<ApiKeySpec>(&key_a).await;
    running.wait_available::<PromptSpec>(&greeting).await;

    let calls = running.langfuse.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::CreateProject { .. }));

    let secret = running
        .ctx
        .records::<SecretSpec>()
        .get(&ObjectKey::new("default", "sec-a"))
        .await
        .unwrap();
    assert!(secret.is_some());

    running.stop().await;
}

#[tokio::test]
async fn test_adapter_outage_recovers() {
    let running = Running::start(MockLangfuse::failing("503 Service Unavailable", "down"));

    let project = running
        .add(
            "proj-a",
            ProjectSpec {
                name: "proj-a".to_string(),
            },
        )
        .await;

    let projects: Records<ProjectSpec> = running.ctx.records();
    let errored = tokio::time::timeout(CONVERGE_TIMEOUT, async {
        loop {
            let current = projects.get(&project).await.unwrap().unwrap();
            if current.status.state == ProjectState::Error {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(errored.is_ok(), "project never recorded the failure");

    running.langfuse.recover();
    running.wait_project_ready(&project).await;

    let ready = projects.get(&project).await.unwrap().unwrap();
    assert!(!ready.status.id.is_empty());

    running.stop().await;
}

#[tokio::test]
async fn test_manifest_directory_reconciles() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("project.toml"),
        "kind = \"LangfuseProject\"\n[metadata]\nname = \"proj-a\"\n[spec]\nname = \"proj-a\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("model.json"),
        r#"{"kind": "LangfuseModel", "metadata": {"name": "gpt-x"},
            "spec": {"modelName": "gpt-x", "matchPattern": "gpt-x", "unit": "TOKENS", "inputPrice": "0.5"}}"#,
    )
    .unwrap();

    let running = Running::start(MockLangfuse::new());
    let summary = load_dir(running.store.as_ref(), dir.path()).await.unwrap();
    assert_eq!(summary.applied, 2);

    running
        .wait_project_ready(&ObjectKey::new("default", "proj-a"))
        .await;
    running
        .wait_available::<lfo_operator::resources::ModelSpec>(&ObjectKey::new("default", "gpt-x"))
        .await;

    // Rescanning an unchanged directory triggers no new calls.
    load_dir(running.store.as_ref(), dir.path()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.langfuse.call_count(), 2);
    assert_eq!(running.store.count(Kind::Project).await, 1);

    running.stop().await;
}
