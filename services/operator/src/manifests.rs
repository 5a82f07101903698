//! Loads declarative records from a directory of manifest files.
//!
//! Each `*.json` or `*.toml` file holds one record:
//!
//! ```toml
//! kind = "LangfuseProject"
//!
//! [metadata]
//! name = "proj-a"
//! namespace = "team-a"   # optional, defaults to "default"
//!
//! [spec]
//! name = "Project A"
//! ```
//!
//! Files are applied with [`RecordStore::apply_spec`], so rescanning an
//! unchanged directory is a no-op and status is never overwritten.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lfo_reconcile::{ObjectKey, DEFAULT_NAMESPACE};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::resources::{
    ApiKeySpec, Kind, ModelSpec, Object, ProjectSpec, PromptSpec, ScoreConfigSpec, Spec,
};
use crate::store::{Document, RecordStore, StoreError};

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid manifest.
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The manifest names a kind that cannot be declared.
    #[error("{}: unsupported kind {kind:?}", path.display())]
    UnsupportedKind { path: PathBuf, kind: String },

    /// The record could not be written.
    #[error("failed to apply {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    kind: String,
    metadata: ManifestMeta,
    spec: Value,
}

#[derive(Debug, Deserialize)]
struct ManifestMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

/// A parsed manifest, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedManifest {
    pub kind: Kind,
    pub key: ObjectKey,
    pub document: Document,
}

/// Outcome of one directory scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub applied: usize,
    pub skipped: usize,
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("toml")
    )
}

/// Parse one manifest file's contents. The format follows the extension.
pub fn parse_manifest(path: &Path, contents: &str) -> Result<ParsedManifest, ManifestError> {
    let parse_err = |message: String| ManifestError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let manifest: Manifest = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(contents).map_err(|e| parse_err(e.to_string()))?,
        _ => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string()))?,
    };

    let unsupported = || ManifestError::UnsupportedKind {
        path: path.to_path_buf(),
        kind: manifest.kind.clone(),
    };
    let kind = manifest.kind.parse::<Kind>().map_err(|_| unsupported())?;

    if manifest.metadata.name.is_empty() {
        return Err(parse_err("metadata.name is empty".to_string()));
    }
    let namespace = manifest
        .metadata
        .namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let key = ObjectKey::new(namespace, manifest.metadata.name);

    let document = match kind {
        Kind::Project => typed_document::<ProjectSpec>(&key, manifest.spec),
        Kind::ApiKey => typed_document::<ApiKeySpec>(&key, manifest.spec),
        Kind::Model => typed_document::<ModelSpec>(&key, manifest.spec),
        Kind::Prompt => typed_document::<PromptSpec>(&key, manifest.spec),
        Kind::ScoreConfig => typed_document::<ScoreConfigSpec>(&key, manifest.spec),
        // Credential secrets are only ever written by the operator.
        Kind::Secret => return Err(unsupported()),
    }
    .map_err(|e| parse_err(format!("invalid {kind} spec: {e}")))?;

    Ok(ParsedManifest {
        kind,
        key,
        document,
    })
}

/// Check the spec against its kind's schema and build the stored document.
fn typed_document<S: Spec>(key: &ObjectKey, spec: Value) -> Result<Document, serde_json::Error> {
    let spec: S = serde_json::from_value(spec)?;
    serde_json::to_value(Object::new(key, spec))
}

/// Apply every manifest in `dir`. Bad files are logged and skipped; only a
/// directory that cannot be listed is an error.
pub async fn load_dir(store: &dyn RecordStore, dir: &Path) -> Result<LoadSummary, ManifestError> {
    let io_err = |source| ManifestError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if is_manifest(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summary = LoadSummary::default();
    for path in paths {
        match apply_file(store, &path).await {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                warn!(error = %e, "Skipping manifest");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

async fn apply_file(store: &dyn RecordStore, path: &Path) -> Result<(), ManifestError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let parsed = parse_manifest(path, &contents)?;
    store
        .apply_spec(parsed.kind, parsed.document)
        .await
        .map_err(|source| ManifestError::Store {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(kind = %parsed.kind, key = %parsed.key, path = %path.display(), "Applied manifest");
    Ok(())
}

/// Shortest rescan interval a loader will run with.
pub const MIN_RESYNC_INTERVAL: Duration = Duration::from_millis(100);

/// Periodically re-applies a manifest directory.
pub struct ManifestLoader {
    store: Arc<dyn RecordStore>,
    dir: PathBuf,
    interval: Duration,
}

impl ManifestLoader {
    /// `interval` is raised to [`MIN_RESYNC_INTERVAL`] if shorter.
    pub fn new(store: Arc<dyn RecordStore>, dir: PathBuf, interval: Duration) -> Self {
        Self {
            store,
            dir,
            interval: interval.max(MIN_RESYNC_INTERVAL),
        }
    }

    /// Scan immediately, then every interval until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            dir = %self.dir.display(),
            interval_secs = self.interval.as_secs(),
            "Starting manifest loader"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match load_dir(self.store.as_ref(), &self.dir).await {
                        Ok(summary) => debug!(
                            applied = summary.applied,
                            skipped = summary.skipped,
                            "Manifest scan complete"
                        ),
                        Err(e) => warn!(error = %e, "Manifest scan failed"),
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Manifest loader shutting down");
                        break;
                    }
                }
            }
        }
    }
}
