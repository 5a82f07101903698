use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use lfo_langfuse::{LangfuseConfig, DEFAULT_BASE_URL};
use lfo_reconcile::{BackoffPolicy, QueuePolicy, DEFAULT_WORKERS};

#[derive(Debug, Clone)]
pub struct Config {
    pub langfuse: LangfuseConfig,
    pub log_level: String,
    pub manifest_dir: Option<PathBuf>,
    pub manifest_resync: Duration,
    pub workers: usize,
    pub queue: QueuePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let base_url = var("LANGFUSE_HOST").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let public_key = var("LANGFUSE_PUBLIC_KEY").context("LANGFUSE_PUBLIC_KEY must be set")?;
        let secret_key = var("LANGFUSE_SECRET_KEY").context("LANGFUSE_SECRET_KEY must be set")?;

        let timeout_secs = parse_nonzero(&var, "LFO_HTTP_TIMEOUT_SECS", 30)?;
        let mut langfuse = LangfuseConfig::new(base_url, public_key, secret_key);
        langfuse.timeout = Duration::from_secs(timeout_secs);

        let log_level = var("LFO_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let manifest_dir = var("LFO_MANIFEST_DIR").map(PathBuf::from);
        let resync_secs = parse_nonzero(&var, "LFO_MANIFEST_RESYNC_SECS", 30)?;
        let workers = parse(&var, "LFO_WORKERS", DEFAULT_WORKERS)?.max(1);

        let requeue_ms = parse_nonzero(&var, "LFO_REQUEUE_DELAY_MS", 1000)?;
        let backoff_base_ms = parse_nonzero(&var, "LFO_BACKOFF_BASE_MS", 100)?;
        let backoff_max_secs = parse(&var, "LFO_BACKOFF_MAX_SECS", 30)?;
        let queue = QueuePolicy {
            requeue_delay: Duration::from_millis(requeue_ms),
            backoff: BackoffPolicy {
                first_retry: Duration::from_millis(backoff_base_ms),
                max_delay: Duration::from_secs(backoff_max_secs),
                ..BackoffPolicy::default()
            },
        };

        Ok(Self {
            langfuse,
            log_level,
            manifest_dir,
            manifest_resync: Duration::from_secs(resync_secs),
            workers,
            queue,
        })
    }
}

fn parse<T, F>(var: &F, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        None => Ok(default),
    }
}

/// Durations and intervals: zero would panic a ticker or spin a requeue.
fn parse_nonzero<F>(var: &F, name: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse(var, name, default)?;
    anyhow::ensure!(value > 0, "invalid value for {name}: must be greater than zero");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("LANGFUSE_PUBLIC_KEY", "pk-lf-1"),
            ("LANGFUSE_SECRET_KEY", "sk-lf-1"),
        ]))
        .unwrap();

        assert_eq!(config.langfuse.base_url, "https://cloud.langfuse.com");
        assert_eq!(config.langfuse.timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
        assert!(config.manifest_dir.is_none());
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.queue.requeue_delay, Duration::from_secs(1));
        assert_eq!(config.queue.backoff.first_retry, Duration::from_millis(100));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("LANGFUSE_HOST", "https://langfuse.internal/"),
            ("LANGFUSE_PUBLIC_KEY", "pk"),
            ("LANGFUSE_SECRET_KEY", "sk"),
            ("LFO_MANIFEST_DIR", "/etc/langfuse"),
            ("LFO_WORKERS", "0"),
            ("LFO_REQUEUE_DELAY_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.langfuse.base_url, "https://langfuse.internal");
        assert_eq!(config.manifest_dir, Some(PathBuf::from("/etc/langfuse")));
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue.requeue_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_credentials() {
        let err = Config::from_lookup(lookup(&[("LANGFUSE_PUBLIC_KEY", "pk")])).unwrap_err();
        assert!(err.to_string().contains("LANGFUSE_SECRET_KEY"));
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup(&[
            ("LANGFUSE_PUBLIC_KEY", "pk"),
            ("LANGFUSE_SECRET_KEY", "sk"),
            ("LFO_WORKERS", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LFO_WORKERS"));
    }

    #[rstest]
    #[case("LFO_HTTP_TIMEOUT_SECS")]
    #[case("LFO_MANIFEST_RESYNC_SECS")]
    #[case("LFO_REQUEUE_DELAY_MS")]
    #[case("LFO_BACKOFF_BASE_MS")]
    fn test_zero_interval_rejected(#[case] name: &str) {
        let err = Config::from_lookup(lookup(&[
            ("LANGFUSE_PUBLIC_KEY", "pk"),
            ("LANGFUSE_SECRET_KEY", "sk"),
            (name, "0"),
        ]))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains(name), "{message}");
        assert!(message.contains("greater than zero"), "{message}");
    }
}
