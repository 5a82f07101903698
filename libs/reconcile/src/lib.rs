//! Reconciliation engine primitives.
//!
//! This library provides the pieces every resource controller is built from:
//!
//! - **Controller**: the capability set a resource kind supplies
//!   (fetch, lifecycle, dependency resolution, external call, status commit).
//! - **reconcile**: the single driver that sequences those capabilities.
//! - **WorkQueue** and **Runner**: the scheduler that feeds keys to a
//!   bounded pool of workers and retries failures with backoff.
//!
//! # Invariants
//!
//! - A record whose status carries a truthy `Available` condition is never
//!   sent to the external system again
//! - A child is never sent to the external system while its parent is unready
//! - At most one reconciliation per key is in flight
//! - Failures are retried indefinitely; there is no terminal failure state

pub mod backoff;
pub mod condition;
pub mod engine;
pub mod error;
pub mod key;
pub mod queue;
pub mod runner;

use std::time::Duration;

pub use backoff::BackoffPolicy;
pub use condition::{is_available, Condition, ConditionStatus, Lifecycle, AVAILABLE};
pub use engine::{lifecycle_after, reconcile, Action, Controller, Readiness, ReconcileResult};
pub use error::{BoxError, ReconcileError};
pub use key::{ObjectKey, DEFAULT_NAMESPACE};
pub use queue::{QueuePolicy, WorkQueue};
pub use runner::Runner;

/// Default delay before a record waiting on its parent is looked at again.
pub const DEFAULT_REQUEUE_DELAY: Duration = Duration::from_secs(1);

/// Default worker count for kinds without a concurrency constraint.
pub const DEFAULT_WORKERS: usize = 4;
