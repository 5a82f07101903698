//! Langfuse operator.
//!
//! Keeps Langfuse projects and their children (API keys, prompts, score
//! configs) plus global model definitions in sync with declarative records.
//!
//! ## Modules
//!
//! - `resources`: record types for each kind and the credential secret
//! - `store`: record storage with change notifications
//! - `resolver`: project readiness for child kinds
//! - `controllers`: one reconciliation controller per kind
//! - `manager`: queues, worker pools and event routing
//! - `manifests`: declarative records loaded from disk

pub mod config;
pub mod controllers;
pub mod manager;
pub mod manifests;
pub mod resolver;
pub mod resources;
pub mod store;
