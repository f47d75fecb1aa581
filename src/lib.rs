//! Unattended access-control room node.
//!
//! A gatenode polls a camera, matches a visitor's biometric descriptor
//! against a cached identity set, decides whether to unlock a door, and
//! executes deferred or immediate administrative tasks received from a
//! remote authority (the main node).
//!
//! # Overview
//!
//! The node runs one cooperative control loop with two independent
//! cadences: a fast access-check timer that drives the camera ->
//! descriptor -> verdict -> door pipeline, and a slower task timer that
//! drains pending tasks from the authority and harvests due deferred
//! tasks from the persisted store. A fault in either tick is logged and
//! isolated; the loop never terminates on a single failure.
//!
//! # Module Organization
//!
//! - [`types`] - Task and access-control entities (tasks, results,
//!   descriptors, users, visits)
//! - [`store`] - Deferred-task storage: trait plus SQLite and in-memory
//!   backends with atomic harvest semantics
//! - [`tasker`] - Task dispatcher mapping task types to handlers
//! - [`recognition`] - Face detection/normalization/recognition
//!   capability traits and the descriptor matcher
//! - [`hardware`] - Door, display, and camera capability traits plus
//!   simulated devices
//! - [`authority`] - Remote-authority session trait and HTTP client
//! - [`node`] - The room-node controller, actuation gate, and access
//!   decision engine
//! - [`config`] - Node configuration with TOML loading
//! - [`error`] - Crate error type with a `Result` alias

pub mod authority;
pub mod config;
pub mod constants;
pub mod error;
pub mod hardware;
pub mod node;
pub mod recognition;
pub mod store;
pub mod tasker;
pub mod types;

// Re-exports for ergonomic access
pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::RoomNode;
pub use types::{
    AccessCheck, DeferredTask, Descriptor, Task, TaskParams, TaskResult, TaskStatus, TaskType,
    User, Visit,
};
