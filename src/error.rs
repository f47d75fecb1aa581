//! Crate error type and `Result` alias.
//!
//! One enum covers the node's error taxonomy: storage faults (with
//! [`Error::DuplicateTask`] split out because `schedule_task` propagates
//! it to callers), authority transport and authorization failures, and
//! per-iteration capability failures (camera, recognition). Task-semantic
//! outcomes are **not** errors -- they are [`TaskStatus`](crate::types::TaskStatus)
//! values produced by the dispatcher, which never fails.

use thiserror::Error;

/// Errors produced by gatenode components.
#[derive(Debug, Error)]
pub enum Error {
    /// A deferred task with this id is already persisted. Propagated to
    /// the caller of `schedule_task`, never swallowed.
    #[error("deferred task {task_id} is already scheduled")]
    DuplicateTask {
        /// Id of the task that was re-added.
        task_id: i64,
    },

    /// Task storage failure (database or record decoding).
    #[error("task storage failure: {0}")]
    Storage(String),

    /// The authority rejected the session even after re-authentication.
    #[error("authority rejected the session token")]
    Unauthorized,

    /// Transport-level failure talking to the authority.
    #[error("authority transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The camera could not produce a frame.
    #[error("camera failure: {0}")]
    Camera(String),

    /// Face detection, normalization, or descriptor extraction failed.
    #[error("recognition failure: {0}")]
    Recognition(String),

    /// Malformed task parameters. Surfaces as a `ParametersError` status
    /// at the dispatcher boundary.
    #[error("invalid task parameters: {0}")]
    InvalidParams(String),

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// JSON encoding or decoding failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
