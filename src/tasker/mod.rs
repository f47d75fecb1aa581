//! Task dispatcher: maps task types to handlers and drives the task
//! store for scheduling, cancellation, and harvesting.
//!
//! # Totality
//!
//! [`Tasker::perform`] never fails. Handlers are required to convert
//! their own faults into a [`TaskStatus`]; as defense in depth against
//! handler bugs, the dispatcher additionally runs each handler on a
//! spawned task and maps a panic to
//! [`TaskStatus::PerformingError`]. An unregistered task type yields
//! [`TaskStatus::NoSuitableHandlerError`] without invoking anything.
//!
//! # Validity
//!
//! [`Tasker::perform_suitable_tasks`] captures "now" once, harvests the
//! store, and silently drops tasks whose window already elapsed -- they
//! produce no result at all, per the deferred-task validity rule.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::Result;
use crate::store::TaskStorage;
use crate::types::{DeferredTask, Task, TaskParams, TaskResult, TaskStatus, TaskType};

/// Executes one kind of task.
///
/// Handlers must not panic: any internal fault is to be translated into
/// [`TaskStatus::PerformingError`] or [`TaskStatus::ParametersError`]
/// by the handler itself. The dispatcher still guards against contract
/// violations (see module docs).
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Runs the task with its opaque parameters and reports the outcome.
    async fn handle(&self, params: TaskParams) -> TaskStatus;
}

/// Task dispatcher over a handler table and a [`TaskStorage`].
///
/// Handlers are registered once at startup; re-registration overwrites.
pub struct Tasker {
    storage: Arc<dyn TaskStorage>,
    handlers: RwLock<HashMap<TaskType, Arc<dyn TaskHandler>>>,
}

impl Tasker {
    /// Creates a dispatcher over the given store, with no handlers yet.
    pub fn new(storage: Arc<dyn TaskStorage>) -> Self {
        Self {
            storage,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying task store. Built-in handlers that schedule or
    /// cancel tasks are constructed from this.
    pub fn storage(&self) -> Arc<dyn TaskStorage> {
        Arc::clone(&self.storage)
    }

    /// Registers (or replaces) the handler for a task type.
    pub fn register(&self, kind: TaskType, handler: Arc<dyn TaskHandler>) {
        self.handlers.write().insert(kind, handler);
    }

    /// Declared task types that currently have no handler. The
    /// controller logs a startup warning for each.
    pub fn missing_handlers(&self) -> Vec<TaskType> {
        let handlers = self.handlers.read();
        TaskType::ALL
            .into_iter()
            .filter(|kind| !handlers.contains_key(kind))
            .collect()
    }

    /// Executes a task with its registered handler and wraps the
    /// produced status with the task id. Never fails.
    pub async fn perform(&self, task: &Task) -> TaskResult {
        let handler = self.handlers.read().get(&task.kind).cloned();
        let Some(handler) = handler else {
            tracing::error!(%task, "no handler registered for task type");
            return TaskResult::new(task.id, TaskStatus::NoSuitableHandlerError);
        };

        let params = task.params.clone();
        let outcome = tokio::spawn(async move { handler.handle(params).await }).await;
        let status = match outcome {
            Ok(status) => status,
            Err(join_err) => {
                tracing::error!(%task, error = %join_err, "task handler violated its contract");
                TaskStatus::PerformingError
            }
        };
        if status == TaskStatus::Done {
            tracing::info!(%task, "task performed");
        }
        TaskResult::new(task.id, status)
    }

    /// Persists a deferred task for later execution.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::DuplicateTask`](crate::Error::DuplicateTask)
    /// from the store -- re-scheduling an existing id is the caller's
    /// mistake to observe, not to have swallowed.
    pub async fn schedule_task(&self, task: DeferredTask) -> Result<()> {
        self.storage.add(task.clone()).await?;
        tracing::info!(%task, "deferred task scheduled");
        Ok(())
    }

    /// Cancels a deferred task by id. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) on backend
    /// failures only; an absent id is not an error.
    pub async fn cancel_task(&self, task_id: i64) -> Result<()> {
        self.storage.delete(task_id).await?;
        tracing::info!(task_id, "deferred task cancelled");
        Ok(())
    }

    /// Harvests every due deferred task and performs the still-valid
    /// ones, returning their results in harvest order. Tasks whose
    /// window elapsed are dropped without a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) if the harvest
    /// itself fails; execution outcomes are statuses, not errors.
    pub async fn perform_suitable_tasks(&self) -> Result<Vec<TaskResult>> {
        let now = Utc::now();
        let harvested = self.storage.take_suitable_tasks(now).await?;

        let mut results = Vec::with_capacity(harvested.len());
        for task in harvested {
            if !task.is_valid(now) {
                tracing::warn!(%task, "activation window elapsed, dropping");
                continue;
            }
            results.push(self.perform(&task.task).await);
        }
        Ok(results)
    }
}
