//! Built-in task handlers.
//!
//! The three administrative tasks every node understands: open the door
//! now, schedule a deferred task, cancel a scheduled task. Handlers
//! own exactly the collaborators they act on and translate their own
//! faults into statuses -- the dispatcher never sees an error from
//! them.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::authority::MainNode;
use crate::error::Error;
use crate::node::gate::Gate;
use crate::store::TaskStorage;
use crate::tasker::TaskHandler;
use crate::types::{DeferredTask, Task, TaskParams, TaskResult, TaskStatus};

fn parse_params<T: for<'de> Deserialize<'de>>(params: TaskParams) -> Result<T, Error> {
    serde_json::from_value(Value::Object(params)).map_err(Error::from)
}

/// Opens the door immediately, running the full grant sequence with an
/// empty name line. Parameters: none.
pub struct OpenDoorHandler {
    gate: Arc<Gate>,
}

impl OpenDoorHandler {
    /// Creates the handler over the shared actuation gate.
    pub fn new(gate: Arc<Gate>) -> Self {
        Self { gate }
    }
}

#[async_trait]
impl TaskHandler for OpenDoorHandler {
    async fn handle(&self, _params: TaskParams) -> TaskStatus {
        self.gate.admit("").await;
        TaskStatus::Done
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleParams {
    task: Task,
    after: DateTime<Utc>,
    before: DateTime<Utc>,
}

/// Persists a deferred task.
///
/// Parameters: `{task: {id, type, params}, after, before}` with RFC
/// 3339 timestamps. A malformed payload, an inverted window, or a
/// duplicate task id is the sender's mistake (`ParametersError`); a
/// storage fault is ours (`PerformingError`).
pub struct ScheduleTaskHandler {
    storage: Arc<dyn TaskStorage>,
}

impl ScheduleTaskHandler {
    /// Creates the handler over the task store.
    pub fn new(storage: Arc<dyn TaskStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TaskHandler for ScheduleTaskHandler {
    async fn handle(&self, params: TaskParams) -> TaskStatus {
        let parsed: ScheduleParams = match parse_params(params) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "malformed SCHEDULE_TASK parameters");
                return TaskStatus::ParametersError;
            }
        };
        let deferred = match DeferredTask::new(parsed.task, parsed.after, parsed.before) {
            Ok(deferred) => deferred,
            Err(e) => {
                tracing::warn!(error = %e, "rejected deferred task");
                return TaskStatus::ParametersError;
            }
        };
        match self.storage.add(deferred).await {
            Ok(()) => TaskStatus::Done,
            Err(Error::DuplicateTask { task_id }) => {
                tracing::warn!(task_id, "deferred task already scheduled");
                TaskStatus::ParametersError
            }
            Err(e) => {
                tracing::error!(error = %e, "could not persist deferred task");
                TaskStatus::PerformingError
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CancelParams {
    task_id: i64,
}

/// Removes a scheduled deferred task and reports a `CANCELLED` result
/// for it. Parameters: `{task_id}`. Cancelling an absent id succeeds.
pub struct CancelTaskHandler {
    storage: Arc<dyn TaskStorage>,
    authority: Arc<dyn MainNode>,
}

impl CancelTaskHandler {
    /// Creates the handler over the task store and the authority the
    /// cancellation is acknowledged to.
    pub fn new(storage: Arc<dyn TaskStorage>, authority: Arc<dyn MainNode>) -> Self {
        Self { storage, authority }
    }
}

#[async_trait]
impl TaskHandler for CancelTaskHandler {
    async fn handle(&self, params: TaskParams) -> TaskStatus {
        let parsed: CancelParams = match parse_params(params) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "malformed CANCEL_TASK parameters");
                return TaskStatus::ParametersError;
            }
        };
        if let Err(e) = self.storage.delete(parsed.task_id).await {
            tracing::error!(error = %e, task_id = parsed.task_id, "could not cancel task");
            return TaskStatus::PerformingError;
        }
        tracing::info!(task_id = parsed.task_id, "deferred task cancelled");

        // The cancelled task will never produce its own result, so the
        // authority learns its fate here. Best-effort, like every
        // result report.
        let acknowledgement = TaskResult::new(parsed.task_id, TaskStatus::Cancelled);
        if let Err(e) = self.authority.report_task_result(&acknowledgement).await {
            tracing::warn!(error = %e, task_id = parsed.task_id, "cancellation report failed");
        }
        TaskStatus::Done
    }
}
