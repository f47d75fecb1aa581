//! Task entities: immediate tasks, deferred tasks, and execution results.
//!
//! A [`Task`] is an instruction from the remote authority, identified by
//! an authority-assigned id and carrying opaque parameters that only the
//! matching handler interprets. A [`DeferredTask`] binds a task to an
//! activation window `[after, before]` and lives in the task store until
//! harvested or cancelled. A [`TaskResult`] pairs a task id with the
//! [`TaskStatus`] its execution produced.
//!
//! # Serialization
//!
//! Enum variants use the authority's `SCREAMING_SNAKE_CASE` wire
//! spelling (`OPEN_DOOR`, `PERFORMING_ERROR`, ...). `DeferredTask`
//! flattens its inner task, so the persisted shape is
//! `{id, type, params, after, before}`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Opaque task parameters: a key-value mapping interpreted only by the
/// handler registered for the task's type.
pub type TaskParams = serde_json::Map<String, Value>;

/// Kinds of tasks the node can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Open the door immediately.
    OpenDoor,
    /// Persist a deferred task for later execution.
    ScheduleTask,
    /// Remove a previously scheduled deferred task.
    CancelTask,
}

impl TaskType {
    /// Every declared task type. Used by the controller's startup
    /// exhaustiveness check to warn about types with no handler.
    pub const ALL: [TaskType; 3] = [Self::OpenDoor, Self::ScheduleTask, Self::CancelTask];

    /// Wire spelling of this type.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatenode::types::TaskType;
    ///
    /// assert_eq!(TaskType::OpenDoor.as_str(), "OPEN_DOOR");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenDoor => "OPEN_DOOR",
            Self::ScheduleTask => "SCHEDULE_TASK",
            Self::CancelTask => "CANCEL_TASK",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN_DOOR" => Ok(Self::OpenDoor),
            "SCHEDULE_TASK" => Ok(Self::ScheduleTask),
            "CANCEL_TASK" => Ok(Self::CancelTask),
            other => Err(Error::InvalidParams(format!("unknown task type: {other}"))),
        }
    }
}

/// Outcome of one task execution.
///
/// Produced exactly once per executed task. The error variants are
/// statuses, not crate errors -- the dispatcher is total and reports
/// faults upstream through these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The handler ran to completion.
    Done,
    /// The task was cancelled before execution.
    Cancelled,
    /// The handler failed while executing.
    PerformingError,
    /// The task's parameters were malformed for its handler.
    ParametersError,
    /// No handler is registered for the task's type.
    NoSuitableHandlerError,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
            Self::PerformingError => "PERFORMING_ERROR",
            Self::ParametersError => "PARAMETERS_ERROR",
            Self::NoSuitableHandlerError => "NO_SUITABLE_HANDLER_ERROR",
        };
        f.write_str(s)
    }
}

/// Result of performing a task: the task's id and the produced status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the executed task.
    pub task_id: i64,
    /// Status the execution produced.
    pub status: TaskStatus,
}

impl TaskResult {
    /// Creates a result for the given task id.
    pub fn new(task_id: i64, status: TaskStatus) -> Self {
        Self { task_id, status }
    }
}

/// An instruction from the remote authority.
///
/// Immutable once dispatched. The id is assigned by the authority (or
/// the caller scheduling a deferred task) and must be unique among
/// persisted deferred tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique, authority-assigned id.
    pub id: i64,
    /// What the task asks the node to do.
    #[serde(rename = "type")]
    pub kind: TaskType,
    /// Opaque parameters for the matching handler.
    #[serde(default)]
    pub params: TaskParams,
}

impl Task {
    /// Creates a task with no parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatenode::types::{Task, TaskType};
    ///
    /// let task = Task::new(7, TaskType::OpenDoor);
    /// assert!(task.params.is_empty());
    /// ```
    pub fn new(id: i64, kind: TaskType) -> Self {
        Self {
            id,
            kind,
            params: TaskParams::new(),
        }
    }

    /// Creates a task with the given parameters.
    pub fn with_params(id: i64, kind: TaskType, params: TaskParams) -> Self {
        Self { id, kind, params }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task(id={}, type={})", self.id, self.kind)
    }
}

/// A task bound to an activation window, persisted until harvested or
/// cancelled.
///
/// The window invariant `after <= before` is enforced at construction.
/// A deferred task is *valid* at moment `t` iff `after <= t <= before`;
/// tasks harvested after their window elapsed are dropped by the
/// dispatcher without producing a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredTask {
    /// The wrapped task.
    #[serde(flatten)]
    pub task: Task,
    /// Earliest moment the task may run.
    pub after: DateTime<Utc>,
    /// Latest moment the task may still run.
    pub before: DateTime<Utc>,
}

impl DeferredTask {
    /// Wraps a task in an activation window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if `after > before`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use gatenode::types::{DeferredTask, Task, TaskType};
    ///
    /// let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    /// let t1 = t0 + chrono::Duration::seconds(10);
    ///
    /// let task = DeferredTask::new(Task::new(1, TaskType::OpenDoor), t0, t1).unwrap();
    /// assert!(task.is_valid(t0 + chrono::Duration::seconds(5)));
    /// assert!(!task.is_valid(t1 + chrono::Duration::seconds(1)));
    ///
    /// assert!(DeferredTask::new(Task::new(2, TaskType::OpenDoor), t1, t0).is_err());
    /// ```
    pub fn new(task: Task, after: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self> {
        if after > before {
            return Err(Error::InvalidParams(format!(
                "activation window is inverted: {after} > {before}"
            )));
        }
        Ok(Self {
            task,
            after,
            before,
        })
    }

    /// Wraps a task in the given `(after, before)` window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParams`] if the window is inverted.
    pub fn from_task(task: Task, window: (DateTime<Utc>, DateTime<Utc>)) -> Result<Self> {
        Self::new(task, window.0, window.1)
    }

    /// Id of the wrapped task.
    pub fn id(&self) -> i64 {
        self.task.id
    }

    /// Whether the task may run at `moment`.
    pub fn is_valid(&self, moment: DateTime<Utc>) -> bool {
        self.after <= moment && moment <= self.before
    }
}

impl fmt::Display for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeferredTask(id={}, type={}, after={}, before={})",
            self.task.id, self.task.kind, self.after, self.before
        )
    }
}
