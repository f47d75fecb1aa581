//! Deferred-task storage.
//!
//! The [`TaskStorage`] trait defines the contract the dispatcher drives:
//! insert with duplicate detection, idempotent delete, an **atomic**
//! harvest of all due tasks, and a non-destructive listing for
//! diagnostics and recovery.
//!
//! # Harvest Atomicity
//!
//! [`take_suitable_tasks`](TaskStorage::take_suitable_tasks) selects and
//! removes in one step. A task must never be returned by two harvests,
//! and never be lost between "selected" and "removed": a crash in the
//! middle must not duplicate execution on restart. The SQLite backend
//! uses a single `DELETE ... RETURNING` statement for this; the
//! in-memory backend drains under one lock.
//!
//! Note that harvesting is driven purely by `after <= now` -- tasks
//! whose window already elapsed are still removed. The dispatcher, not
//! the store, classifies those invalid and drops them.
//!
//! # Backends
//!
//! - [`SqliteTaskStorage`](sqlite::SqliteTaskStorage) -- durable store
//!   surviving process restart; the production backend.
//! - [`MemoryTaskStorage`](memory::MemoryTaskStorage) -- `BTreeMap`
//!   behind a mutex; tests and diskless operation.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryTaskStorage;
pub use sqlite::SqliteTaskStorage;

use crate::error::Result;
use crate::types::DeferredTask;

/// Durable, time-indexed store of deferred tasks, keyed uniquely by id.
///
/// Implementations must be `Send + Sync`; harvest must stay atomic even
/// under concurrent callers.
#[async_trait]
pub trait TaskStorage: Send + Sync {
    /// Persists a deferred task.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateTask`](crate::Error::DuplicateTask) if a task
    ///   with the same id already exists.
    /// - [`Error::Storage`](crate::Error::Storage) on backend failures.
    async fn add(&self, task: DeferredTask) -> Result<()>;

    /// Removes a task by id. Idempotent: deleting an absent id succeeds.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`](crate::Error::Storage) on backend failures.
    async fn delete(&self, task_id: i64) -> Result<()>;

    /// Atomically removes and returns every task with `after <= now`,
    /// in ascending `(after, id)` order.
    ///
    /// Tasks whose `before` already passed are still harvested; the
    /// caller is responsible for dropping them.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`](crate::Error::Storage) on backend failures.
    async fn take_suitable_tasks(&self, now: DateTime<Utc>) -> Result<Vec<DeferredTask>>;

    /// Returns every persisted task without removing anything, in
    /// ascending `(after, id)` order.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`](crate::Error::Storage) on backend failures.
    async fn get_all(&self) -> Result<Vec<DeferredTask>>;
}
