//! In-memory task storage.
//!
//! A `BTreeMap` behind a mutex, with the same observable contract as the
//! SQLite backend. Used by the test suite and for diskless bring-up;
//! nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::store::TaskStorage;
use crate::types::DeferredTask;

/// Thread-safe in-memory implementation of [`TaskStorage`].
///
/// # Examples
///
/// ```
/// use gatenode::store::MemoryTaskStorage;
///
/// let storage = MemoryTaskStorage::new();
/// assert!(storage.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryTaskStorage {
    tasks: Mutex<BTreeMap<i64, DeferredTask>>,
}

impl MemoryTaskStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted tasks.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether the store holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

#[async_trait]
impl TaskStorage for MemoryTaskStorage {
    async fn add(&self, task: DeferredTask) -> Result<()> {
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&task.id()) {
            return Err(Error::DuplicateTask { task_id: task.id() });
        }
        tracing::debug!(task_id = task.id(), "deferred task persisted");
        tasks.insert(task.id(), task);
        Ok(())
    }

    async fn delete(&self, task_id: i64) -> Result<()> {
        self.tasks.lock().remove(&task_id);
        Ok(())
    }

    async fn take_suitable_tasks(&self, now: DateTime<Utc>) -> Result<Vec<DeferredTask>> {
        let mut tasks = self.tasks.lock();
        let due: Vec<i64> = tasks
            .iter()
            .filter(|(_, task)| task.after <= now)
            .map(|(id, _)| *id)
            .collect();
        let mut harvested: Vec<DeferredTask> = due
            .into_iter()
            .filter_map(|id| tasks.remove(&id))
            .collect();
        harvested.sort_by_key(|task| (task.after, task.id()));
        Ok(harvested)
    }

    async fn get_all(&self) -> Result<Vec<DeferredTask>> {
        let mut all: Vec<DeferredTask> = self.tasks.lock().values().cloned().collect();
        all.sort_by_key(|task| (task.after, task.id()));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{Task, TaskType};

    fn moment(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn deferred(id: i64, after_secs: i64, before_secs: i64) -> DeferredTask {
        DeferredTask::new(
            Task::new(id, TaskType::OpenDoor),
            moment(after_secs),
            moment(before_secs),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn add_rejects_duplicate_id() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(1, 0, 10)).await.unwrap();
        let err = storage.add(deferred(1, 5, 20)).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTask { task_id: 1 }));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(1, 0, 10)).await.unwrap();
        storage.delete(1).await.unwrap();
        storage.delete(1).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn harvest_takes_due_tasks_once() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(1, 0, 10)).await.unwrap();
        storage.add(deferred(2, 100, 110)).await.unwrap();

        let first = storage.take_suitable_tasks(moment(5)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id(), 1);

        let second = storage.take_suitable_tasks(moment(6)).await.unwrap();
        assert!(second.is_empty());

        let later = storage.take_suitable_tasks(moment(100)).await.unwrap();
        assert_eq!(later.len(), 1);
        assert_eq!(later[0].id(), 2);
    }

    #[tokio::test]
    async fn harvest_includes_elapsed_windows() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(1, 0, 1)).await.unwrap();
        let harvested = storage.take_suitable_tasks(moment(50)).await.unwrap();
        assert_eq!(harvested.len(), 1);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn harvest_order_is_after_then_id() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(9, 3, 100)).await.unwrap();
        storage.add(deferred(2, 3, 100)).await.unwrap();
        storage.add(deferred(5, 1, 100)).await.unwrap();

        let harvested = storage.take_suitable_tasks(moment(10)).await.unwrap();
        let ids: Vec<i64> = harvested.iter().map(DeferredTask::id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }

    #[tokio::test]
    async fn get_all_is_non_destructive() {
        let storage = MemoryTaskStorage::new();
        storage.add(deferred(1, 0, 10)).await.unwrap();
        storage.add(deferred(2, 5, 15)).await.unwrap();

        assert_eq!(storage.get_all().await.unwrap().len(), 2);
        assert_eq!(storage.get_all().await.unwrap().len(), 2);
    }
}
