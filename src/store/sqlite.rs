//! SQLite-backed task storage.
//!
//! One table, `deferred_task`, whose schema is exactly the deferred-task
//! fields keyed by id. Timestamps are stored as unix milliseconds and
//! parameters as JSON text. The connection sits behind a mutex; every
//! operation is a single statement, so nothing is ever half-applied.
//!
//! Harvesting uses `DELETE ... RETURNING` -- select and remove in one
//! statement -- so a crash mid-harvest cannot leave a task both
//! executed and still persisted.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};

use crate::error::{Error, Result};
use crate::store::TaskStorage;
use crate::types::{DeferredTask, Task, TaskParams, TaskType};

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS deferred_task (
    id          INTEGER PRIMARY KEY,
    kind        TEXT    NOT NULL,
    params      TEXT    NOT NULL,
    after_ms    INTEGER NOT NULL,
    before_ms   INTEGER NOT NULL
);
";

const COLUMNS: &str = "id, kind, params, after_ms, before_ms";

/// Durable [`TaskStorage`] implementation over SQLite.
///
/// # Examples
///
/// ```no_run
/// use gatenode::store::SqliteTaskStorage;
///
/// let storage = SqliteTaskStorage::open("tasks.sqlite").unwrap();
/// ```
pub struct SqliteTaskStorage {
    conn: Mutex<Connection>,
}

/// A deferred-task row before decoding into domain types.
type RawRow = (i64, String, String, i64, i64);

impl SqliteTaskStorage {
    /// Opens (creating if needed) the database at `path` and ensures the
    /// task table exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the database cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database. Contents vanish on drop;
    /// useful for tests that want real SQL semantics without a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn decode(row: RawRow) -> Result<DeferredTask> {
        let (id, kind, params, after_ms, before_ms) = row;
        let kind: TaskType = kind.parse()?;
        let params: TaskParams = serde_json::from_str(&params)?;
        Ok(DeferredTask {
            task: Task::with_params(id, kind, params),
            after: decode_millis(after_ms)?,
            before: decode_millis(before_ms)?,
        })
    }
}

fn decode_millis(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::Storage(format!("timestamp out of range: {millis}")))
}

#[async_trait]
impl TaskStorage for SqliteTaskStorage {
    async fn add(&self, task: DeferredTask) -> Result<()> {
        let params_json = serde_json::to_string(&task.task.params)?;
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO deferred_task (id, kind, params, after_ms, before_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id(),
                task.task.kind.as_str(),
                params_json,
                task.after.timestamp_millis(),
                task.before.timestamp_millis(),
            ],
        );
        match inserted {
            Ok(_) => {
                tracing::debug!(task_id = task.id(), "deferred task persisted");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateTask { task_id: task.id() })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, task_id: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM deferred_task WHERE id = ?1", params![task_id])?;
        Ok(())
    }

    async fn take_suitable_tasks(&self, now: DateTime<Utc>) -> Result<Vec<DeferredTask>> {
        let raw: Vec<RawRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&format!(
                "DELETE FROM deferred_task WHERE after_ms <= ?1 RETURNING {COLUMNS}"
            ))?;
            let rows = stmt.query_map(params![now.timestamp_millis()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut tasks = raw
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>>>()?;
        tasks.sort_by_key(|task| (task.after, task.id()));
        tracing::debug!(count = tasks.len(), "harvested due deferred tasks");
        Ok(tasks)
    }

    async fn get_all(&self) -> Result<Vec<DeferredTask>> {
        let raw: Vec<RawRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM deferred_task ORDER BY after_ms, id"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        raw.into_iter().map(Self::decode).collect()
    }
}
