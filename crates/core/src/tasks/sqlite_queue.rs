//! SQLite-backed durable task queue.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{QueuedTask, Task, TaskError, TaskHandle, TaskQueue, TaskStatus};
use crate::db::{self, StoreError};
use crate::metrics::TASKS_ENQUEUED;

pub struct SqliteTaskQueue {
    conn: Mutex<Connection>,
}

impl SqliteTaskQueue {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory queue (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = db::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status, id);
            "#,
        )?;
        Ok(())
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<(i64, String, RawTask)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            RawTask {
                status: row.get(2)?,
                attempts: row.get(3)?,
                last_error: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            },
        ))
    }

    fn decode(id: i64, payload: &str, raw: RawTask) -> Result<QueuedTask, TaskError> {
        Ok(QueuedTask {
            id,
            task: serde_json::from_str(payload)?,
            status: raw.status.parse()?,
            attempts: raw.attempts,
            last_error: raw.last_error,
            created_at: db::parse_timestamp(&raw.created_at),
            updated_at: db::parse_timestamp(&raw.updated_at),
        })
    }

    /// Claim the oldest queued task and mark it running.
    ///
    /// A row whose payload no longer decodes is marked failed and reported
    /// as an error; the next call moves on to the following row.
    pub fn claim_next(&self) -> Result<Option<QueuedTask>, TaskError> {
        let mut conn = db::lock(&self.conn)?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let now = Utc::now().to_rfc3339();

        let row = tx
            .query_row(
                "SELECT id, payload, status, attempts, last_error, created_at, updated_at FROM tasks WHERE status = 'queued' ORDER BY id LIMIT 1",
                [],
                Self::row_to_task,
            )
            .optional()
            .map_err(StoreError::from)?;

        let Some((id, payload, mut raw)) = row else {
            return Ok(None);
        };

        let claimed = match serde_json::from_str::<Task>(&payload) {
            Ok(_) => {
                tx.execute(
                    "UPDATE tasks SET status = 'running', attempts = attempts + 1, updated_at = ? WHERE id = ?",
                    params![now, id],
                )
                .map_err(StoreError::from)?;
                raw.status = TaskStatus::Running.as_str().to_string();
                raw.attempts += 1;
                raw.updated_at = now;
                Self::decode(id, &payload, raw)
            }
            Err(e) => {
                tx.execute(
                    "UPDATE tasks SET status = 'failed', last_error = ?, updated_at = ? WHERE id = ?",
                    params![e.to_string(), now, id],
                )
                .map_err(StoreError::from)?;
                Err(TaskError::from(e))
            }
        };

        tx.commit().map_err(StoreError::from)?;
        claimed.map(Some)
    }

    pub fn complete(&self, id: i64) -> Result<(), TaskError> {
        self.finish(id, TaskStatus::Done, None)
    }

    pub fn fail(&self, id: i64, error: &str) -> Result<(), TaskError> {
        self.finish(id, TaskStatus::Failed, Some(error))
    }

    fn finish(&self, id: i64, status: TaskStatus, error: Option<&str>) -> Result<(), TaskError> {
        let conn = db::lock(&self.conn)?;
        let updated = conn
            .execute(
                "UPDATE tasks SET status = ?, last_error = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), error, Utc::now().to_rfc3339(), id],
            )
            .map_err(StoreError::from)?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("task {id}")).into());
        }
        Ok(())
    }

    /// Tasks with the given status, oldest first. `None` lists everything.
    pub fn list(&self, status: Option<TaskStatus>) -> Result<Vec<QueuedTask>, TaskError> {
        let conn = db::lock(&self.conn)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, payload, status, attempts, last_error, created_at, updated_at FROM tasks WHERE (?1 IS NULL OR status = ?1) ORDER BY id",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![status.map(|s| s.as_str())], Self::row_to_task)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;

        rows.into_iter()
            .map(|(id, payload, raw)| Self::decode(id, &payload, raw))
            .collect()
    }

    /// Delete done and failed tasks last updated before `cutoff`.
    pub fn prune_finished(&self, cutoff: DateTime<Utc>) -> Result<usize, TaskError> {
        let conn = db::lock(&self.conn)?;
        let count = conn
            .execute(
                "DELETE FROM tasks WHERE status IN ('done', 'failed') AND updated_at < ?",
                params![cutoff.to_rfc3339()],
            )
            .map_err(StoreError::from)?;
        if count > 0 {
            debug!(count, "Pruned finished tasks");
        }
        Ok(count)
    }

    /// Put tasks left running by a previous process back in the queue.
    pub fn requeue_running(&self) -> Result<usize, TaskError> {
        let conn = db::lock(&self.conn)?;
        let count = conn
            .execute(
                "UPDATE tasks SET status = 'queued', updated_at = ? WHERE status = 'running'",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(StoreError::from)?;
        Ok(count)
    }
}

struct RawTask {
    status: String,
    attempts: u32,
    last_error: Option<String>,
    created_at: String,
    updated_at: String,
}

fn insert(conn: &Connection, task: &Task, payload: &str) -> Result<TaskHandle, TaskError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO tasks (name, payload, status, attempts, created_at, updated_at) VALUES (?, ?, 'queued', 0, ?, ?)",
        params![task.name(), payload, now, now],
    )
    .map_err(StoreError::from)?;
    let id = conn.last_insert_rowid();

    TASKS_ENQUEUED.with_label_values(&[task.name()]).inc();
    debug!(task_id = id, task = task.name(), "Task enqueued");

    Ok(TaskHandle {
        id,
        name: task.name().to_string(),
    })
}

impl TaskQueue for SqliteTaskQueue {
    fn enqueue(&self, task: Task) -> Result<TaskHandle, TaskError> {
        let payload = serde_json::to_string(&task)?;
        let conn = db::lock(&self.conn)?;
        insert(&conn, &task, &payload)
    }

    fn enqueue_unless_pending(&self, task: Task) -> Result<Option<TaskHandle>, TaskError> {
        let payload = serde_json::to_string(&task)?;
        let conn = db::lock(&self.conn)?;

        let pending: Option<i64> = conn
            .query_row(
                "SELECT id FROM tasks WHERE payload = ? AND status IN ('queued', 'running') LIMIT 1",
                params![payload],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)?;
        if let Some(id) = pending {
            debug!(task_id = id, task = task.name(), "Identical task already pending");
            return Ok(None);
        }

        insert(&conn, &task, &payload).map(Some)
    }
}
