use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::StoreError;
use crate::media::CatalogError;
use crate::searcher::SearchError;
use crate::torrent_client::TorrentClientError;
use crate::torrent_url::TorrentUrlError;

/// A unit of background work.
///
/// Serialized as `{"name": "watch_movie", "args": {...}}` in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args", rename_all = "snake_case")]
pub enum Task {
    WatchMovie { watch_movie_id: i64 },
    WatchTvEpisode { watch_tv_episode_id: i64 },
    WatchTvShowSeason { watch_tv_show_id: i64, season_number: u32 },
    RefreshTmdbConfiguration,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::WatchMovie { .. } => "watch_movie",
            Task::WatchTvEpisode { .. } => "watch_tv_episode",
            Task::WatchTvShowSeason { .. } => "watch_tv_show_season",
            Task::RefreshTmdbConfiguration => "refresh_tmdb_configuration",
        }
    }
}

/// Returned by `enqueue` once the task is durably queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "done" => Ok(TaskStatus::Done),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(TaskError::Serialization(format!("unknown task status {other}"))),
        }
    }
}

/// A row of the task queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedTask {
    pub id: i64,
    pub task: Task,
    pub status: TaskStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Task serialization failed: {0}")]
    Serialization(String),

    #[error("Settings have not been created yet")]
    MissingSettings,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    TorrentClient(#[from] TorrentClientError),

    #[error(transparent)]
    TorrentUrl(#[from] TorrentUrlError),
}

impl From<serde_json::Error> for TaskError {
    fn from(e: serde_json::Error) -> Self {
        TaskError::Serialization(e.to_string())
    }
}

/// Producer side of the background task queue.
pub trait TaskQueue: Send + Sync {
    /// Queue `task`. Returns once the task is committed.
    fn enqueue(&self, task: Task) -> Result<TaskHandle, TaskError>;

    /// Queue `task` unless an identical task is already queued or running.
    /// `None` when it was skipped.
    fn enqueue_unless_pending(&self, task: Task) -> Result<Option<TaskHandle>, TaskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_wire_format() {
        let task = Task::WatchTvShowSeason {
            watch_tv_show_id: 4,
            season_number: 2,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "watch_tv_show_season",
                "args": {"watch_tv_show_id": 4, "season_number": 2}
            })
        );
        assert_eq!(json["name"], task.name());

        let refresh: Task =
            serde_json::from_value(serde_json::json!({"name": "refresh_tmdb_configuration"}))
                .unwrap();
        assert_eq!(refresh, Task::RefreshTmdbConfiguration);
    }

    #[test]
    fn test_status_parse() {
        for status in [
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Done,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<TaskStatus>().is_err());
    }
}
