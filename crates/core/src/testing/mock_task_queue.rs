//! Mock task queue for testing.

use std::sync::{Mutex, MutexGuard};

use crate::tasks::{Task, TaskError, TaskHandle, TaskQueue};

/// Captures enqueued tasks instead of running them.
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::MockTaskQueue;
///
/// let queue = MockTaskQueue::new();
/// queue.enqueue(Task::RefreshTmdbConfiguration)?;
/// assert_eq!(queue.enqueued(), vec![Task::RefreshTmdbConfiguration]);
/// ```
#[derive(Debug, Default)]
pub struct MockTaskQueue {
    tasks: Mutex<Vec<Task>>,
    /// If set, the next enqueue fails with this message.
    next_error: Mutex<Option<String>>,
}

impl MockTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every task enqueued so far, in order.
    pub fn enqueued(&self) -> Vec<Task> {
        guard(&self.tasks).clone()
    }

    /// Number of enqueued tasks with the given name.
    pub fn count(&self, name: &str) -> usize {
        guard(&self.tasks).iter().filter(|t| t.name() == name).count()
    }

    pub fn clear(&self) {
        guard(&self.tasks).clear();
    }

    pub fn set_next_error(&self, message: impl Into<String>) {
        *guard(&self.next_error) = Some(message.into());
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TaskQueue for MockTaskQueue {
    fn enqueue(&self, task: Task) -> Result<TaskHandle, TaskError> {
        if let Some(message) = guard(&self.next_error).take() {
            return Err(TaskError::Serialization(message));
        }

        let mut tasks = guard(&self.tasks);
        tasks.push(task.clone());
        Ok(TaskHandle {
            id: tasks.len() as i64,
            name: task.name().to_string(),
        })
    }

    /// Nothing ever runs here, so every captured task counts as pending.
    fn enqueue_unless_pending(&self, task: Task) -> Result<Option<TaskHandle>, TaskError> {
        if guard(&self.tasks).contains(&task) {
            return Ok(None);
        }
        self.enqueue(task).map(Some)
    }
}
