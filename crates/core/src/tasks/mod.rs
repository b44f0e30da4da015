//! Background tasks: the durable queue, the task runner and the worker.

mod runner;
mod sqlite_queue;
mod types;
mod worker;

pub use runner::TaskRunner;
pub use sqlite_queue::SqliteTaskQueue;
pub use types::*;
pub use worker::TaskWorker;
