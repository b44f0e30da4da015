//! Background worker consuming the task queue.
//!
//! Two loops run while the worker is started:
//! - Queue loop: claims one task at a time and runs it to completion
//! - Sweep loop: periodic completion and wanted sweeps, pruning finished
//!   tasks alongside the wanted sweep

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::{TasksConfig, MAX_AGE_HOURS};
use crate::metrics::{TASKS_PROCESSED, TASK_DURATION};

use super::{SqliteTaskQueue, TaskError, TaskRunner};

pub struct TaskWorker {
    config: TasksConfig,
    queue: Arc<SqliteTaskQueue>,
    runner: Arc<TaskRunner>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl TaskWorker {
    pub fn new(config: TasksConfig, queue: Arc<SqliteTaskQueue>, runner: Arc<TaskRunner>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            queue,
            runner,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the worker (spawns background tasks).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Task worker already running");
            return;
        }

        info!("Starting task worker");

        // Tasks claimed by a previous process never finished
        match self.queue.requeue_running() {
            Ok(0) => {}
            Ok(count) => info!(count, "Requeued interrupted tasks"),
            Err(e) => warn!("Failed to requeue interrupted tasks: {}", e),
        }

        self.spawn_queue_loop();
        self.spawn_sweep_loop();
    }

    /// Stop the worker. The task in progress, if any, runs to completion.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("Stopping task worker");
        let _ = self.shutdown_tx.send(());

        // Give workers a moment to finish current work
        tokio::time::sleep(Duration::from_millis(100)).await;
        info!("Task worker stopped");
    }

    /// Claim and run one task. Returns false when the queue was empty.
    pub async fn process_one(
        queue: &SqliteTaskQueue,
        runner: &TaskRunner,
    ) -> Result<bool, TaskError> {
        let Some(claimed) = queue.claim_next()? else {
            return Ok(false);
        };

        let name = claimed.task.name();
        debug!(task_id = claimed.id, task = name, attempt = claimed.attempts, "Running task");
        let start = Instant::now();
        let result = runner.run(&claimed.task).await;
        TASK_DURATION
            .with_label_values(&[name])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                queue.complete(claimed.id)?;
                TASKS_PROCESSED.with_label_values(&[name, "done"]).inc();
            }
            Err(e) => {
                warn!(task_id = claimed.id, task = name, "Task failed: {}", e);
                queue.fail(claimed.id, &e.to_string())?;
                TASKS_PROCESSED.with_label_values(&[name, "failed"]).inc();
            }
        }
        Ok(true)
    }

    fn spawn_queue_loop(&self) {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let runner = Arc::clone(&self.runner);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Task queue loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Task queue loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        // Drain the queue before sleeping again
                        while running.load(Ordering::Relaxed) {
                            match Self::process_one(&queue, &runner).await {
                                Ok(true) => continue,
                                Ok(false) => break,
                                Err(e) => {
                                    error!("Task queue error: {}", e);
                                    break;
                                }
                            }
                        }
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }
            info!("Task queue loop stopped");
        });
    }

    /// Delete finished tasks older than the configured retention.
    pub fn prune(queue: &SqliteTaskQueue, config: &TasksConfig) -> Result<usize, TaskError> {
        let hours = config.retain_finished_hours.min(MAX_AGE_HOURS) as i64;
        queue.prune_finished(Utc::now() - chrono::Duration::hours(hours))
    }

    fn spawn_sweep_loop(&self) {
        let running = Arc::clone(&self.running);
        let runner = Arc::clone(&self.runner);
        let queue = Arc::clone(&self.queue);
        let config = self.config.clone();
        let mut completion = tokio::time::interval(Duration::from_secs(self.config.completion_sweep_secs));
        let mut wanted = tokio::time::interval(Duration::from_secs(self.config.wanted_sweep_secs));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Sweep loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sweep loop received shutdown signal");
                        break;
                    }
                    _ = completion.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        match runner.sweep_completed().await {
                            Ok(0) => {}
                            Ok(count) => info!(count, "Marked watches collected"),
                            Err(e) => warn!("Completion sweep failed: {}", e),
                        }
                    }
                    _ = wanted.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        match runner.sweep_wanted() {
                            Ok(0) => {}
                            Ok(count) => info!(count, "Re-enqueued wanted watches"),
                            Err(e) => warn!("Wanted sweep failed: {}", e),
                        }
                        if let Err(e) = Self::prune(&queue, &config) {
                            warn!("Pruning finished tasks failed: {}", e);
                        }
                    }
                }
            }
            info!("Sweep loop stopped");
        });
    }
}
