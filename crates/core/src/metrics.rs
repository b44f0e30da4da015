//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task queue (enqueued and processed tasks)
//! - Background sweeps
//! - External services (Jackett, TMDB, Transmission)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Task Metrics
// =============================================================================

/// Tasks enqueued total by task name.
pub static TASKS_ENQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_tasks_enqueued_total", "Total tasks enqueued"),
        &["task"],
    )
    .unwrap()
});

/// Tasks processed total by task name and outcome.
pub static TASKS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("marquee_tasks_processed_total", "Total tasks processed"),
        &["task", "outcome"], // outcome: "done", "failed"
    )
    .unwrap()
});

/// Task execution duration in seconds.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("marquee_task_duration_seconds", "Duration of task execution")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["task"],
    )
    .unwrap()
});

/// Watches changed by the periodic sweeps.
pub static SWEEP_UPDATES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_sweep_updates_total",
            "Watches collected or re-enqueued by sweeps",
        ),
        &["sweep"], // "completion", "wanted"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// Torrents added to the download daemon by the worker.
pub static TORRENTS_ADDED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_torrents_added_total",
            "Total torrents handed to the download daemon",
        ),
        &["kind"], // "movie", "episode", "season"
    )
    .unwrap()
});

/// Searches that produced no acceptable torrent.
pub static SEARCH_MISSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "marquee_search_misses_total",
            "Searches with no acceptable result",
        ),
        &["kind"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TASKS_ENQUEUED.clone()),
        Box::new(TASKS_PROCESSED.clone()),
        Box::new(TASK_DURATION.clone()),
        Box::new(SWEEP_UPDATES.clone()),
        Box::new(TORRENTS_ADDED.clone()),
        Box::new(SEARCH_MISSES.clone()),
    ]
}
