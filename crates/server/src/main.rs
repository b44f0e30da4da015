use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_core::users::ensure_user;
use marquee_core::{
    create_authenticator, load_config, validate_config, ClientFactory, SettingsClientFactory,
    SettingsStore, SqliteSettingsStore, SqliteTaskQueue, SqliteUserStore, SqliteWatchStore,
    TaskQueue, TaskRunner, TaskWorker, UserStore, WatchStore,
};

use marquee_server::api::create_router;
use marquee_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MARQUEE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Stores share one SQLite file, each with its own connection
    let db_path = &config.database.path;
    let users: Arc<dyn UserStore> =
        Arc::new(SqliteUserStore::new(db_path).context("Failed to create user store")?);
    let settings: Arc<dyn SettingsStore> =
        Arc::new(SqliteSettingsStore::new(db_path).context("Failed to create settings store")?);
    let watches: Arc<dyn WatchStore> =
        Arc::new(SqliteWatchStore::new(db_path).context("Failed to create watch store")?);
    let queue = Arc::new(SqliteTaskQueue::new(db_path).context("Failed to create task queue")?);
    info!("Stores initialized");

    if let Some(admin) = &config.auth.bootstrap_admin {
        ensure_user(users.as_ref(), &admin.username, &admin.password, true)
            .context("Failed to create bootstrap admin")?;
    }

    let authenticator = create_authenticator(&config.auth, Arc::clone(&users))
        .context("Failed to create authenticator")?;
    info!("Using authenticator: {}", authenticator.method_name());

    let clients: Arc<dyn ClientFactory> = Arc::new(SettingsClientFactory);
    let tasks: Arc<dyn TaskQueue> = queue.clone();

    // Background worker
    let worker = if config.tasks.enabled {
        let runner = Arc::new(TaskRunner::new(
            Arc::clone(&settings),
            Arc::clone(&watches),
            Arc::clone(&tasks),
            Arc::clone(&clients),
        ));
        let worker = TaskWorker::new(config.tasks.clone(), Arc::clone(&queue), runner);
        worker.start();
        info!("Task worker started");
        Some(worker)
    } else {
        info!("Task worker disabled in config");
        None
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        users,
        settings,
        watches,
        tasks,
        clients,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(worker) = worker {
        info!("Stopping task worker...");
        worker.stop().await;
        info!("Task worker stopped");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
