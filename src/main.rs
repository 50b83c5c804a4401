//! kodit-server: loads configuration, opens the SQLite-backed queue, wires
//! up a worker and its handler registry, and serves the read-only HTTP
//! surface alongside it.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kodit::config::ConfigManager;
use kodit::handlers::{create_routes, ApiState};
use kodit::infrastructure::{database, SqliteTaskRepository};
use kodit::services::QueueService;
use kodit::utils::{HealthChecker, LogManager};
use kodit::worker::{HandlerRegistry, Worker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ConfigManager::new()?;

    let log_manager = LogManager::new(config.logging.clone());
    log_manager.init()?;
    let logger = log_manager.structured_logger();

    let pool = database::create_pool(&config.database).await?;

    let task_repository = Arc::new(SqliteTaskRepository::with_pool(pool));

    let queue_service = Arc::new(QueueService::new(task_repository.clone(), logger.clone()));

    let registry = Arc::new(HandlerRegistry::new());
    // No concrete handlers are registered at startup: the handlers that do
    // the actual git/LLM/embedding work are external collaborators outside
    // this crate's scope (spec §1). An unregistered operation is a silent
    // success per the worker contract, so the queue can be exercised end to
    // end before a handler is rolled out.

    let worker = Worker::new(
        task_repository,
        registry,
        logger.clone(),
        Duration::from_millis(config.worker.poll_interval_ms),
    );
    worker.start();

    let api_state = ApiState {
        queue_service,
        health_checker: Arc::new(HealthChecker::new()),
    };
    let app = create_routes(api_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(config.server_address()).await?;
    tracing::info!(address = %config.server_address(), "kodit-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(worker))
        .await?;

    Ok(())
}

async fn shutdown_signal(worker: Arc<Worker>) {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping worker");
    worker.stop().await;
}
