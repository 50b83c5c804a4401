use tracing::{error, info, instrument, warn, Span};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initializes the global `tracing` subscriber.
pub struct LogManager {
    config: LoggingConfig,
}

impl LogManager {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&self.config.level)
                .add_directive("tower_http=debug".parse().unwrap())
                .add_directive("kodit=info".parse().unwrap())
        });

        tracing_subscriber::fmt().with_env_filter(env_filter).init();

        info!(level = %self.config.level, "logging system initialized");
        Ok(())
    }

    pub fn structured_logger(&self) -> StructuredLogger {
        StructuredLogger::new(&self.config)
    }
}

/// Structured, queue/worker/tracker-aware logging facade.
#[derive(Clone)]
pub struct StructuredLogger {
    config: LoggingConfig,
}

impl StructuredLogger {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    #[instrument(skip_all, fields(dedup_key, operation, priority))]
    pub fn log_task_enqueued(&self, dedup_key: &str, operation: &str, priority: i64) {
        let span = Span::current();
        span.record("dedup_key", dedup_key);
        span.record("operation", operation);
        span.record("priority", priority);

        info!(dedup_key, operation, priority, "task enqueued");
    }

    #[instrument(skip_all, fields(task_id, operation))]
    pub fn log_task_dequeued(&self, task_id: i64, operation: &str) {
        let span = Span::current();
        span.record("task_id", task_id);
        span.record("operation", operation);

        info!(task_id, operation, "task dequeued");
    }

    #[instrument(skip_all, fields(task_id, operation, error))]
    pub fn log_handler_error(&self, task_id: i64, operation: &str, error: &str) {
        let span = Span::current();
        span.record("task_id", task_id);
        span.record("operation", operation);
        span.record("error", error);

        error!(task_id, operation, error, "handler returned an error; task will not be retried");
    }

    #[instrument(skip_all, fields(operation))]
    pub fn log_unregistered_operation(&self, operation: &str) {
        let span = Span::current();
        span.record("operation", operation);

        warn!(operation, "no handler registered for operation; consuming silently");
    }

    #[instrument(skip_all, fields(status_id, state))]
    pub fn log_status_transition(&self, status_id: &str, state: &str) {
        let span = Span::current();
        span.record("status_id", status_id);
        span.record("state", state);

        info!(status_id, state, "task status transitioned");
    }

    #[instrument(skip_all, fields(status_id, error))]
    pub fn log_reporter_error(&self, status_id: &str, error: &str) {
        let span = Span::current();
        span.record("status_id", status_id);
        span.record("error", error);

        error!(status_id, error, "reporter failed; remaining subscribers still notified");
    }

    pub fn is_json(&self) -> bool {
        matches!(self.config.format, crate::config::LogFormat::Json)
    }
}

/// Minimal health surface for `GET /health`-style probes. Trimmed from the
/// teacher's version: no cache/external-service sections, since kodit's
/// scope has neither.
pub struct HealthChecker {
    database_healthy: std::sync::atomic::AtomicBool,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            database_healthy: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let healthy = self.database_healthy.load(std::sync::atomic::Ordering::Relaxed);
        HealthStatus {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn set_database_health(&self, healthy: bool) {
        self.database_healthy.store(healthy, std::sync::atomic::Ordering::Relaxed);
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_logger_creation() {
        let config = LoggingConfig::default();
        let logger = StructuredLogger::new(&config);
        assert!(!logger.is_json());
    }

    #[tokio::test]
    async fn health_checker_reports_healthy_by_default() {
        let checker = HealthChecker::new();
        let status = checker.check_health().await;
        assert_eq!(status.status, "healthy");
    }
}
