//! End-to-end scenarios against a fresh, migrated, tempfile-backed SQLite
//! database — the same tools (`tokio::test`, `tempfile`, `sqlx::migrate!`)
//! the unit tests under `src/` use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

use kodit::config::LoggingConfig;
use kodit::domain::{operation, priority, Payload, Task, TaskStatus};
use kodit::errors::AppResult;
use kodit::infrastructure::{SqliteTaskRepository, TaskRepository};
use kodit::services::{pipelines, status_summary, QueueService};
use kodit::utils::StructuredLogger;
use kodit::worker::{Handler, HandlerRegistry, Worker};

async fn temp_pool() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("kodit-test.db");
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    (dir, pool)
}

fn logger() -> StructuredLogger {
    StructuredLogger::new(&LoggingConfig::default())
}

fn payload_with(key: &str, value: serde_json::Value) -> Payload {
    let mut payload = HashMap::new();
    payload.insert(key.to_string(), value);
    payload
}

#[tokio::test]
async fn enqueue_then_update_priority_leaves_one_task() {
    let (_dir, pool) = temp_pool().await;
    let repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::with_pool(pool));
    let service = QueueService::new(repo, logger());

    service
        .enqueue(Task::new(operation::CLONE_REPOSITORY, 100, payload_with("repository_id", serde_json::json!(1))))
        .await
        .unwrap();
    service
        .enqueue(Task::new(operation::CLONE_REPOSITORY, 200, payload_with("repository_id", serde_json::json!(1))))
        .await
        .unwrap();

    let tasks = service.list(None).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].priority, 200);
}

#[tokio::test]
async fn prescribed_pipeline_dequeues_in_exact_order() {
    let (_dir, pool) = temp_pool().await;
    let repo = Arc::new(SqliteTaskRepository::with_pool(pool));
    let service = QueueService::new(repo.clone(), logger());

    service
        .enqueue_operations(
            pipelines::SCAN_AND_INDEX_COMMIT,
            priority::BACKGROUND,
            payload_with("commit_sha", serde_json::json!("abc")),
        )
        .await
        .unwrap();

    let mut dequeued = Vec::new();
    for _ in 0..15 {
        let task = repo.dequeue().await.unwrap().expect("expected a queued task");
        dequeued.push(task.operation);
    }

    assert_eq!(dequeued, pipelines::SCAN_AND_INDEX_COMMIT);
}

#[tokio::test]
async fn user_initiated_pipeline_preempts_background_pipeline() {
    let (_dir, pool) = temp_pool().await;
    let repo = Arc::new(SqliteTaskRepository::with_pool(pool));
    let service = QueueService::new(repo.clone(), logger());

    service
        .enqueue_operations(
            pipelines::SCAN_AND_INDEX_COMMIT,
            priority::BACKGROUND,
            payload_with("commit_sha", serde_json::json!("bg")),
        )
        .await
        .unwrap();
    service
        .enqueue_operations(
            pipelines::SCAN_AND_INDEX_COMMIT,
            priority::USER_INITIATED,
            payload_with("commit_sha", serde_json::json!("user")),
        )
        .await
        .unwrap();

    for _ in 0..15 {
        let task = repo.dequeue().await.unwrap().unwrap();
        assert_eq!(task.payload().get("commit_sha").and_then(|v| v.as_str()), Some("user"));
    }
    for _ in 0..15 {
        let task = repo.dequeue().await.unwrap().unwrap();
        assert_eq!(task.payload().get("commit_sha").and_then(|v| v.as_str()), Some("bg"));
    }
}

struct FailingHandler {
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl Handler for FailingHandler {
    async fn execute(&self, _payload: &Payload) -> AppResult<()> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(kodit::errors::AppError::NotFound("handler failure".into()))
    }
}

#[tokio::test]
async fn handler_error_does_not_requeue_the_task() {
    let (_dir, pool) = temp_pool().await;
    let repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::with_pool(pool));
    let service = QueueService::new(repo.clone(), logger());

    service
        .enqueue(Task::new(operation::CLONE_REPOSITORY, priority::NORMAL, HashMap::new()))
        .await
        .unwrap();

    let registry = Arc::new(HandlerRegistry::new());
    let handler = Arc::new(FailingHandler {
        calls: std::sync::atomic::AtomicUsize::new(0),
    });
    registry.register(operation::CLONE_REPOSITORY, handler.clone()).await;

    let worker = Worker::new(repo.clone(), registry, logger(), Duration::from_millis(10));
    let processed = worker.process_one().await.unwrap();

    assert!(processed);
    assert_eq!(handler.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(service.pending_count().await.unwrap(), 0);
}

struct SleepingHandler;

#[async_trait]
impl Handler for SleepingHandler {
    async fn execute(&self, _payload: &Payload) -> AppResult<()> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

#[tokio::test]
async fn graceful_stop_blocks_until_the_handler_completes() {
    let (_dir, pool) = temp_pool().await;
    let repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::with_pool(pool));
    let service = QueueService::new(repo.clone(), logger());

    service
        .enqueue(Task::new(operation::CLONE_REPOSITORY, priority::NORMAL, HashMap::new()))
        .await
        .unwrap();

    let registry = Arc::new(HandlerRegistry::new());
    registry.register(operation::CLONE_REPOSITORY, Arc::new(SleepingHandler)).await;

    let worker = Worker::new(repo, registry, logger(), Duration::from_millis(10));
    worker.start();

    tokio::time::sleep(Duration::from_millis(15)).await;
    let started = std::time::Instant::now();
    worker.stop().await;

    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[test]
fn repository_status_aggregation_matches_precedence_scenario() {
    let now = chrono::Utc::now();
    let completed = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now)
        .set_total(1, now)
        .complete(now);
    let failed = TaskStatus::new(operation::EXTRACT_SNIPPETS, "repository", 1, now).fail("boom", now);

    let summary = status_summary::summarize(&[completed.clone(), failed], 0);
    assert_eq!(summary.state, kodit::models::RepositoryState::Failed);
    assert_eq!(summary.message, "boom");

    let in_progress = TaskStatus::new(operation::EXTRACT_SNIPPETS, "repository", 1, now).set_current(5, "", now);
    let summary = status_summary::summarize(&[completed.clone(), in_progress], 0);
    assert_eq!(summary.state, kodit::models::RepositoryState::InProgress);

    let summary = status_summary::summarize(&[completed], 3);
    assert_eq!(summary.state, kodit::models::RepositoryState::InProgress);
}
