//! Read-only HTTP queue surface (spec §6.2). No authentication, pagination
//! helper, or write endpoint lives here — those are explicitly out of
//! scope, and task mutation is `QueueService`'s job, not the API's.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::Task;
use crate::errors::{AppError, AppResult};
use crate::services::QueueService;
use crate::utils::HealthChecker;

#[derive(Clone)]
pub struct ApiState {
    pub queue_service: Arc<QueueService>,
    pub health_checker: Arc<HealthChecker>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub task_type: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiTask {
    pub id: i64,
    pub dedup_key: String,
    pub operation: String,
    pub priority: i64,
}

impl From<Task> for ApiTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            dedup_key: task.dedup_key,
            operation: task.operation,
            priority: task.priority,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiTaskListResponse {
    pub tasks: Vec<ApiTask>,
}

async fn list_tasks_handler(
    State(state): State<ApiState>,
    Query(query): Query<ListTasksQuery>,
) -> AppResult<Json<ApiTaskListResponse>> {
    let mut tasks: Vec<ApiTask> = state
        .queue_service
        .list(query.task_type.as_deref())
        .await?
        .into_iter()
        .map(ApiTask::from)
        .collect();

    if let Some(limit) = query.limit {
        tasks.truncate(limit);
    }

    Ok(Json(ApiTaskListResponse { tasks }))
}

async fn get_task_handler(
    State(state): State<ApiState>,
    Path(task_id): Path<i64>,
) -> AppResult<Json<ApiTask>> {
    let tasks = state.queue_service.list(None).await?;
    let task = tasks
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| AppError::NotFound(format!("task {task_id}")))?;
    Ok(Json(ApiTask::from(task)))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub pending_count: i64,
}

async fn stats_handler(State(state): State<ApiState>) -> AppResult<Json<StatsResponse>> {
    let pending_count = state.queue_service.pending_count().await?;
    Ok(Json(StatsResponse { pending_count }))
}

async fn health_handler(State(state): State<ApiState>) -> Json<crate::utils::HealthStatus> {
    Json(state.health_checker.check_health().await)
}

pub fn create_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/queue/tasks", get(list_tasks_handler))
        .route("/api/v1/queue/tasks/:id", get(get_task_handler))
        .route("/api/v1/queue/stats", get(stats_handler))
        .with_state(state)
}
