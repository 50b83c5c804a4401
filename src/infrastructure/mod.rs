//! Persistence contracts. `database` holds the SQLite realizations.

pub mod database;

use async_trait::async_trait;

use crate::domain::{Task, TaskStatus};
use crate::errors::AppResult;
use crate::models::TaskQuery;

pub use database::{SqliteStatusRepository, SqliteTaskRepository};

/// Persistent set of tasks with dedup-key uniqueness (spec §4.1).
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn save(&self, task: &Task) -> AppResult<Task>;
    async fn save_bulk(&self, tasks: &[Task]) -> AppResult<Vec<Task>>;
    async fn find(&self, query: &TaskQuery) -> AppResult<Vec<Task>>;
    async fn count(&self, query: &TaskQuery) -> AppResult<i64>;
    async fn exists(&self, id: i64) -> AppResult<bool>;
    async fn get(&self, id: i64) -> AppResult<Task>;
    async fn delete(&self, id: i64) -> AppResult<()>;
    async fn delete_by_query(&self, query: &TaskQuery) -> AppResult<u64>;
    /// Atomically selects and removes the highest-priority task, ties broken
    /// by earliest `created_at`. `None` when the queue is empty.
    async fn dequeue(&self) -> AppResult<Option<Task>>;
    async fn dequeue_by_operation(&self, operation: &str) -> AppResult<Option<Task>>;
}

pub type DynTaskRepository = std::sync::Arc<dyn TaskRepository>;

/// Persistent status tree. `save` upserts a single row; it does not walk the
/// parent chain, so callers must persist a parent before any child that
/// references it (`services::tracker::ProgressTracker` does this for the
/// live single-status path). `save_bulk` additionally sorts a whole batch
/// root-first, for callers with no such ordering guarantee of their own
/// (spec §4.7).
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn save(&self, status: &TaskStatus) -> AppResult<()>;
    async fn save_bulk(&self, statuses: &[TaskStatus]) -> AppResult<()>;
    async fn get(&self, id: &str) -> AppResult<Option<TaskStatus>>;
    async fn list_by_trackable(&self, trackable_type: &str, trackable_id: i64) -> AppResult<Vec<TaskStatus>>;
}

pub type DynStatusRepository = std::sync::Arc<dyn StatusRepository>;
