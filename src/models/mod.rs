//! Row-shaped DTOs and query types for the SQLite persistence layer.
//!
//! Domain types (`domain::Task`, `domain::TaskStatus`) never touch `sqlx`
//! directly; these row types carry the wire/storage encoding (payload and
//! metadata as JSON text columns) and convert to/from the domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Payload, Task, TaskState, TaskStatus};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: i64,
    pub dedup_key: String,
    pub operation: String,
    pub payload: String,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn from_domain(task: &Task) -> AppResult<Self> {
        Ok(Self {
            id: task.id,
            dedup_key: task.dedup_key.clone(),
            operation: task.operation.clone(),
            payload: serde_json::to_string(&task.payload())?,
            priority: task.priority,
            created_at: task.created_at,
            updated_at: task.updated_at,
        })
    }

    pub fn to_domain(&self) -> AppResult<Task> {
        let payload: Payload = serde_json::from_str(&self.payload)?;
        let mut task = Task::new(self.operation.clone(), self.priority, payload);
        task = task.with_assigned_identity(self.id, self.created_at);
        task = task.with_priority(self.priority, self.updated_at);
        Ok(task)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskStatusRecord {
    pub id: String,
    pub state: String,
    pub operation: String,
    pub message: String,
    pub trackable_id: i64,
    pub trackable_type: String,
    pub parent_id: Option<String>,
    pub error: Option<String>,
    pub total: i64,
    pub current: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatusRecord {
    pub fn from_domain(status: &TaskStatus) -> Self {
        Self {
            id: status.id.clone(),
            state: status.state.to_string(),
            operation: status.operation.clone(),
            message: status.message.clone(),
            trackable_id: status.trackable_id,
            trackable_type: status.trackable_type.clone(),
            parent_id: status.parent_id.clone(),
            error: status.error.clone(),
            total: status.total,
            current: status.current,
            created_at: status.created_at,
            updated_at: status.updated_at,
        }
    }

    pub fn to_domain(&self) -> AppResult<TaskStatus> {
        use std::str::FromStr;
        let state = TaskState::from_str(&self.state)
            .map_err(|_| AppError::InvalidState(self.state.clone()))?;
        Ok(TaskStatus {
            id: self.id.clone(),
            state,
            operation: self.operation.clone(),
            message: self.message.clone(),
            error: self.error.clone(),
            total: self.total,
            current: self.current,
            trackable_type: self.trackable_type.clone(),
            trackable_id: self.trackable_id,
            parent_id: self.parent_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Equality/order filters for `TaskRepository::find`/`count`/`delete_by_query`.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub operation: Option<String>,
    pub dedup_key: Option<String>,
    pub order_by_priority_desc: bool,
    pub order_by_created_at_desc: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_dedup_key(mut self, dedup_key: impl Into<String>) -> Self {
        self.dedup_key = Some(dedup_key.into());
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        match field {
            "priority" => self.order_by_priority_desc = true,
            "created_at" => self.order_by_created_at_desc = true,
            _ => {}
        }
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Aggregated repository progress, produced by `services::status_summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStatusSummary {
    pub state: RepositoryState,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryState {
    Pending,
    InProgress,
    Completed,
    Failed,
}
