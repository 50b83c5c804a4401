//! Application façade over the task repository (spec §4.2).

use crate::domain::{Payload, Task};
use crate::errors::AppResult;
use crate::infrastructure::DynTaskRepository;
use crate::models::TaskQuery;
use crate::utils::StructuredLogger;

#[derive(Clone)]
pub struct QueueService {
    task_repository: DynTaskRepository,
    logger: StructuredLogger,
}

impl QueueService {
    pub fn new(task_repository: DynTaskRepository, logger: StructuredLogger) -> Self {
        Self {
            task_repository,
            logger,
        }
    }

    pub async fn enqueue(&self, task: Task) -> AppResult<Task> {
        let saved = self.task_repository.save(&task).await?;
        self.logger
            .log_task_enqueued(&saved.dedup_key, &saved.operation, saved.priority);
        Ok(saved)
    }

    /// Queues `ops` sharing one payload, assigning a descending priority
    /// staircase so dequeue order matches list order. Step size 10 reserves
    /// room for later insertions between adjacent operations in the same
    /// band. If any `enqueue` fails, the error is returned immediately and
    /// already-queued operations are left in place (no rollback).
    pub async fn enqueue_operations(
        &self,
        ops: &[&str],
        base_priority: i64,
        payload: Payload,
    ) -> AppResult<Vec<Task>> {
        let len = ops.len() as i64;
        let mut saved = Vec::with_capacity(ops.len());
        for (index, op) in ops.iter().enumerate() {
            let priority = base_priority + 10 * (len - index as i64);
            let task = Task::new(*op, priority, payload.clone());
            saved.push(self.enqueue(task).await?);
        }
        Ok(saved)
    }

    pub async fn list(&self, operation: Option<&str>) -> AppResult<Vec<Task>> {
        let mut query = TaskQuery::new()
            .order_desc("priority")
            .order_desc("created_at");
        if let Some(operation) = operation {
            query = query.with_operation(operation);
        }
        self.task_repository.find(&query).await
    }

    pub async fn task_by_dedup_key(&self, key: &str) -> AppResult<Option<Task>> {
        let query = TaskQuery::new().with_dedup_key(key);
        let mut results = self.task_repository.find(&query).await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.remove(0))
        })
    }

    pub async fn pending_count(&self) -> AppResult<i64> {
        self.task_repository.count(&TaskQuery::new()).await
    }

    pub async fn pending_count_by_operation(&self, operation: &str) -> AppResult<i64> {
        let query = TaskQuery::new().with_operation(operation);
        self.task_repository.count(&query).await
    }
}
