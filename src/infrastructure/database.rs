//! SQLite realizations of `TaskRepository` and `StatusRepository`.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Pool, Sqlite, SqlitePool};

use crate::config::DatabaseConfig;
use crate::domain::{Task, TaskStatus};
use crate::errors::{AppError, AppResult};
use crate::models::{TaskQuery, TaskRecord, TaskStatusRecord};

use super::{StatusRepository, TaskRepository};

/// Opens a pool against `config.url`, enabling WAL mode and the busy timeout
/// the teacher's configuration also carries, then runs embedded migrations.
pub async fn create_pool(config: &DatabaseConfig) -> AppResult<Pool<Sqlite>> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(config.busy_timeout_seconds))
        .disable_statement_logging();

    let pool = SqlitePool::connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub struct SqliteTaskRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTaskRepository {
    pub fn with_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn save(&self, task: &Task) -> AppResult<Task> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let existing = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, dedup_key, operation, payload, priority, created_at, updated_at \
             FROM tasks WHERE dedup_key = ?",
        )
        .bind(&task.dedup_key)
        .fetch_optional(&mut *tx)
        .await?;

        let saved = if let Some(existing) = existing {
            sqlx::query("UPDATE tasks SET priority = ?, updated_at = ? WHERE id = ?")
                .bind(task.priority)
                .bind(now)
                .bind(existing.id)
                .execute(&mut *tx)
                .await?;
            let mut merged = existing.to_domain()?;
            merged = merged.with_priority(task.priority, now);
            merged
        } else {
            let payload = serde_json::to_string(&task.payload())?;
            let id = sqlx::query(
                "INSERT INTO tasks (dedup_key, operation, payload, priority, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&task.dedup_key)
            .bind(&task.operation)
            .bind(&payload)
            .bind(task.priority)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            task.with_assigned_identity(id, now)
        };

        tx.commit().await?;
        Ok(saved)
    }

    async fn save_bulk(&self, tasks: &[Task]) -> AppResult<Vec<Task>> {
        let mut saved = Vec::with_capacity(tasks.len());
        for task in tasks {
            saved.push(self.save(task).await?);
        }
        Ok(saved)
    }

    async fn find(&self, query: &TaskQuery) -> AppResult<Vec<Task>> {
        let mut sql = String::from(
            "SELECT id, dedup_key, operation, payload, priority, created_at, updated_at FROM tasks WHERE 1=1",
        );
        if query.operation.is_some() {
            sql.push_str(" AND operation = ?");
        }
        if query.dedup_key.is_some() {
            sql.push_str(" AND dedup_key = ?");
        }
        sql.push_str(" ORDER BY");
        let mut order_clauses = Vec::new();
        if query.order_by_priority_desc {
            order_clauses.push("priority DESC");
        }
        if query.order_by_created_at_desc {
            order_clauses.push("created_at DESC");
        } else {
            order_clauses.push("created_at ASC");
        }
        sql.push(' ');
        sql.push_str(&order_clauses.join(", "));
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = query.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let mut q = sqlx::query_as::<_, TaskRecord>(&sql);
        if let Some(operation) = &query.operation {
            q = q.bind(operation);
        }
        if let Some(dedup_key) = &query.dedup_key {
            q = q.bind(dedup_key);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(TaskRecord::to_domain).collect()
    }

    async fn count(&self, query: &TaskQuery) -> AppResult<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM tasks WHERE 1=1");
        if query.operation.is_some() {
            sql.push_str(" AND operation = ?");
        }
        if query.dedup_key.is_some() {
            sql.push_str(" AND dedup_key = ?");
        }
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(operation) = &query.operation {
            q = q.bind(operation);
        }
        if let Some(dedup_key) = &query.dedup_key {
            q = q.bind(dedup_key);
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn get(&self, id: i64) -> AppResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, dedup_key, operation, payload, priority, created_at, updated_at \
             FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("task {id}")))?;
        record.to_domain()
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_query(&self, query: &TaskQuery) -> AppResult<u64> {
        let mut sql = String::from("DELETE FROM tasks WHERE 1=1");
        if query.operation.is_some() {
            sql.push_str(" AND operation = ?");
        }
        if query.dedup_key.is_some() {
            sql.push_str(" AND dedup_key = ?");
        }
        let mut q = sqlx::query(&sql);
        if let Some(operation) = &query.operation {
            q = q.bind(operation);
        }
        if let Some(dedup_key) = &query.dedup_key {
            q = q.bind(dedup_key);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    async fn dequeue(&self) -> AppResult<Option<Task>> {
        self.dequeue_where(None).await
    }

    async fn dequeue_by_operation(&self, operation: &str) -> AppResult<Option<Task>> {
        self.dequeue_where(Some(operation)).await
    }
}

impl SqliteTaskRepository {
    /// Single transaction: select the highest-priority row (ties broken by
    /// earliest `created_at`), delete it, commit. Serializable against
    /// concurrent `dequeue`/`save` because SQLite takes the writer lock for
    /// the transaction's duration.
    async fn dequeue_where(&self, operation: Option<&str>) -> AppResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let sql = if operation.is_some() {
            "SELECT id, dedup_key, operation, payload, priority, created_at, updated_at FROM tasks \
             WHERE operation = ? ORDER BY priority DESC, created_at ASC LIMIT 1"
        } else {
            "SELECT id, dedup_key, operation, payload, priority, created_at, updated_at FROM tasks \
             ORDER BY priority DESC, created_at ASC LIMIT 1"
        };

        let mut q = sqlx::query_as::<_, TaskRecord>(sql);
        if let Some(operation) = operation {
            q = q.bind(operation);
        }
        let record = q.fetch_optional(&mut *tx).await?;

        let Some(record) = record else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(record.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(record.to_domain()?))
    }
}

pub struct SqliteStatusRepository {
    pool: Pool<Sqlite>,
}

impl SqliteStatusRepository {
    pub fn with_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StatusRepository for SqliteStatusRepository {
    async fn save(&self, status: &TaskStatus) -> AppResult<()> {
        let record = TaskStatusRecord::from_domain(status);
        sqlx::query(
            "INSERT INTO task_status \
             (id, state, operation, message, trackable_id, trackable_type, parent_id, error, total, current, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             state = excluded.state, message = excluded.message, error = excluded.error, \
             total = excluded.total, current = excluded.current, updated_at = excluded.updated_at",
        )
        .bind(&record.id)
        .bind(&record.state)
        .bind(&record.operation)
        .bind(&record.message)
        .bind(record.trackable_id)
        .bind(&record.trackable_type)
        .bind(&record.parent_id)
        .bind(&record.error)
        .bind(record.total)
        .bind(record.current)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_bulk(&self, statuses: &[TaskStatus]) -> AppResult<()> {
        for status in root_first(statuses) {
            self.save(status).await?;
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<TaskStatus>> {
        let record = sqlx::query_as::<_, TaskStatusRecord>(
            "SELECT id, state, operation, message, trackable_id, trackable_type, parent_id, error, total, current, created_at, updated_at \
             FROM task_status WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn list_by_trackable(&self, trackable_type: &str, trackable_id: i64) -> AppResult<Vec<TaskStatus>> {
        let records = sqlx::query_as::<_, TaskStatusRecord>(
            "SELECT id, state, operation, message, trackable_id, trackable_type, parent_id, error, total, current, created_at, updated_at \
             FROM task_status WHERE trackable_type = ? AND trackable_id = ?",
        )
        .bind(trackable_type)
        .bind(trackable_id)
        .fetch_all(&self.pool)
        .await?;
        records.iter().map(TaskStatusRecord::to_domain).collect()
    }
}

/// Orders a status batch so that every status appears after its parent,
/// satisfying the `parent_id` foreign key on insert.
fn root_first(statuses: &[TaskStatus]) -> Vec<&TaskStatus> {
    let by_id: HashMap<&str, &TaskStatus> = statuses.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut ordered = Vec::with_capacity(statuses.len());
    let mut seen = std::collections::HashSet::new();

    fn visit<'a>(
        status: &'a TaskStatus,
        by_id: &HashMap<&str, &'a TaskStatus>,
        seen: &mut std::collections::HashSet<&'a str>,
        ordered: &mut Vec<&'a TaskStatus>,
    ) {
        if !seen.insert(status.id.as_str()) {
            return;
        }
        if let Some(parent_id) = status.parent_id.as_deref() {
            if let Some(parent) = by_id.get(parent_id) {
                visit(parent, by_id, seen, ordered);
            }
        }
        ordered.push(status);
    }

    for status in statuses {
        visit(status, &by_id, &mut seen, &mut ordered);
    }
    ordered
}
