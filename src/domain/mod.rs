//! Domain model: operations, tasks, and progress status.
//!
//! This module holds kodit's core value objects. Nothing here talks to a
//! database or a clock source directly — persistence is the job of
//! `infrastructure`, and every timestamp is either supplied by a caller or
//! stamped by a repository at the moment of persistence.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Handler-specific arguments carried verbatim by a [`Task`].
///
/// Represented as a JSON object so it can round-trip through storage without
/// a fixed schema. Every accessor that hands one of these to a caller returns
/// an owned clone — see the "payload copy discipline" note on [`Task::payload`].
pub type Payload = HashMap<String, Value>;

/// Operation namespace helpers.
///
/// Operations are drawn from a closed, hierarchically named set using the
/// `kodit.<entity>.<action>` convention. The bare prefixes `kodit.repository`
/// and `kodit.commit` are themselves operations — hierarchy anchors — and
/// deliberately do not satisfy the category predicates below.
pub mod operation {
    const REPOSITORY_PREFIX: &str = "kodit.repository.";
    const COMMIT_PREFIX: &str = "kodit.commit.";

    /// `true` iff `name` starts with `kodit.repository.` (the bare root does not count).
    pub fn is_repository_operation(name: &str) -> bool {
        name.starts_with(REPOSITORY_PREFIX)
    }

    /// `true` iff `name` starts with `kodit.commit.` (the bare root does not count).
    pub fn is_commit_operation(name: &str) -> bool {
        name.starts_with(COMMIT_PREFIX)
    }

    pub const CLONE_REPOSITORY: &str = "kodit.repository.clone_repository";
    pub const SYNC_REPOSITORY: &str = "kodit.repository.sync_repository";

    pub const SCAN_COMMIT: &str = "kodit.commit.scan_commit";
    pub const EXTRACT_SNIPPETS: &str = "kodit.commit.extract_snippets";
    pub const EXTRACT_EXAMPLES: &str = "kodit.commit.extract_examples";
    pub const CREATE_BM25_INDEX: &str = "kodit.commit.create_bm25_index";
    pub const CREATE_CODE_EMBEDDINGS: &str = "kodit.commit.create_code_embeddings";
    pub const CREATE_EXAMPLE_CODE_EMBEDDINGS: &str = "kodit.commit.create_example_code_embeddings";
    pub const CREATE_SUMMARY_ENRICHMENT: &str = "kodit.commit.create_summary_enrichment";
    pub const CREATE_EXAMPLE_SUMMARY: &str = "kodit.commit.create_example_summary";
    pub const CREATE_SUMMARY_EMBEDDINGS: &str = "kodit.commit.create_summary_embeddings";
    pub const CREATE_EXAMPLE_SUMMARY_EMBEDDINGS: &str =
        "kodit.commit.create_example_summary_embeddings";
    pub const CREATE_ARCHITECTURE_ENRICHMENT: &str = "kodit.commit.create_architecture_enrichment";
    pub const CREATE_PUBLIC_API_DOCS: &str = "kodit.commit.create_public_api_docs";
    pub const CREATE_COMMIT_DESCRIPTION: &str = "kodit.commit.create_commit_description";
    pub const CREATE_DATABASE_SCHEMA: &str = "kodit.commit.create_database_schema";
    pub const CREATE_COOKBOOK: &str = "kodit.commit.create_cookbook";
}

/// Priority bands, ordered `Background < Normal < UserInitiated`.
///
/// The concrete integers are implementation-chosen but must keep enough
/// headroom that the 15-step pipeline staircase (max per-task offset of 150,
/// see `services::queue`) never crosses a band boundary, and that
/// `UserInitiated > Background + 150` always holds.
pub mod priority {
    pub const BACKGROUND: i64 = 0;
    pub const NORMAL: i64 = 1_000;
    pub const USER_INITIATED: i64 = 2_000;
}

/// A unit of queued work.
///
/// `Task` is a value object: there is no in-place mutation after
/// construction. The repository is responsible for assigning `id` and
/// stamping `created_at`/`updated_at`; a `Task` built by a caller always has
/// `id == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub dedup_key: String,
    pub operation: String,
    pub priority: i64,
    payload: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a new, unpersisted task. `id`, `created_at`, and `updated_at`
    /// are placeholders until a repository assigns real values.
    ///
    /// `payload` is defensively copied so that later mutation of the
    /// caller's map cannot reach back into the task.
    pub fn new(operation: impl Into<String>, priority: i64, payload: Payload) -> Self {
        let operation = operation.into();
        let dedup_key = derive_dedup_key(&operation, &payload);
        Self {
            id: 0,
            dedup_key,
            operation,
            priority,
            payload,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Returns an owned copy of the payload. Never hands out a reference into
    /// `self` — mutating the returned map must not affect this task.
    pub fn payload(&self) -> Payload {
        self.payload.clone()
    }

    /// Produces a new value with `priority` and `updated_at` replaced,
    /// leaving `id`, `created_at`, and `payload` untouched. Used by
    /// repositories to realize the dedup-upsert semantics of §3.2.
    pub fn with_priority(&self, priority: i64, updated_at: DateTime<Utc>) -> Self {
        Self {
            priority,
            updated_at,
            ..self.clone()
        }
    }

    /// Produces a new value stamped with a freshly assigned id and
    /// timestamps, used by repositories on first insert.
    pub fn with_assigned_identity(&self, id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// `dedup_key = "<operation>:<selector>"`, selector chosen from the payload
/// in order: `repository_id`, then `commit_sha`, then `<nil>`.
pub fn derive_dedup_key(operation: &str, payload: &Payload) -> String {
    let selector = payload
        .get("repository_id")
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .or_else(|| {
            payload
                .get("commit_sha")
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "<nil>".to_string());
    format!("{operation}:{selector}")
}

/// Lifecycle state of a [`TaskStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Started,
    InProgress,
    Skipped,
    Failed,
    Completed,
}

impl TaskState {
    /// Terminal states are sticky: once reached, further transitions are no-ops.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Skipped
        )
    }
}

/// A hierarchical progress record for one in-flight operation.
///
/// Every mutation method (`set_total`, `set_current`, `skip`, `fail`,
/// `complete`) returns a new value; the receiver is left unchanged, matching
/// §3.4's "status values are immutable" invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: String,
    pub state: TaskState,
    pub operation: String,
    pub message: String,
    pub error: Option<String>,
    pub total: i64,
    pub current: i64,
    pub trackable_type: String,
    pub trackable_id: i64,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    /// Builds a freshly `started` status. `id` is derived from
    /// `trackable_type`, `trackable_id`, and `operation`, omitting any empty
    /// component, e.g. `"repository-7-kodit.repository.clone_repository"`.
    pub fn new(
        operation: impl Into<String>,
        trackable_type: impl Into<String>,
        trackable_id: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let operation = operation.into();
        let trackable_type = trackable_type.into();
        let id = build_status_id(&trackable_type, trackable_id, &operation);
        Self {
            id,
            state: TaskState::Started,
            operation,
            message: String::new(),
            error: None,
            total: 0,
            current: 0,
            trackable_type,
            trackable_id,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `CompletionPercent = clamp(current/total * 100, 0, 100)`; 0 when `total == 0`.
    pub fn completion_percent(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        let pct = (self.current as f64 / self.total as f64) * 100.0;
        pct.clamp(0.0, 100.0)
    }

    fn transition(&self, now: DateTime<Utc>, f: impl FnOnce(&mut TaskStatus)) -> TaskStatus {
        let mut next = self.clone();
        if self.state.is_terminal() {
            return next;
        }
        f(&mut next);
        next.updated_at = now;
        next
    }

    pub fn set_total(&self, total: i64, now: DateTime<Utc>) -> TaskStatus {
        self.transition(now, |s| s.total = total)
    }

    /// Sets `current` and `message`; moves `started` to `in_progress` once `current > 0`.
    pub fn set_current(&self, current: i64, message: impl Into<String>, now: DateTime<Utc>) -> TaskStatus {
        self.transition(now, |s| {
            s.current = current;
            s.message = message.into();
            if current > 0 && s.state == TaskState::Started {
                s.state = TaskState::InProgress;
            }
        })
    }

    pub fn skip(&self, message: impl Into<String>, now: DateTime<Utc>) -> TaskStatus {
        self.transition(now, |s| {
            s.state = TaskState::Skipped;
            s.message = message.into();
        })
    }

    pub fn fail(&self, error: impl Into<String>, now: DateTime<Utc>) -> TaskStatus {
        self.transition(now, |s| {
            s.state = TaskState::Failed;
            s.error = Some(error.into());
        })
    }

    /// Sets `current = total` so completion always reports 100%.
    pub fn complete(&self, now: DateTime<Utc>) -> TaskStatus {
        self.transition(now, |s| {
            s.state = TaskState::Completed;
            s.current = s.total;
        })
    }

    /// Builds a child status: the same `trackable_type`/`trackable_id`, this
    /// status as parent, a fresh `id` for the child operation.
    pub fn child(&self, operation: impl Into<String>, now: DateTime<Utc>) -> TaskStatus {
        let operation = operation.into();
        let id = build_status_id(&self.trackable_type, self.trackable_id, &operation);
        TaskStatus {
            id,
            state: TaskState::Started,
            operation,
            message: String::new(),
            error: None,
            total: 0,
            current: 0,
            trackable_type: self.trackable_type.clone(),
            trackable_id: self.trackable_id,
            parent_id: Some(self.id.clone()),
            created_at: now,
            updated_at: now,
        }
    }
}

fn build_status_id(trackable_type: &str, trackable_id: i64, operation: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    if !trackable_type.is_empty() {
        parts.push(trackable_type.to_string());
    }
    if trackable_id != 0 {
        parts.push(trackable_id.to_string());
    }
    if !operation.is_empty() {
        parts.push(operation.to_string());
    }
    parts.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_prefers_repository_id_over_commit_sha() {
        let mut payload = Payload::new();
        payload.insert("repository_id".into(), Value::from(7));
        payload.insert("commit_sha".into(), Value::from("abc"));
        assert_eq!(
            derive_dedup_key("kodit.repository.clone_repository", &payload),
            "kodit.repository.clone_repository:7"
        );
    }

    #[test]
    fn dedup_key_falls_back_to_nil() {
        let payload = Payload::new();
        assert_eq!(derive_dedup_key("kodit.repository.sync_repository", &payload), "kodit.repository.sync_repository:<nil>");
    }

    #[test]
    fn category_predicates_reject_bare_roots() {
        assert!(!operation::is_repository_operation("kodit.repository"));
        assert!(!operation::is_commit_operation("kodit.commit"));
        assert!(operation::is_repository_operation("kodit.repository.clone_repository"));
        assert!(operation::is_commit_operation("kodit.commit.scan_commit"));
    }

    #[test]
    fn payload_is_copied_on_construction_and_read() {
        let mut payload = Payload::new();
        payload.insert("repository_id".into(), Value::from(1));
        let task = Task::new(operation::CLONE_REPOSITORY, priority::NORMAL, payload.clone());

        payload.insert("repository_id".into(), Value::from(2));
        assert_eq!(task.payload().get("repository_id"), Some(&Value::from(1)));

        let mut read_back = task.payload();
        read_back.insert("repository_id".into(), Value::from(99));
        assert_eq!(task.payload().get("repository_id"), Some(&Value::from(1)));
    }

    #[test]
    fn complete_sets_current_to_total_and_is_terminal() {
        let now = Utc::now();
        let status = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now)
            .set_total(10, now)
            .complete(now);
        assert_eq!(status.current, status.total);
        assert_eq!(status.completion_percent(), 100.0);
        assert!(status.state.is_terminal());
    }

    #[test]
    fn terminal_state_is_sticky() {
        let now = Utc::now();
        let failed = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now).fail("boom", now);
        let still_failed = failed.complete(now);
        assert_eq!(still_failed.state, TaskState::Failed);
        assert_eq!(still_failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn transition_methods_leave_source_unchanged() {
        let now = Utc::now();
        let original = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now);
        let _ = original.set_current(5, "scanning", now);
        assert_eq!(original.state, TaskState::Started);
        assert_eq!(original.current, 0);
    }

    #[test]
    fn completion_percent_clamps_and_defaults_to_zero() {
        let now = Utc::now();
        let status = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now);
        assert_eq!(status.completion_percent(), 0.0);
        let over = status.set_total(10, now).set_current(50, "", now);
        assert_eq!(over.completion_percent(), 100.0);
    }
}
