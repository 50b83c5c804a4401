//! Repository status aggregation (spec §4.8).

use crate::domain::{TaskState, TaskStatus};
use crate::models::{RepositoryState, RepositoryStatusSummary};

/// Applies the precedence rules over a repository's statuses and pending
/// task count. Newest `updated_at` wins within a precedence class.
pub fn summarize(statuses: &[TaskStatus], pending_task_count: i64) -> RepositoryStatusSummary {
    if let Some(failed) = latest_with_state(statuses, TaskState::Failed) {
        return RepositoryStatusSummary {
            state: RepositoryState::Failed,
            message: failed.error.clone().unwrap_or_default(),
            updated_at: failed.updated_at,
        };
    }

    if let Some(in_progress) = statuses
        .iter()
        .filter(|s| matches!(s.state, TaskState::InProgress | TaskState::Started))
        .max_by_key(|s| s.updated_at)
    {
        return RepositoryStatusSummary {
            state: RepositoryState::InProgress,
            message: in_progress.message.clone(),
            updated_at: in_progress.updated_at,
        };
    }

    if pending_task_count > 0 {
        return RepositoryStatusSummary {
            state: RepositoryState::InProgress,
            message: String::new(),
            updated_at: chrono::Utc::now(),
        };
    }

    if let Some(completed) = latest_with_state(statuses, TaskState::Completed) {
        return RepositoryStatusSummary {
            state: RepositoryState::Completed,
            message: completed.message.clone(),
            updated_at: completed.updated_at,
        };
    }

    RepositoryStatusSummary {
        state: RepositoryState::Pending,
        message: String::new(),
        updated_at: chrono::Utc::now(),
    }
}

fn latest_with_state(statuses: &[TaskStatus], state: TaskState) -> Option<&TaskStatus> {
    statuses
        .iter()
        .filter(|s| s.state == state)
        .max_by_key(|s| s.updated_at)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::operation;

    fn status(state: TaskState) -> TaskStatus {
        let now = Utc::now();
        let mut built = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, now);
        built = match state {
            TaskState::Completed => built.set_total(1, now).complete(now),
            TaskState::Failed => built.fail("boom", now),
            TaskState::InProgress => built.set_current(5, "", now),
            other => {
                let mut s = built;
                s.state = other;
                s
            }
        };
        built
    }

    #[test]
    fn failed_beats_everything() {
        let completed = status(TaskState::Completed);
        let failed = status(TaskState::Failed);
        let summary = summarize(&[completed, failed], 0);
        assert_eq!(summary.state, RepositoryState::Failed);
        assert_eq!(summary.message, "boom");
    }

    #[test]
    fn in_progress_when_no_failures_and_a_status_is_active() {
        let in_progress = status(TaskState::InProgress);
        let summary = summarize(&[in_progress], 0);
        assert_eq!(summary.state, RepositoryState::InProgress);
    }

    #[test]
    fn pending_tasks_imply_in_progress_even_with_only_terminal_statuses() {
        let completed = status(TaskState::Completed);
        let summary = summarize(&[completed], 3);
        assert_eq!(summary.state, RepositoryState::InProgress);
    }

    #[test]
    fn all_completed_with_no_pending_is_completed() {
        let completed = status(TaskState::Completed);
        let summary = summarize(&[completed], 0);
        assert_eq!(summary.state, RepositoryState::Completed);
    }

    #[test]
    fn no_statuses_and_no_pending_is_pending() {
        let summary = summarize(&[], 0);
        assert_eq!(summary.state, RepositoryState::Pending);
    }

    #[test]
    fn no_statuses_but_pending_tasks_is_in_progress() {
        let summary = summarize(&[], 4);
        assert_eq!(summary.state, RepositoryState::InProgress);
    }
}
