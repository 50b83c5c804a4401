//! Status persistence reporter (spec §4.7).

use async_trait::async_trait;

use crate::domain::TaskStatus;
use crate::errors::AppResult;
use crate::infrastructure::DynStatusRepository;

use super::tracker::ProgressReporter;

/// Persists every status change it is notified of. `on_change` saves a
/// single row and does not walk the parent chain — parent-before-child
/// ordering for the live path is guaranteed by `ProgressTracker::child`,
/// which notifies subscribers of the parent status before a child tracker
/// is ever handed out. `save_bulk` separately sorts root-first for batches
/// with no such guarantee, e.g. initial population.
pub struct PersistenceReporter {
    status_repository: DynStatusRepository,
}

impl PersistenceReporter {
    pub fn new(status_repository: DynStatusRepository) -> Self {
        Self { status_repository }
    }

    pub async fn save_bulk(&self, statuses: &[TaskStatus]) -> AppResult<()> {
        self.status_repository.save_bulk(statuses).await
    }
}

#[async_trait]
impl ProgressReporter for PersistenceReporter {
    async fn on_change(&self, status: &TaskStatus) -> AppResult<()> {
        self.status_repository.save(status).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::domain::operation;
    use crate::infrastructure::StatusRepository;

    #[derive(Default)]
    struct MockStatusRepository {
        rows: Mutex<HashMap<String, TaskStatus>>,
    }

    #[async_trait]
    impl StatusRepository for MockStatusRepository {
        async fn save(&self, status: &TaskStatus) -> AppResult<()> {
            self.rows.lock().unwrap().insert(status.id.clone(), status.clone());
            Ok(())
        }

        async fn save_bulk(&self, statuses: &[TaskStatus]) -> AppResult<()> {
            for status in statuses {
                self.save(status).await?;
            }
            Ok(())
        }

        async fn get(&self, id: &str) -> AppResult<Option<TaskStatus>> {
            Ok(self.rows.lock().unwrap().get(id).cloned())
        }

        async fn list_by_trackable(&self, _trackable_type: &str, _trackable_id: i64) -> AppResult<Vec<TaskStatus>> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }
    }

    #[tokio::test]
    async fn on_change_persists_the_status() {
        let repo = std::sync::Arc::new(MockStatusRepository::default());
        let reporter = PersistenceReporter::new(repo.clone());

        let status = TaskStatus::new(operation::SCAN_COMMIT, "repository", 1, Utc::now());
        reporter.on_change(&status).await.unwrap();

        assert!(repo.get(&status.id).await.unwrap().is_some());
    }
}
