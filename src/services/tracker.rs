//! Progress tracker (spec §4.6): wraps one `TaskStatus`, notifies
//! subscribers synchronously on every mutation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::TaskStatus;
use crate::utils::StructuredLogger;

/// A subscriber to tracker state changes (spec's "reporter").
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn on_change(&self, status: &TaskStatus) -> crate::errors::AppResult<()>;
}

pub type DynProgressReporter = Arc<dyn ProgressReporter>;

/// Mutex-protected status plus a subscriber list, snapshot-copied into every
/// child tracker at creation time (spec §5).
pub struct ProgressTracker {
    status: Mutex<TaskStatus>,
    subscribers: Mutex<Vec<DynProgressReporter>>,
    logger: StructuredLogger,
}

impl ProgressTracker {
    pub fn new(status: TaskStatus, logger: StructuredLogger) -> Self {
        Self {
            status: Mutex::new(status),
            subscribers: Mutex::new(Vec::new()),
            logger,
        }
    }

    pub async fn status(&self) -> TaskStatus {
        self.status.lock().await.clone()
    }

    /// Idempotent-append: the same `Arc` pointer is not added twice.
    pub async fn subscribe(&self, reporter: DynProgressReporter) {
        let mut subscribers = self.subscribers.lock().await;
        if !subscribers.iter().any(|existing| Arc::ptr_eq(existing, &reporter)) {
            subscribers.push(reporter);
        }
    }

    pub async fn set_total(&self, total: i64) {
        let next = self.status.lock().await.set_total(total, Utc::now());
        self.apply_and_notify(next).await;
    }

    pub async fn set_current(&self, current: i64, message: impl Into<String> + Send) {
        let next = self.status.lock().await.set_current(current, message, Utc::now());
        self.apply_and_notify(next).await;
    }

    pub async fn skip(&self, message: impl Into<String> + Send) {
        let next = self.status.lock().await.skip(message, Utc::now());
        self.apply_and_notify(next).await;
    }

    pub async fn fail(&self, error: impl Into<String> + Send) {
        let next = self.status.lock().await.fail(error, Utc::now());
        self.apply_and_notify(next).await;
    }

    pub async fn complete(&self) {
        let next = self.status.lock().await.complete(Utc::now());
        self.apply_and_notify(next).await;
    }

    /// Re-emits the current status without a state change.
    pub async fn notify(&self) {
        let current = self.status().await;
        self.broadcast(&current).await;
    }

    /// Produces a tracker whose status has this tracker's status as parent,
    /// inheriting `trackable_type`/`trackable_id` and a snapshot of the
    /// current subscriber list. Child trackers propagate only through those
    /// shared subscribers; there is no automatic parent rollup.
    ///
    /// Persists the parent status to subscribers before returning, so a
    /// `StatusRepository::save` of the child never races its parent's first
    /// write — `save` does not walk the parent chain itself (spec §4.7).
    pub async fn child(&self, operation: impl Into<String>) -> ProgressTracker {
        self.notify().await;
        let parent_status = self.status().await;
        let child_status = parent_status.child(operation, Utc::now());
        let subscribers = self.subscribers.lock().await.clone();
        ProgressTracker {
            status: Mutex::new(child_status),
            subscribers: Mutex::new(subscribers),
            logger: self.logger.clone(),
        }
    }

    async fn apply_and_notify(&self, next: TaskStatus) {
        {
            let mut status = self.status.lock().await;
            *status = next.clone();
        }
        self.logger.log_status_transition(&next.id, &next.state.to_string());
        self.broadcast(&next).await;
    }

    /// Best-effort broadcast: if one subscriber errors, log it and continue
    /// notifying the rest.
    async fn broadcast(&self, status: &TaskStatus) {
        let subscribers = self.subscribers.lock().await.clone();
        for subscriber in subscribers {
            if let Err(err) = subscriber.on_change(status).await {
                self.logger.log_reporter_error(&status.id, &err.to_string());
            }
        }
    }
}
