//! Worker runtime (spec §4.4): polling loop, handler dispatch, graceful
//! shutdown, non-retrying failure semantics.

pub mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::errors::AppResult;
use crate::infrastructure::DynTaskRepository;
use crate::utils::StructuredLogger;

pub use registry::{Handler, HandlerRegistry};

pub struct Worker {
    task_repository: DynTaskRepository,
    registry: Arc<HandlerRegistry>,
    logger: StructuredLogger,
    poll_interval: Duration,
    stopping: AtomicBool,
    handler_idle: Notify,
    currently_processing: AtomicBool,
}

impl Worker {
    pub fn new(
        task_repository: DynTaskRepository,
        registry: Arc<HandlerRegistry>,
        logger: StructuredLogger,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            task_repository,
            registry,
            logger,
            poll_interval,
            stopping: AtomicBool::new(false),
            handler_idle: Notify::new(),
            currently_processing: AtomicBool::new(false),
        })
    }

    /// Dequeues one task; if none, returns `Ok(false)`. Looks up the
    /// handler for its operation and invokes it. The task has already been
    /// removed by `dequeue` regardless of handler outcome — failures are not
    /// retried. Only repository errors surface as an `Err`; handler errors
    /// are logged and swallowed. An unregistered operation is a silent
    /// success.
    pub async fn process_one(&self) -> AppResult<bool> {
        let Some(task) = self.task_repository.dequeue().await? else {
            return Ok(false);
        };

        self.currently_processing.store(true, Ordering::SeqCst);
        self.logger.log_task_dequeued(task.id, &task.operation);

        match self.registry.get(&task.operation).await {
            Some(handler) => {
                if let Err(err) = handler.execute(&task.payload()).await {
                    self.logger.log_handler_error(task.id, &task.operation, &err.to_string());
                }
            }
            None => {
                self.logger.log_unregistered_operation(&task.operation);
            }
        }

        self.currently_processing.store(false, Ordering::SeqCst);
        // notify_one, not notify_waiters: it stores a permit when stop() hasn't
        // registered its `notified()` future yet, so the wakeup can't be lost
        // to the race between stop()'s flag check and its wait registration.
        self.handler_idle.notify_one();
        Ok(true)
    }

    /// Launches a background loop that repeatedly calls `process_one`; when
    /// the queue is empty, sleeps for the poll interval before retrying.
    /// Stop signals are observed at loop head and at sleep wake-up; a
    /// running handler is never interrupted.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            loop {
                if worker.stopping.load(Ordering::SeqCst) {
                    break;
                }

                match worker.process_one().await {
                    Ok(true) => continue,
                    Ok(false) => tokio::time::sleep(worker.poll_interval).await,
                    Err(err) => {
                        tracing::error!(error = %err, "worker repository error; backing off");
                        tokio::time::sleep(worker.poll_interval).await;
                    }
                }

                if worker.stopping.load(Ordering::SeqCst) {
                    break;
                }
            }
        })
    }

    /// Signals the loop to exit and blocks until the currently executing
    /// handler returns. `stop` does not cancel the in-flight handler.
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        while self.currently_processing.load(Ordering::SeqCst) {
            self.handler_idle.notified().await;
        }
    }
}
