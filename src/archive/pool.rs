//! Bounded worker pool
//!
//! `submit` waits for one of `capacity` slots, then runs the task on the
//! runtime. A slot is held by the spawned task and released when it ends,
//! whether it returns `Ok`, returns `Err` or panics. Task errors and panics
//! are logged here and never reach the submitter.

use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::task::TaskTracker;

/// Errors raised when a task cannot be scheduled
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No worker became free within {0:?}")]
    ScheduleTimeout(Duration),

    #[error("Worker pool is closed")]
    Closed,
}

/// Fixed-capacity task scheduler
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            tracker: TaskTracker::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits for a free slot, then runs `task` in the background
    pub async fn submit<F, E>(&self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;
        self.spawn(permit, task);
        Ok(())
    }

    /// Like [`submit`](Self::submit), but gives up after `timeout`
    pub async fn submit_with_timeout<F, E>(&self, task: F, timeout: Duration) -> Result<(), PoolError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let permit = tokio::time::timeout(timeout, Arc::clone(&self.slots).acquire_owned())
            .await
            .map_err(|_| PoolError::ScheduleTimeout(timeout))?
            .map_err(|_| PoolError::Closed)?;
        self.spawn(permit, task);
        Ok(())
    }

    fn spawn<F, E>(&self, permit: OwnedSemaphorePermit, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tracker.spawn(async move {
            let _permit = permit;
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Worker task failed: {}", e),
                Err(panic) => tracing::error!("Worker task panicked: {}", panic_message(&*panic)),
            }
        });
    }

    /// Waits until every submitted task has finished
    ///
    /// No task can be submitted once this is called.
    pub async fn wait(&self) {
        self.tracker.close();
        self.slots.close();
        self.tracker.wait().await;
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
