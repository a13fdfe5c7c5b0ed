use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::check_error;
use crate::error::{CheckResult, ErrorKind};
use crate::types::TablePartition;

/// Internal state for [`CheckWorkerPool`].
#[derive(Debug)]
pub struct CheckWorkerPoolInner {
    /// Currently active check workers indexed by table partition.
    active: HashMap<TablePartition, AbortHandle>,
    /// Owns all spawned worker tasks.
    join_set: JoinSet<(TablePartition, CheckResult<()>)>,
}

impl CheckWorkerPoolInner {
    fn new() -> Self {
        Self {
            active: HashMap::new(),
            join_set: JoinSet::new(),
        }
    }

    /// Spawns and inserts a worker into the pool.
    ///
    /// If a worker for the partition already exists and is still running, logs
    /// a warning and skips insertion. Callers should check
    /// [`CheckWorkerPoolInner::has_active_worker`] before calling.
    pub fn spawn<F>(&mut self, task: TablePartition, future: F)
    where
        F: Future<Output = CheckResult<()>> + Send + 'static,
    {
        match self.active.entry(task.clone()) {
            Entry::Vacant(entry) => {
                let abort_handle = self.join_set.spawn(async move {
                    let result = future.await;
                    (task, result)
                });
                entry.insert(abort_handle);

                debug!("spawned check worker in pool");
            }
            Entry::Occupied(mut entry) => {
                if entry.get().is_finished() {
                    let abort_handle = self.join_set.spawn(async move {
                        let result = future.await;
                        (task, result)
                    });
                    entry.insert(abort_handle);

                    debug!("replaced finished check worker in pool");
                } else {
                    warn!(%task, "check worker already exists in pool and is still running");
                }
            }
        }
    }

    /// Checks if an active worker exists for the given table partition.
    pub fn has_active_worker(&self, task: &TablePartition) -> bool {
        self.active
            .get(task)
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Pool for managing the check workers of one pipeline.
///
/// [`CheckWorkerPool`] coordinates the parallel execution of per-partition
/// check tasks. Tasks are independent; a failing worker never stops its
/// siblings, and [`CheckWorkerPool::wait_all`] aggregates every failure into
/// one error.
#[derive(Debug, Clone)]
pub struct CheckWorkerPool {
    inner: Arc<Mutex<CheckWorkerPoolInner>>,
}

impl CheckWorkerPool {
    /// Creates a new empty check worker pool.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(CheckWorkerPoolInner::new())),
        }
    }

    /// Waits for all active check workers to complete.
    ///
    /// Blocks until every worker in the pool has finished. Worker errors are
    /// collected and returned as one aggregated error; panics are surfaced as
    /// [`ErrorKind::CheckWorkerPanic`].
    pub async fn wait_all(&self) -> CheckResult<()> {
        let mut errors = Vec::new();

        loop {
            let result = {
                let mut inner = self.inner.lock().await;
                inner.join_set.join_next().await
            };

            let Some(result) = result else {
                // JoinSet is empty, all workers have completed.
                break;
            };

            match result {
                Ok((task, worker_result)) => {
                    let mut inner = self.inner.lock().await;
                    inner.active.remove(&task);

                    if let Err(err) = worker_result {
                        error!(%task, error = %err, "check worker completed with error");
                        errors.push(err);
                    }
                }
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("check worker task was cancelled");
                    } else {
                        errors.push(check_error!(
                            ErrorKind::CheckWorkerPanic,
                            "Check worker panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        // Clean up any remaining entries in the active map (shouldn't happen
        // normally).
        {
            let mut inner = self.inner.lock().await;
            inner.active.clear();
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

impl Default for CheckWorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for CheckWorkerPool {
    type Target = Mutex<CheckWorkerPoolInner>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
