//! Background task supervision
//!
//! The dispatch server runs two long-lived tasks next to the HTTP listener:
//!
//! | name | kind | role |
//! |------|------|------|
//! | ledger_worker | [`TaskKind::Worker`] | drains the ledger write-behind queue |
//! | ledger_auditor | [`TaskKind::Periodic`] | periodic hash-chain audit (optional) |
//!
//! Rematch-on-rejection is not supervised here: it is a one-shot
//! `tokio::spawn` owned by the orders manager.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Consumes a queue until shutdown
    Worker,
    /// Wakes up on a fixed interval
    Periodic,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Worker => "worker",
            TaskKind::Periodic => "periodic",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct SupervisedTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Supervisor for the server's long-lived tasks
///
/// Every task shares one [`CancellationToken`]; a task that returns before
/// the token fires, or panics, counts as stopped and turns `/health` into
/// `degraded`.
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("ledger_worker", TaskKind::Worker, worker.run(rx, token));
///
/// tasks.shutdown(config.shutdown_timeout()).await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<SupervisedTask>,
    shutdown: CancellationToken,
}

/// Best-effort text of a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `future` to completion and log how it ended
async fn supervise<F>(name: &'static str, kind: TaskKind, shutdown: CancellationToken, future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(()) if shutdown.is_cancelled() => {
            tracing::debug!(task = name, %kind, "Background task stopped");
        }
        Ok(()) => {
            tracing::warn!(task = name, %kind, "Background task exited before shutdown");
        }
        Err(payload) => {
            tracing::error!(
                task = name,
                %kind,
                panic = %panic_message(payload.as_ref()),
                "Background task panicked"
            );
        }
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token the tasks watch for shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(supervise(name, kind, self.shutdown.clone(), future));
        tracing::debug!(task = name, %kind, "Background task spawned");
        self.tasks.push(SupervisedTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name).collect();
        tracing::info!(count = self.tasks.len(), tasks = ?names, "Background tasks running");
    }

    /// Names of tasks that are no longer running
    pub fn stopped(&self) -> Vec<&'static str> {
        self.tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.name)
            .collect()
    }

    /// Number of tasks that are no longer running
    pub fn check_health(&self) -> usize {
        let stopped = self.stopped();
        for name in &stopped {
            tracing::error!(task = name, "Background task is not running");
        }
        stopped.len()
    }

    /// Cancel every task and wait for them in parallel
    ///
    /// Tasks still running after `timeout` are aborted.
    pub async fn shutdown(self, timeout: Duration) {
        tracing::info!(count = self.tasks.len(), "Stopping background tasks");
        self.shutdown.cancel();

        let waits = self.tasks.into_iter().map(|task| async move {
            let abort = task.handle.abort_handle();
            match tokio::time::timeout(timeout, task.handle).await {
                Ok(_) => tracing::debug!(task = task.name, kind = %task.kind, "Task joined"),
                Err(_) => {
                    tracing::warn!(task = task.name, "Task did not stop in time, aborting");
                    abort.abort();
                }
            }
        });
        futures::future::join_all(waits).await;

        tracing::info!("Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}
