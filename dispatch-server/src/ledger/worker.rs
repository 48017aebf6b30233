//! Ledger write-behind queue
//!
//! `LedgerService::submit` enqueues the post-commit snapshot and returns
//! immediately. `LedgerWorker` consumes the queue in FIFO order, so the
//! reference stored on the order always belongs to the newest snapshot that
//! was recorded. Failures are logged and dropped; nothing is retried.

use super::LedgerRecorder;
use crate::orders::storage::OrderStorage;
use shared::order::{OpaquePayload, Order, OrderSnapshotPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// One snapshot waiting to be recorded
#[derive(Debug, Clone)]
pub struct LedgerJob {
    pub order_id: String,
    pub user_id: String,
    pub provider_id: Option<String>,
    pub snapshot: OpaquePayload,
}

impl LedgerJob {
    pub fn from_order(order: &Order) -> Result<Self, shared::order::PayloadError> {
        Ok(Self {
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            provider_id: order.provider_id.clone(),
            snapshot: OpaquePayload::encode(&OrderSnapshotPayload::from_order(order))?,
        })
    }
}

/// Sending side of the write-behind queue
#[derive(Clone, Debug)]
pub struct LedgerService {
    tx: mpsc::Sender<LedgerJob>,
}

impl LedgerService {
    /// Create the service and the receiver for its worker
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LedgerJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a snapshot of `order`; never blocks, never fails the caller
    pub fn submit(&self, order: &Order) {
        let job = match LedgerJob::from_order(order) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Failed to encode ledger snapshot");
                return;
            }
        };

        match self.tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                tracing::warn!(
                    order_id = %job.order_id,
                    "Ledger queue full, snapshot dropped"
                );
            }
            Err(TrySendError::Closed(job)) => {
                tracing::warn!(
                    order_id = %job.order_id,
                    "Ledger worker stopped, snapshot dropped"
                );
            }
        }
    }
}

/// Background consumer of the ledger queue
///
/// Records queued snapshots and stores the returned reference on the order.
pub struct LedgerWorker {
    recorder: Arc<dyn LedgerRecorder>,
    storage: OrderStorage,
}

impl LedgerWorker {
    pub fn new(recorder: Arc<dyn LedgerRecorder>, storage: OrderStorage) -> Self {
        Self { recorder, storage }
    }

    /// Run until the channel closes or shutdown is signalled
    ///
    /// On shutdown the queue stops accepting jobs and whatever is already
    /// queued is still recorded.
    pub async fn run(self, mut rx: mpsc::Receiver<LedgerJob>, shutdown: CancellationToken) {
        tracing::info!("📒 Ledger write-behind worker started");

        loop {
            tokio::select! {
                job = rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => {
                        tracing::info!("Ledger channel closed, worker stopping");
                        return;
                    }
                },
                _ = shutdown.cancelled() => break,
            }
        }

        rx.close();
        let mut drained = 0usize;
        while let Some(job) = rx.recv().await {
            self.process(job).await;
            drained += 1;
        }
        tracing::info!(drained, "Ledger worker stopped");
    }

    async fn process(&self, job: LedgerJob) {
        let tx_ref = match self
            .recorder
            .record(
                &job.order_id,
                &job.user_id,
                job.provider_id.as_deref(),
                &job.snapshot,
            )
            .await
        {
            Ok(tx_ref) => tx_ref,
            Err(e) => {
                tracing::warn!(order_id = %job.order_id, error = %e, "Ledger record failed");
                return;
            }
        };

        match self.storage.set_ledger_ref(&job.order_id, &tx_ref) {
            Ok(_) => {
                tracing::debug!(order_id = %job.order_id, tx_ref = %tx_ref, "Ledger reference stored");
            }
            Err(e) => {
                tracing::error!(
                    order_id = %job.order_id,
                    tx_ref = %tx_ref,
                    error = %e,
                    "Failed to store ledger reference"
                );
            }
        }
    }
}
