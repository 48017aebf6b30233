//! Ledger Recorder
//!
//! Tamper-evident record of order snapshots, written behind the primary store.
//!
//! - [`LedgerRecorder`]: the contract the engine depends on
//! - [`HashChainLedger`]: embedded SHA-256 hash chain on redb
//! - [`LedgerService`] / [`LedgerWorker`]: bounded write-behind queue and its consumer
//! - [`LedgerAuditor`]: periodic whole-chain verification

mod audit;
mod hash_chain;
mod worker;

pub use audit::LedgerAuditor;
pub use hash_chain::{BreakKind, ChainBreak, ChainVerification, HashChainLedger};
pub use worker::{LedgerJob, LedgerService, LedgerWorker};

use async_trait::async_trait;
use shared::ledger::LedgerEntry;
use shared::order::OpaquePayload;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger contract
#[async_trait]
pub trait LedgerRecorder: Send + Sync {
    /// Record a snapshot, returning its transaction reference
    async fn record(
        &self,
        order_id: &str,
        user_id: &str,
        provider_id: Option<&str>,
        snapshot: &OpaquePayload,
    ) -> LedgerResult<String>;

    /// Whether `tx_ref` is an intact record of `order_id`
    async fn verify(&self, order_id: &str, tx_ref: &str) -> LedgerResult<bool>;

    /// Every record of `order_id`, in chain order
    async fn history(&self, order_id: &str) -> LedgerResult<Vec<LedgerEntry>>;
}
