//! Ledger record types

use serde::{Deserialize, Serialize};

/// One record of the tamper-evident ledger
///
/// `tx_ref` is the SHA-256 over the previous record's `tx_ref` and this
/// record's content, so altering any record breaks every later link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Transaction reference (hex SHA-256)
    pub tx_ref: String,
    /// Previous record's `tx_ref` ("genesis" for the first record)
    pub prev_ref: String,
    /// Position in the chain, starting at 1
    pub height: u64,
    pub order_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub schema: String,
    pub schema_version: u16,
    /// Hex SHA-256 of the payload bytes
    pub payload_hash: String,
    pub recorded_at: i64,
}

/// Ledger history of one order, in chain order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerHistoryResponse {
    pub order_id: String,
    pub entries: Vec<LedgerEntry>,
}
