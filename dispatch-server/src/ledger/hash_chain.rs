//! Hash-chain ledger on redb
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `ledger_entries` | `height` | `LedgerEntry` (JSON) | The chain |
//! | `ledger_refs` | `tx_ref` | `height` | Lookup by reference |
//! | `ledger_order_entries` | `(order_id, height)` | `()` | History per order |
//!
//! Each `tx_ref` hashes the previous `tx_ref` together with the record's own
//! fields, so editing any stored record is detected by `verify_chain`.

use super::{LedgerRecorder, LedgerResult};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::ledger::LedgerEntry;
use shared::order::OpaquePayload;
use std::path::Path;
use std::sync::Arc;

const ENTRIES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("ledger_entries");
const REFS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("ledger_refs");
const ORDER_ENTRIES_TABLE: TableDefinition<(&str, u64), ()> =
    TableDefinition::new("ledger_order_entries");

/// `prev_ref` of the first record
pub const GENESIS_REF: &str = "genesis";

/// What broke at a chain position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakKind {
    /// `prev_ref` does not point at the previous record
    PrevRefMismatch,
    /// Record content no longer hashes to its `tx_ref`
    TxRefMismatch,
}

/// A broken link in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainBreak {
    pub height: u64,
    pub kind: BreakKind,
    pub expected: String,
    pub actual: String,
}

/// Result of a full chain walk
#[derive(Debug, Clone, Serialize)]
pub struct ChainVerification {
    pub total_entries: u64,
    pub chain_intact: bool,
    pub breaks: Vec<ChainBreak>,
}

/// Embedded hash-chain ledger
#[derive(Clone)]
pub struct HashChainLedger {
    db: Arc<Database>,
}

impl HashChainLedger {
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> LedgerResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> LedgerResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ENTRIES_TABLE)?;
            let _ = write_txn.open_table(REFS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ENTRIES_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Append one record; height and head are read in the same write transaction
    fn append(
        &self,
        order_id: &str,
        user_id: &str,
        provider_id: Option<&str>,
        snapshot: &OpaquePayload,
    ) -> LedgerResult<LedgerEntry> {
        let txn = self.db.begin_write()?;
        let (height, prev_ref) = Self::head(&txn)?;

        let mut entry = LedgerEntry {
            tx_ref: String::new(),
            prev_ref,
            height: height + 1,
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            provider_id: provider_id.map(str::to_string),
            schema: snapshot.schema.clone(),
            schema_version: snapshot.schema_version,
            payload_hash: hex::encode(Sha256::digest(&snapshot.bytes)),
            recorded_at: shared::util::now_millis(),
        };
        entry.tx_ref = compute_tx_ref(&entry);

        {
            let mut entries = txn.open_table(ENTRIES_TABLE)?;
            let value = serde_json::to_vec(&entry)?;
            entries.insert(entry.height, value.as_slice())?;

            let mut refs = txn.open_table(REFS_TABLE)?;
            refs.insert(entry.tx_ref.as_str(), entry.height)?;

            let mut by_order = txn.open_table(ORDER_ENTRIES_TABLE)?;
            by_order.insert((order_id, entry.height), ())?;
        }
        txn.commit()?;
        Ok(entry)
    }

    /// Current height and head reference
    fn head(txn: &WriteTransaction) -> LedgerResult<(u64, String)> {
        let entries = txn.open_table(ENTRIES_TABLE)?;
        match entries.last()? {
            Some((key, value)) => {
                let entry: LedgerEntry = serde_json::from_slice(value.value())?;
                Ok((key.value(), entry.tx_ref))
            }
            None => Ok((0, GENESIS_REF.to_string())),
        }
    }

    pub fn get_by_ref(&self, tx_ref: &str) -> LedgerResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let refs = read_txn.open_table(REFS_TABLE)?;
        let Some(height) = refs.get(tx_ref)?.map(|guard| guard.value()) else {
            return Ok(None);
        };
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        match entries.get(height)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn entries_for_order(&self, order_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let by_order = read_txn.open_table(ORDER_ENTRIES_TABLE)?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;

        let mut result = Vec::new();
        for item in by_order.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (key, _) = item?;
            let (_, height) = key.value();
            if let Some(value) = entries.get(height)? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    /// Walk the whole chain from genesis
    pub fn verify_chain(&self) -> LedgerResult<ChainVerification> {
        let read_txn = self.db.begin_read()?;
        let entries = read_txn.open_table(ENTRIES_TABLE)?;

        let mut expected_prev = GENESIS_REF.to_string();
        let mut breaks = Vec::new();
        let mut total_entries = 0u64;

        for item in entries.iter()? {
            let (_, value) = item?;
            let entry: LedgerEntry = serde_json::from_slice(value.value())?;
            total_entries += 1;

            if entry.prev_ref != expected_prev {
                breaks.push(ChainBreak {
                    height: entry.height,
                    kind: BreakKind::PrevRefMismatch,
                    expected: expected_prev.clone(),
                    actual: entry.prev_ref.clone(),
                });
            }
            let recomputed = compute_tx_ref(&entry);
            if recomputed != entry.tx_ref {
                breaks.push(ChainBreak {
                    height: entry.height,
                    kind: BreakKind::TxRefMismatch,
                    expected: recomputed,
                    actual: entry.tx_ref.clone(),
                });
            }
            expected_prev = entry.tx_ref;
        }

        if !breaks.is_empty() {
            tracing::warn!(breaks = breaks.len(), "Ledger chain broken");
        }

        Ok(ChainVerification {
            total_entries,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }

    /// Overwrite a stored record in place (tamper simulation)
    #[cfg(test)]
    fn overwrite(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut entries = txn.open_table(ENTRIES_TABLE)?;
            let value = serde_json::to_vec(entry)?;
            entries.insert(entry.height, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// SHA-256 over the chain link and every record field
///
/// Fields are `\x00`-separated; `provider_id` is tagged so `None` and
/// `Some("")` hash differently.
fn compute_tx_ref(entry: &LedgerEntry) -> String {
    let mut hasher = Sha256::new();

    hasher.update(entry.prev_ref.as_bytes());
    hasher.update(b"\x00");
    hasher.update(entry.height.to_le_bytes());
    hasher.update(entry.recorded_at.to_le_bytes());

    hasher.update(entry.order_id.as_bytes());
    hasher.update(b"\x00");
    hasher.update(entry.user_id.as_bytes());
    hasher.update(b"\x00");
    match entry.provider_id.as_deref() {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => hasher.update(b"\x00"),
    }
    hasher.update(b"\x00");

    hasher.update(entry.schema.as_bytes());
    hasher.update(b"\x00");
    hasher.update(entry.schema_version.to_le_bytes());
    hasher.update(entry.payload_hash.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl LedgerRecorder for HashChainLedger {
    async fn record(
        &self,
        order_id: &str,
        user_id: &str,
        provider_id: Option<&str>,
        snapshot: &OpaquePayload,
    ) -> LedgerResult<String> {
        let entry = self.append(order_id, user_id, provider_id, snapshot)?;
        tracing::debug!(
            order_id,
            height = entry.height,
            tx_ref = %entry.tx_ref,
            "Ledger record appended"
        );
        Ok(entry.tx_ref)
    }

    async fn verify(&self, order_id: &str, tx_ref: &str) -> LedgerResult<bool> {
        Ok(self
            .get_by_ref(tx_ref)?
            .is_some_and(|entry| entry.order_id == order_id && compute_tx_ref(&entry) == tx_ref))
    }

    async fn history(&self, order_id: &str) -> LedgerResult<Vec<LedgerEntry>> {
        self.entries_for_order(order_id)
    }
}
