//! redb-based order store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` (JSON) | Primary record |
//! | `user_orders` | `user_id` | `order_id` (multimap) | ListByUser index |
//! | `provider_orders` | `provider_id` | `order_id` (multimap) | ListByProvider index |
//! | `order_locations` | `(order_id, sequence)` | `OrderLocation` (JSON) | Position reports (append-only) |
//! | `sequence_counter` | `&str` | `u64` | Location sequence |
//!
//! # Locking
//!
//! redb admits one write transaction at a time. Every status mutation runs as
//! a single read-modify-write inside one write transaction (`update_order`),
//! so concurrent writers on the same order serialize and never lose updates.
//! Write transactions are short and never held across an `.await`.

use redb::{
    Database, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable, ReadableTable,
    ReadableTableMetadata, TableDefinition, WriteTransaction,
};
use shared::order::{Order, OrderLocation, OrderStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Primary order records: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Orders per user: key = user_id, values = order_id
const USER_ORDERS_TABLE: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("user_orders");

/// Orders per currently assigned provider: key = provider_id, values = order_id
const PROVIDER_ORDERS_TABLE: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("provider_orders");

/// Position reports: key = (order_id, sequence), value = JSON-serialized OrderLocation
const LOCATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("order_locations");

/// Sequence counters: key = counter name, value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const LOCATION_SEQUENCE_KEY: &str = "location_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
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

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    OrderExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which secondary index a listing walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderIndex {
    User,
    Provider,
}

impl OrderIndex {
    fn table(self) -> MultimapTableDefinition<'static, &'static str, &'static str> {
        match self {
            Self::User => USER_ORDERS_TABLE,
            Self::Provider => PROVIDER_ORDERS_TABLE,
        }
    }
}

/// One page of a listing plus the total match count
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub total: u64,
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// order and its history entry are on disk.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_multimap_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_multimap_table(PROVIDER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(LOCATIONS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(LOCATION_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(LOCATION_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    // ========== Order Operations ==========

    /// Persist a newly created order together with its index rows
    pub fn insert_order(&self, order: &Order) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ORDERS_TABLE)?;
            if table.get(order.id.as_str())?.is_some() {
                return Err(StorageError::OrderExists(order.id.clone()));
            }
            let value = serde_json::to_vec(order)?;
            table.insert(order.id.as_str(), value.as_slice())?;
        }
        {
            let mut users = txn.open_multimap_table(USER_ORDERS_TABLE)?;
            users.insert(order.user_id.as_str(), order.id.as_str())?;
        }
        if let Some(provider_id) = order.provider_id.as_deref() {
            let mut providers = txn.open_multimap_table(PROVIDER_ORDERS_TABLE)?;
            providers.insert(provider_id, order.id.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Locked read-modify-write of a single order
    ///
    /// `mutate` runs inside the write transaction and sees the latest committed
    /// state. Returning an error from it aborts the transaction with nothing
    /// written. The provider index follows any change to `provider_id`.
    pub fn update_order<E, F>(&self, order_id: &str, mutate: F) -> Result<Order, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let order = Self::apply_update(&txn, order_id, mutate)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }

    fn apply_update<E, F>(txn: &WriteTransaction, order_id: &str, mutate: F) -> Result<Order, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        let mut table = txn.open_table(ORDERS_TABLE).map_err(StorageError::from)?;
        let mut order: Order = {
            let guard = table
                .get(order_id)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::OrderNotFound(order_id.to_string()))?;
            serde_json::from_slice(guard.value()).map_err(StorageError::from)?
        };

        let previous_provider = order.provider_id.clone();
        mutate(&mut order)?;

        let value = serde_json::to_vec(&order).map_err(StorageError::from)?;
        table
            .insert(order_id, value.as_slice())
            .map_err(StorageError::from)?;

        if previous_provider != order.provider_id {
            let mut providers = txn
                .open_multimap_table(PROVIDER_ORDERS_TABLE)
                .map_err(StorageError::from)?;
            if let Some(old) = previous_provider.as_deref() {
                providers.remove(old, order_id).map_err(StorageError::from)?;
            }
            if let Some(new) = order.provider_id.as_deref() {
                providers.insert(new, order_id).map_err(StorageError::from)?;
            }
        }

        Ok(order)
    }

    /// Record the ledger reference without touching status or history
    pub fn set_ledger_ref(&self, order_id: &str, tx_ref: &str) -> StorageResult<Order> {
        self.update_order(order_id, |order: &mut Order| {
            order.ledger_ref = Some(tx_ref.to_string());
            Ok::<(), StorageError>(())
        })
    }

    /// Orders of one user or one provider, newest first
    ///
    /// `status` filters exactly; `total` counts every match before paging.
    pub fn list_orders(
        &self,
        index: OrderIndex,
        key: &str,
        status: Option<OrderStatus>,
        offset: usize,
        limit: usize,
    ) -> StorageResult<OrderPage> {
        let read_txn = self.db.begin_read()?;
        let index_table = read_txn.open_multimap_table(index.table())?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in index_table.get(key)? {
            let order_id = result?;
            let Some(value) = orders_table.get(order_id.value())? else {
                tracing::warn!(order_id = %order_id.value(), "Index row points at missing order");
                continue;
            };
            let order: Order = serde_json::from_slice(value.value())?;
            if status.is_none_or(|s| s == order.status) {
                orders.push(order);
            }
        }

        // created_at desc, ID as a stable tiebreak
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = orders.len() as u64;
        let orders = orders.into_iter().skip(offset).take(limit).collect();
        Ok(OrderPage { orders, total })
    }

    // ========== Location Operations ==========

    /// Append a position report
    pub fn insert_location(&self, location: &OrderLocation) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        let sequence = self.increment_location_sequence(&txn)?;
        {
            let mut table = txn.open_table(LOCATIONS_TABLE)?;
            let value = serde_json::to_vec(location)?;
            table.insert((location.order_id.as_str(), sequence), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn increment_location_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(LOCATION_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(LOCATION_SEQUENCE_KEY, next)?;
        Ok(next)
    }

    /// Most recent position report for an order
    pub fn latest_location(&self, order_id: &str) -> StorageResult<Option<OrderLocation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;
        let mut range = table.range((order_id, 0u64)..=(order_id, u64::MAX))?;
        match range.next_back() {
            Some(result) => {
                let (_key, value) = result?;
                Ok(Some(serde_json::from_slice(value.value())?))
            }
            None => Ok(None),
        }
    }

    /// Up to `limit` position reports for an order, newest first
    pub fn location_history(
        &self,
        order_id: &str,
        limit: usize,
    ) -> StorageResult<Vec<OrderLocation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;

        let mut locations = Vec::new();
        for result in table
            .range((order_id, 0u64)..=(order_id, u64::MAX))?
            .rev()
            .take(limit)
        {
            let (_key, value) = result?;
            locations.push(serde_json::from_slice(value.value())?);
        }
        Ok(locations)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let locations_table = read_txn.open_table(LOCATIONS_TABLE)?;

        Ok(StorageStats {
            order_count: orders_table.len()?,
            location_count: locations_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub order_count: u64,
    pub location_count: u64,
}
