//! Versioned opaque payloads
//!
//! The provider directory and the ledger never see typed structs, only an
//! `OpaquePayload`: a schema name, a schema version and the JSON-encoded bytes.
//! Maps inside payloads are `BTreeMap`s so the encoding is deterministic and
//! hashes over it are stable.

use super::model::Order;
use super::types::{Location, OrderType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Payload encoding/decoding failure
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schema mismatch: expected {expected} v{expected_version}, got {found} v{found_version}")]
    SchemaMismatch {
        expected: &'static str,
        expected_version: u16,
        found: String,
        found_version: u16,
    },
}

/// A payload type with a documented schema
pub trait VersionedPayload: Serialize + DeserializeOwned {
    const SCHEMA: &'static str;
    const VERSION: u16;
}

/// Serialized payload handed across a service boundary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpaquePayload {
    pub schema: String,
    pub schema_version: u16,
    pub bytes: Vec<u8>,
}

impl OpaquePayload {
    pub fn encode<T: VersionedPayload>(value: &T) -> Result<Self, PayloadError> {
        Ok(Self {
            schema: T::SCHEMA.to_string(),
            schema_version: T::VERSION,
            bytes: serde_json::to_vec(value)?,
        })
    }

    pub fn decode<T: VersionedPayload>(&self) -> Result<T, PayloadError> {
        if self.schema != T::SCHEMA || self.schema_version != T::VERSION {
            return Err(PayloadError::SchemaMismatch {
                expected: T::SCHEMA,
                expected_version: T::VERSION,
                found: self.schema.clone(),
                found_version: self.schema_version,
            });
        }
        Ok(serde_json::from_slice(&self.bytes)?)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Snapshot of an order as recorded on the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshotPayload {
    pub order: Order,
}

impl VersionedPayload for OrderSnapshotPayload {
    const SCHEMA: &'static str = "order_snapshot";
    const VERSION: u16 = 1;
}

impl OrderSnapshotPayload {
    /// Ledger references are excluded from the snapshot, they point at it
    pub fn from_order(order: &Order) -> Self {
        let mut order = order.clone();
        order.ledger_ref = None;
        Self { order }
    }
}

/// Offer pushed to candidate providers on assignment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderOfferPayload {
    pub order_id: String,
    pub order_type: OrderType,
    pub pickup: Location,
    pub destination: Location,
    pub items_count: usize,
    pub total_price: f64,
    pub provider_fee: f64,
    pub created_at: i64,
}

impl VersionedPayload for ProviderOfferPayload {
    const SCHEMA: &'static str = "provider_offer";
    const VERSION: u16 = 1;
}

impl From<&Order> for ProviderOfferPayload {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            order_type: order.order_type,
            pickup: order.pickup_location.clone(),
            destination: order.destination_location.clone(),
            items_count: order.items.len(),
            total_price: order.total_price,
            provider_fee: order.provider_fee,
            created_at: order.created_at,
        }
    }
}
