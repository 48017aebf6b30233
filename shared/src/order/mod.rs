//! Order Domain Module
//!
//! This module provides the dispatch order types:
//! - Types: status machine, order type, payment method, geography
//! - Model: the `Order` aggregate with its append-only status history
//! - Location: provider position reports and live tracking updates
//! - Payload: versioned opaque payloads for the directory and the ledger

pub mod location;
pub mod model;
pub mod payload;
pub mod types;

// Re-exports
pub use location::{LocationUpdate, OrderLocation};
pub use model::{Order, StatusHistoryEntry, SYSTEM_ACTOR};
pub use payload::{OpaquePayload, OrderSnapshotPayload, PayloadError, ProviderOfferPayload};
pub use types::*;
