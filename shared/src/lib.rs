//! Shared types for the dispatch platform
//!
//! Domain records, request/response DTOs, versioned payloads and the error
//! taxonomy used by `dispatch-server` and its clients.

pub mod error;
pub mod ledger;
pub mod order;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use error::ErrorCode;
pub use order::{
    Coordinates, Location, LocationUpdate, Order, OrderItem, OrderLocation, OrderStatus,
    OrderType, PaymentMethod, StatusHistoryEntry,
};
pub use serde::{Deserialize, Serialize};
