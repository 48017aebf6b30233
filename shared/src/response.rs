//! API Response types
//!
//! Every unary call returns the full current order plus a human-readable
//! message and a success flag.

use crate::order::{Location, Order, OrderLocation};
use serde::{Deserialize, Serialize};

/// Unary response carrying an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
    pub message: String,
    pub success: bool,
}

impl OrderResponse {
    pub fn ok(order: Order, message: impl Into<String>) -> Self {
        Self {
            order,
            message: message.into(),
            success: true,
        }
    }
}

/// Paginated order listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
    /// Total matching orders across all pages
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Result of a provider position report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLocationResponse {
    pub order_id: String,
    pub location_id: String,
    pub current_location: Location,
    pub estimated_arrival_minutes: f64,
    pub message: String,
    pub success: bool,
}

/// Location history listing (newest first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationHistoryResponse {
    pub order_id: String,
    pub locations: Vec<OrderLocation>,
}

/// Ledger verification result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerVerification {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_ref: Option<String>,
    pub verified: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
