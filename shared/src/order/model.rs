//! Order aggregate
//!
//! The status history is append-only: every accepted transition pushes exactly
//! one entry, and the last entry always carries the current status.

use super::types::{Location, OrderItem, OrderStatus, OrderType, PaymentMethod};
use serde::{Deserialize, Serialize};

/// Actor recorded for transitions made by the server itself
pub const SYSTEM_ACTOR: &str = "system";

/// One entry of the status audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    /// Who caused the transition (user, provider ID or "system")
    pub actor: String,
    #[serde(default)]
    pub note: String,
    pub timestamp: i64,
}

/// Dispatch order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Order ID (assigned by server, immutable)
    pub id: String,
    pub user_id: String,
    /// Assigned provider, cleared on rejection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub pickup_location: Location,
    pub destination_location: Location,
    pub items: Vec<OrderItem>,
    /// Σ(quantity × price), computed once at creation
    pub total_price: f64,
    pub platform_fee: f64,
    pub provider_fee: f64,
    pub payment_method: PaymentMethod,
    /// Last ledger transaction reference (eventually consistent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Transition to `status`, appending one history entry and bumping `updated_at`
    pub fn push_status(
        &mut self,
        status: OrderStatus,
        actor: impl Into<String>,
        note: impl Into<String>,
    ) {
        let now = crate::util::now_millis();
        self.status = status;
        self.status_history.push(StatusHistoryEntry {
            status,
            actor: actor.into(),
            note: note.into(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// Whether `provider_id` is the order's current (non-empty) provider
    pub fn is_assigned_to(&self, provider_id: &str) -> bool {
        !provider_id.is_empty() && self.provider_id.as_deref() == Some(provider_id)
    }

    /// Where the provider is heading in the current status
    pub fn eta_target(&self) -> &Location {
        if self.status.targets_destination() {
            &self.destination_location
        } else {
            &self.pickup_location
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Status of the last history entry
    pub fn last_recorded_status(&self) -> Option<OrderStatus> {
        self.status_history.last().map(|entry| entry.status)
    }
}
