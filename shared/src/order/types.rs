//! Shared types for dispatch orders

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Status
// ============================================================================

/// Order lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
    PaymentPending,
    PaymentCompleted,
    ProviderAssigned,
    ProviderAccepted,
    ProviderRejected,
    InProgress,
    PickedUp,
    InTransit,
    Arrived,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
    Disputed,
}

impl OrderStatus {
    /// Every status, in lifecycle order
    pub const ALL: [OrderStatus; 15] = [
        Self::Created,
        Self::PaymentPending,
        Self::PaymentCompleted,
        Self::ProviderAssigned,
        Self::ProviderAccepted,
        Self::ProviderRejected,
        Self::InProgress,
        Self::PickedUp,
        Self::InTransit,
        Self::Arrived,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
        Self::Refunded,
        Self::Disputed,
    ];

    /// Terminal: cancellation is no longer allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
    }

    /// ETA is computed toward the destination in these states, toward pickup otherwise
    pub fn targets_destination(&self) -> bool {
        matches!(self, Self::PickedUp | Self::InTransit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::PaymentCompleted => "PAYMENT_COMPLETED",
            Self::ProviderAssigned => "PROVIDER_ASSIGNED",
            Self::ProviderAccepted => "PROVIDER_ACCEPTED",
            Self::ProviderRejected => "PROVIDER_REJECTED",
            Self::InProgress => "IN_PROGRESS",
            Self::PickedUp => "PICKED_UP",
            Self::InTransit => "IN_TRANSIT",
            Self::Arrived => "ARRIVED",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
            Self::Disputed => "DISPUTED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

// ============================================================================
// Order Type
// ============================================================================

/// Kind of job being dispatched
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    Ride,
    FoodDelivery,
    PackageDelivery,
    GroceryDelivery,
    ServiceBooking,
}

impl OrderType {
    /// Service-type filter used when querying the provider directory
    pub fn service_type(&self) -> &'static str {
        match self {
            Self::Ride => "ride",
            Self::FoodDelivery => "food_delivery",
            Self::PackageDelivery => "package_delivery",
            Self::GroceryDelivery => "grocery_delivery",
            Self::ServiceBooking => "service_booking",
        }
    }
}

// ============================================================================
// Payment Method
// ============================================================================

/// Payment method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    DigitalWallet,
    Cash,
    Crypto,
}

// ============================================================================
// Geography
// ============================================================================

/// Bare latitude/longitude pair (degrees)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within [-90,90] / [-180,180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A place (pickup or destination)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// Free-form extras (floor, gate code, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, String>,
}

impl Location {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Line Items
// ============================================================================

/// Order line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OrderItem {
    #[serde(default)]
    pub item_id: String,
    pub name: String,
    pub quantity: f64,
    /// Unit price
    pub price: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}
