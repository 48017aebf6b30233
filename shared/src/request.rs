//! Request types for the dispatch API
//!
//! Path parameters (order ID, user ID, provider ID) are not part of these
//! bodies; the engine takes them as separate arguments.

use crate::order::{Location, OrderItem, OrderStatus, OrderType, PaymentMethod};
use serde::{Deserialize, Serialize};

/// Default page size for order listings
pub const DEFAULT_LIST_LIMIT: u32 = 10;
/// Default number of rows returned by location history
pub const DEFAULT_LOCATION_HISTORY_LIMIT: u32 = 20;
/// Upper bound for every paginated query
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Create order request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    #[serde(default)]
    pub order_type: OrderType,
    /// Required; `None` is rejected as an invalid argument
    pub pickup_location: Option<Location>,
    /// Required; `None` is rejected as an invalid argument
    pub destination_location: Option<Location>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Update status request (operator override)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub updated_by: String,
    #[serde(default)]
    pub note: String,
}

/// Cancel order request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub cancelled_by: String,
    #[serde(default)]
    pub reason: String,
}

/// Assign provider request
///
/// With `provider_id` set the provider is assigned directly, otherwise the
/// matcher picks the best candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignProviderRequest {
    #[serde(default)]
    pub provider_id: Option<String>,
}

/// Provider accepts an assigned order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptOrderRequest {
    pub provider_id: String,
    /// Optional initial position, stored best-effort
    #[serde(default)]
    pub current_location: Option<Location>,
}

/// Provider rejects an assigned order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectOrderRequest {
    pub provider_id: String,
    #[serde(default)]
    pub reason: String,
}

/// Provider position report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLocationRequest {
    pub provider_id: String,
    pub location: Option<Location>,
}

/// List query (by user or by provider)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl ListOrdersQuery {
    /// 1-based page, anything below 1 becomes 1
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Unset or zero falls back to the default, larger values are capped
    pub fn limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_LIST_LIMIT,
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page() as usize - 1) * self.limit() as usize
    }
}

/// Location history query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationHistoryQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

impl LocationHistoryQuery {
    pub fn limit(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_LOCATION_HISTORY_LIMIT,
            Some(limit) => limit.min(MAX_PAGE_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListOrdersQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 10);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn test_list_query_clamps() {
        let query = ListOrdersQuery {
            page: Some(0),
            limit: Some(500),
            status: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), 100);

        let query = ListOrdersQuery {
            page: Some(3),
            limit: Some(7),
            status: None,
        };
        assert_eq!(query.offset(), 14);
    }

    #[test]
    fn test_location_history_limit() {
        assert_eq!(LocationHistoryQuery::default().limit(), 20);
        assert_eq!(LocationHistoryQuery { limit: Some(1000) }.limit(), 100);
        assert_eq!(LocationHistoryQuery { limit: Some(5) }.limit(), 5);
    }

    #[test]
    fn test_create_request_accepts_minimal_json() {
        let json = r#"{
            "user_id": "u-1",
            "pickup_location": {"latitude": 1.0, "longitude": 2.0},
            "destination_location": {"latitude": 3.0, "longitude": 4.0}
        }"#;
        let req: CreateOrderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.order_type, OrderType::Ride);
        assert!(req.items.is_empty());
        assert_eq!(req.pickup_location.unwrap().longitude, 2.0);
    }
}
