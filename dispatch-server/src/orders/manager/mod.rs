//! OrdersManager - Order lifecycle engine
//!
//! This module handles:
//! - Request validation
//! - Status transitions as locked read-modify-write transactions
//! - Price and fee computation on create
//! - Provider assignment, acceptance, rejection and rematch
//! - Location reports, ETA and the Track stream
//! - Ledger write-behind after every committed change
//!
//! # Transition Flow
//!
//! ```text
//! operation(id, ...)
//!     ├─ 1. Validate arguments (InvalidArgument)
//!     ├─ 2. Begin write transaction (serializes writers)
//!     ├─ 3. Read order (NotFound)
//!     ├─ 4. Check precondition / assigned provider
//!     ├─ 5. push_status(...) + field changes
//!     ├─ 6. Commit
//!     ├─ 7. Submit snapshot to the ledger queue (fire-and-forget)
//!     └─ 8. Return the committed order
//! ```

mod assignment;
mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::eta::estimate_minutes;
use super::matcher::ProviderMatcher;
use super::money::{compute_totals, validate_item};
use super::storage::{OrderIndex, OrderStorage};
use super::tracker::{LocationTracker, TrackSubscription};
use crate::directory::ProviderDirectory;
use crate::ledger::{LedgerRecorder, LedgerService};
use shared::ledger::LedgerEntry;
use shared::order::{Location, Order, OrderLocation, OrderStatus, SYSTEM_ACTOR};
use shared::request::{
    CancelOrderRequest, CreateOrderRequest, ListOrdersQuery, LocationHistoryQuery,
    UpdateLocationRequest, UpdateStatusRequest,
};
use shared::response::{
    LedgerVerification, ListOrdersResponse, LocationHistoryResponse, UpdateLocationResponse,
};
use shared::util::{new_id, now_millis};
use std::sync::Arc;

/// OrdersManager for order lifecycle processing
///
/// Cheap to clone: every field is a handle. Detached tasks (rematch) own a
/// clone so they outlive the request that started them.
#[derive(Clone)]
pub struct OrdersManager {
    storage: OrderStorage,
    matcher: ProviderMatcher,
    ledger: LedgerService,
    recorder: Arc<dyn LedgerRecorder>,
    tracker: LocationTracker,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("ledger", &self.ledger)
            .field("track_interval", &self.tracker.interval())
            .finish()
    }
}

/// Reject blank identifiers
fn require(value: &str, field: &str) -> ManagerResult<()> {
    if value.trim().is_empty() {
        return Err(ManagerError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn require_location(location: Option<&Location>, field: &str) -> ManagerResult<Location> {
    let location = location.ok_or_else(|| ManagerError::invalid(format!("{field} is required")))?;
    if !location.coordinates().is_valid() {
        return Err(ManagerError::invalid(format!(
            "{field} has invalid coordinates ({}, {})",
            location.latitude, location.longitude
        )));
    }
    Ok(location.clone())
}

/// Blank actors fall back to the system actor
fn actor_or_system(actor: &str) -> String {
    if actor.trim().is_empty() {
        SYSTEM_ACTOR.to_string()
    } else {
        actor.to_string()
    }
}

impl OrdersManager {
    pub fn new(
        storage: OrderStorage,
        directory: Arc<dyn ProviderDirectory>,
        recorder: Arc<dyn LedgerRecorder>,
        ledger: LedgerService,
        tracker: LocationTracker,
    ) -> Self {
        Self {
            storage,
            matcher: ProviderMatcher::new(directory),
            ledger,
            recorder,
            tracker,
        }
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    // ========== Core lifecycle ==========

    /// Create a new order in CREATED
    pub fn create(&self, req: CreateOrderRequest) -> ManagerResult<Order> {
        require(&req.user_id, "user ID")?;
        let pickup = require_location(req.pickup_location.as_ref(), "pickup location")?;
        let destination =
            require_location(req.destination_location.as_ref(), "destination location")?;
        for item in &req.items {
            validate_item(item).map_err(|e| ManagerError::invalid(e.to_string()))?;
        }

        let totals = compute_totals(&req.items);
        let now = now_millis();
        let mut order = Order {
            id: new_id(),
            user_id: req.user_id,
            provider_id: None,
            order_type: req.order_type,
            status: OrderStatus::Created,
            pickup_location: pickup,
            destination_location: destination,
            items: req.items,
            total_price: totals.total_price,
            platform_fee: totals.platform_fee,
            provider_fee: totals.provider_fee,
            payment_method: req.payment_method,
            ledger_ref: None,
            notes: req.notes.filter(|n| !n.trim().is_empty()),
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        order.push_status(OrderStatus::Created, SYSTEM_ACTOR, "Order created");

        self.storage.insert_order(&order)?;
        tracing::info!(
            order_id = %order.id,
            user_id = %order.user_id,
            total_price = order.total_price,
            "Order created"
        );

        self.ledger.submit(&order);
        Ok(order)
    }

    pub fn get(&self, order_id: &str) -> ManagerResult<Order> {
        require(order_id, "order ID")?;
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(order_id.to_string()))
    }

    /// Append a history entry under any target status
    pub fn update_status(&self, order_id: &str, req: UpdateStatusRequest) -> ManagerResult<Order> {
        require(order_id, "order ID")?;
        let actor = actor_or_system(&req.updated_by);

        let order = self
            .storage
            .update_order(order_id, |order: &mut Order| {
                order.push_status(req.status, actor.as_str(), req.note.as_str());
                Ok::<(), ManagerError>(())
            })?;

        tracing::info!(order_id, status = %order.status, actor = %actor, "Order status updated");
        self.ledger.submit(&order);
        Ok(order)
    }

    /// Cancel a non-terminal order
    pub fn cancel(&self, order_id: &str, req: CancelOrderRequest) -> ManagerResult<Order> {
        require(order_id, "order ID")?;
        let actor = actor_or_system(&req.cancelled_by);

        let order = self.storage.update_order(order_id, |order: &mut Order| {
            if order.status.is_terminal() {
                return Err(ManagerError::FailedPrecondition(format!(
                    "order cannot be cancelled in its current state ({})",
                    order.status
                )));
            }
            order.push_status(OrderStatus::Cancelled, actor.as_str(), req.reason.as_str());
            Ok(())
        })?;

        tracing::info!(order_id, actor = %actor, "Order cancelled");
        self.ledger.submit(&order);
        Ok(order)
    }

    pub fn list_by_user(
        &self,
        user_id: &str,
        query: &ListOrdersQuery,
    ) -> ManagerResult<ListOrdersResponse> {
        require(user_id, "user ID")?;
        self.list(OrderIndex::User, user_id, query)
    }

    /// Orders currently assigned to the provider
    pub fn list_by_provider(
        &self,
        provider_id: &str,
        query: &ListOrdersQuery,
    ) -> ManagerResult<ListOrdersResponse> {
        require(provider_id, "provider ID")?;
        self.list(OrderIndex::Provider, provider_id, query)
    }

    fn list(
        &self,
        index: OrderIndex,
        key: &str,
        query: &ListOrdersQuery,
    ) -> ManagerResult<ListOrdersResponse> {
        let limit = query.limit();
        let page = self
            .storage
            .list_orders(index, key, query.status, query.offset(), limit as usize)?;
        Ok(ListOrdersResponse {
            orders: page.orders,
            total: page.total,
            page: query.page(),
            limit,
        })
    }

    // ========== Location ==========

    /// Record a position report from the assigned provider and return the ETA
    pub fn update_location(
        &self,
        order_id: &str,
        req: UpdateLocationRequest,
    ) -> ManagerResult<UpdateLocationResponse> {
        require(order_id, "order ID")?;
        require(&req.provider_id, "provider ID")?;
        let location = require_location(req.location.as_ref(), "location")?;

        let order = self.get(order_id)?;
        if !order.is_assigned_to(&req.provider_id) {
            return Err(ManagerError::PermissionDenied {
                order_id: order_id.to_string(),
                provider_id: req.provider_id,
            });
        }

        let record = OrderLocation {
            id: new_id(),
            order_id: order.id.clone(),
            provider_id: req.provider_id,
            latitude: location.latitude,
            longitude: location.longitude,
            timestamp: now_millis(),
        };
        self.storage.insert_location(&record)?;

        let eta = estimate_minutes(location.coordinates(), order.eta_target().coordinates());
        tracing::debug!(order_id, location_id = %record.id, eta_minutes = eta, "Location updated");

        Ok(UpdateLocationResponse {
            order_id: order.id,
            location_id: record.id,
            current_location: location,
            estimated_arrival_minutes: eta,
            message: "Location updated successfully".to_string(),
            success: true,
        })
    }

    /// Most recent position reports, newest first
    pub fn location_history(
        &self,
        order_id: &str,
        query: &LocationHistoryQuery,
    ) -> ManagerResult<LocationHistoryResponse> {
        let order = self.get(order_id)?;
        let locations = self
            .storage
            .location_history(&order.id, query.limit() as usize)?;
        Ok(LocationHistoryResponse {
            order_id: order.id,
            locations,
        })
    }

    /// Open a Track stream; NotFound before any polling starts
    pub fn track(&self, order_id: &str) -> ManagerResult<TrackSubscription> {
        let order = self.get(order_id)?;
        Ok(self.tracker.subscribe(&order.id))
    }

    // ========== Ledger ==========

    pub async fn verify_ledger(&self, order_id: &str) -> ManagerResult<LedgerVerification> {
        let order = self.get(order_id)?;
        let verified = match order.ledger_ref.as_deref() {
            Some(tx_ref) => self.recorder.verify(&order.id, tx_ref).await?,
            None => false,
        };
        Ok(LedgerVerification {
            order_id: order.id,
            transaction_ref: order.ledger_ref,
            verified,
        })
    }

    pub async fn ledger_history(&self, order_id: &str) -> ManagerResult<Vec<LedgerEntry>> {
        let order = self.get(order_id)?;
        Ok(self.recorder.history(&order.id).await?)
    }
}
