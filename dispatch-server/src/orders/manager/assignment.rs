//! Provider assignment, acceptance and rejection

use super::{ManagerError, ManagerResult, OrdersManager, require};
use crate::orders::matcher::ScoredProvider;
use shared::order::{
    OpaquePayload, Order, OrderLocation, OrderStatus, ProviderOfferPayload, SYSTEM_ACTOR,
};
use shared::request::{AcceptOrderRequest, AssignProviderRequest, RejectOrderRequest};
use shared::util::{new_id, now_millis};

/// Candidates requested from the matcher
const MATCH_CANDIDATES: usize = 3;

fn not_assigned(order_id: &str, provider_id: &str) -> ManagerError {
    ManagerError::PermissionDenied {
        order_id: order_id.to_string(),
        provider_id: provider_id.to_string(),
    }
}

impl OrdersManager {
    /// Assign a provider, explicitly or via the matcher
    pub async fn assign_provider(
        &self,
        order_id: &str,
        req: AssignProviderRequest,
    ) -> ManagerResult<Order> {
        require(order_id, "order ID")?;

        let provider_id = match req.provider_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                // Manual override still requires the order to exist
                self.get(order_id)?;
                id
            }
            None => {
                let order = self.get(order_id)?;
                let candidates = self.matcher.find_best(&order, MATCH_CANDIDATES).await?;
                let Some(best) = candidates.first() else {
                    return Err(ManagerError::NoProvidersAvailable(order_id.to_string()));
                };
                let best = best.provider_id().to_string();
                self.notify_candidates(&order, &candidates).await;
                best
            }
        };

        let order = self.commit_assignment(order_id, &provider_id)?;
        tracing::info!(order_id, provider_id = %provider_id, "Provider assigned");
        self.ledger.submit(&order);
        Ok(order)
    }

    fn commit_assignment(&self, order_id: &str, provider_id: &str) -> ManagerResult<Order> {
        self.storage.update_order(order_id, |order: &mut Order| {
            order.provider_id = Some(provider_id.to_string());
            order.push_status(
                OrderStatus::ProviderAssigned,
                SYSTEM_ACTOR,
                format!("Provider {provider_id} assigned"),
            );
            Ok::<(), ManagerError>(())
        })
    }

    /// Send the offer to every candidate; failures are only logged
    async fn notify_candidates(&self, order: &Order, candidates: &[ScoredProvider]) {
        let payload = match OpaquePayload::encode(&ProviderOfferPayload::from(order)) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "Failed to encode provider offer");
                return;
            }
        };

        let directory = self.matcher.directory();
        let sends = candidates.iter().map(|candidate| {
            let payload = &payload;
            async move {
                let provider_id = candidate.provider_id();
                if let Err(e) = directory.notify(provider_id, &order.id, payload).await {
                    tracing::warn!(
                        order_id = %order.id,
                        provider_id,
                        error = %e,
                        "Failed to notify provider"
                    );
                }
            }
        });
        futures::future::join_all(sends).await;
    }

    /// The assigned provider accepts the order
    pub fn accept_order(&self, order_id: &str, req: AcceptOrderRequest) -> ManagerResult<Order> {
        require(order_id, "order ID")?;
        require(&req.provider_id, "provider ID")?;
        let provider_id = req.provider_id.as_str();

        let order = self.storage.update_order(order_id, |order: &mut Order| {
            if !order.is_assigned_to(provider_id) {
                return Err(not_assigned(order_id, provider_id));
            }
            order.push_status(
                OrderStatus::ProviderAccepted,
                provider_id,
                "Provider accepted the order",
            );
            Ok(())
        })?;
        tracing::info!(order_id, provider_id, "Order accepted");

        if let Some(location) = req.current_location.as_ref() {
            self.record_accept_location(&order, provider_id, location);
        }

        self.ledger.submit(&order);
        Ok(order)
    }

    /// Best-effort first position report sent along with an acceptance
    fn record_accept_location(
        &self,
        order: &Order,
        provider_id: &str,
        location: &shared::order::Location,
    ) {
        if !location.coordinates().is_valid() {
            tracing::warn!(order_id = %order.id, provider_id, "Ignoring invalid accept location");
            return;
        }
        let record = OrderLocation {
            id: new_id(),
            order_id: order.id.clone(),
            provider_id: provider_id.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            timestamp: now_millis(),
        };
        if let Err(e) = self.storage.insert_location(&record) {
            tracing::warn!(order_id = %order.id, provider_id, error = %e, "Failed to store accept location");
        }
    }

    /// The assigned provider rejects the order; a rematch runs in the background
    pub fn reject_order(&self, order_id: &str, req: RejectOrderRequest) -> ManagerResult<Order> {
        require(order_id, "order ID")?;
        require(&req.provider_id, "provider ID")?;
        let provider_id = req.provider_id.as_str();
        let note = if req.reason.trim().is_empty() {
            "Provider rejected the order"
        } else {
            req.reason.as_str()
        };

        let order = self.storage.update_order(order_id, |order: &mut Order| {
            if !order.is_assigned_to(provider_id) {
                return Err(not_assigned(order_id, provider_id));
            }
            order.push_status(OrderStatus::ProviderRejected, provider_id, note);
            order.provider_id = None;
            Ok(())
        })?;
        tracing::info!(order_id, provider_id, "Order rejected");

        self.ledger.submit(&order);
        self.spawn_rematch(order.clone(), provider_id.to_string());
        Ok(order)
    }

    /// Detached: the rematch outlives the reject request
    fn spawn_rematch(&self, order: Order, rejected_by: String) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(e) = manager.rematch(&order, &rejected_by).await {
                tracing::warn!(order_id = %order.id, error = %e, "Rematch after rejection failed");
            }
        });
    }

    /// Find, notify and auto-assign a replacement provider
    ///
    /// The assignment only lands while the order is still waiting in
    /// PROVIDER_REJECTED without a provider; anything that moved it in the
    /// meantime wins. The search is the same `MATCH_CANDIDATES` query as a
    /// first assignment; the rejecter is filtered from its results.
    pub(crate) async fn rematch(&self, order: &Order, rejected_by: &str) -> ManagerResult<()> {
        let candidates: Vec<ScoredProvider> = self
            .matcher
            .find_best(order, MATCH_CANDIDATES)
            .await?
            .into_iter()
            .filter(|c| c.provider_id() != rejected_by)
            .collect();

        let Some(best) = candidates.first() else {
            tracing::info!(order_id = %order.id, "No replacement provider found");
            return Ok(());
        };
        let provider_id = best.provider_id().to_string();
        self.notify_candidates(order, &candidates).await;

        let result = self.storage.update_order(&order.id, |current: &mut Order| {
            if current.status != OrderStatus::ProviderRejected || current.provider_id.is_some() {
                return Err(ManagerError::FailedPrecondition(format!(
                    "order moved to {} before rematch",
                    current.status
                )));
            }
            current.provider_id = Some(provider_id.clone());
            current.push_status(
                OrderStatus::ProviderAssigned,
                SYSTEM_ACTOR,
                format!("Provider {provider_id} assigned"),
            );
            Ok(())
        });

        match result {
            Ok(updated) => {
                tracing::info!(order_id = %order.id, provider_id = %provider_id, "Replacement provider assigned");
                self.ledger.submit(&updated);
                Ok(())
            }
            Err(ManagerError::FailedPrecondition(reason)) => {
                tracing::info!(order_id = %order.id, reason = %reason, "Rematch skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
