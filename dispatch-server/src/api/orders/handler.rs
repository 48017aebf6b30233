//! Order API Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use shared::ledger::LedgerHistoryResponse;
use shared::request::{
    AcceptOrderRequest, AssignProviderRequest, CancelOrderRequest, CreateOrderRequest,
    ListOrdersQuery, LocationHistoryQuery, RejectOrderRequest, UpdateLocationRequest,
    UpdateStatusRequest,
};
use shared::response::{
    LedgerVerification, ListOrdersResponse, LocationHistoryResponse, OrderResponse,
    UpdateLocationResponse,
};

use crate::core::ServerState;
use crate::utils::AppResult;

/// SSE event name for Track updates
const LOCATION_EVENT: &str = "location";

/// Create a new order
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.create(payload)?;
    Ok(Json(OrderResponse::ok(order, "Order created successfully")))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.get(&id)?;
    Ok(Json(OrderResponse::ok(order, "Order retrieved successfully")))
}

pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.update_status(&id, payload)?;
    Ok(Json(OrderResponse::ok(order, "Order status updated successfully")))
}

pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.cancel(&id, payload)?;
    Ok(Json(OrderResponse::ok(order, "Order cancelled successfully")))
}

/// Orders of one user, newest first
pub async fn list_by_user(
    State(state): State<ServerState>,
    Path(user_id): Path<String>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<ListOrdersResponse>> {
    Ok(Json(state.orders.list_by_user(&user_id, &query)?))
}

/// Orders currently assigned to one provider, newest first
pub async fn list_by_provider(
    State(state): State<ServerState>,
    Path(provider_id): Path<String>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<ListOrdersResponse>> {
    Ok(Json(state.orders.list_by_provider(&provider_id, &query)?))
}

/// Assign a provider; an empty body runs the matcher
pub async fn assign_provider(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Option<Json<AssignProviderRequest>>,
) -> AppResult<Json<OrderResponse>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let order = state.orders.assign_provider(&id, payload).await?;
    Ok(Json(OrderResponse::ok(order, "Provider assigned successfully")))
}

pub async fn accept(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<AcceptOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.accept_order(&id, payload)?;
    Ok(Json(OrderResponse::ok(order, "Order accepted successfully")))
}

pub async fn reject(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<RejectOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    let order = state.orders.reject_order(&id, payload)?;
    Ok(Json(OrderResponse::ok(order, "Order rejected successfully")))
}

/// Position report from the assigned provider
pub async fn update_location(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateLocationRequest>,
) -> AppResult<Json<UpdateLocationResponse>> {
    Ok(Json(state.orders.update_location(&id, payload)?))
}

pub async fn location_history(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<LocationHistoryQuery>,
) -> AppResult<Json<LocationHistoryResponse>> {
    Ok(Json(state.orders.location_history(&id, &query)?))
}

/// Track stream as Server-Sent Events, one `location` event per update
///
/// Unknown orders fail with 404 before the stream opens. The stream ends when
/// the client disconnects or the server shuts down.
pub async fn track(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.orders.track(&id)?;
    let order_id = id.clone();

    let events = subscription.into_stream().filter_map(move |update| {
        let event = match Event::default().event(LOCATION_EVENT).json_data(&update) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Failed to encode track update");
                None
            }
        };
        futures::future::ready(event)
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

pub async fn verify_ledger(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<LedgerVerification>> {
    Ok(Json(state.orders.verify_ledger(&id).await?))
}

pub async fn ledger_history(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<LedgerHistoryResponse>> {
    let entries = state.orders.ledger_history(&id).await?;
    Ok(Json(LedgerHistoryResponse {
        order_id: id,
        entries,
    }))
}
