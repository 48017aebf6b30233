//! HTTP API 模块
//!
//! - [`orders`] - 订单生命周期、派单、位置与账本路由
//! - [`health`] - 健康检查

pub mod health;
pub mod orders;

use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis();
    if status.is_server_error() {
        tracing::warn!(target: "http_access", latency_ms, "{} {} {}", method, uri, status);
    } else {
        tracing::info!(target: "http_access", latency_ms, "{} {} {}", method, uri, status);
    }

    response
}

/// 构建路由 (无状态、无中间件)
pub fn build_router() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
}

/// 构建完整应用 (状态 + 中间件)
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(log_request))
}
