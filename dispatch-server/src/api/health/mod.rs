//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 |
//!
//! ```json
//! { "status": "healthy", "version": "0.1.0" }
//! ```
//!
//! 后台任务异常退出时 `status` 为 `degraded`。

use axum::{Json, Router, extract::State, routing::get};
use shared::response::HealthResponse;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let status = if state.check_tasks() == 0 {
        "healthy"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
