//! 订单 API 模块
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | POST | 创建订单 |
//! | /api/orders/{id} | GET | 查询订单 |
//! | /api/orders/{id}/status | PUT | 更新状态 |
//! | /api/orders/{id}/cancel | POST | 取消订单 |
//! | /api/orders/{id}/assign | POST | 指派服务商 |
//! | /api/orders/{id}/accept | POST | 服务商接单 |
//! | /api/orders/{id}/reject | POST | 服务商拒单 |
//! | /api/orders/{id}/location | POST | 上报位置 |
//! | /api/orders/{id}/locations | GET | 位置历史 |
//! | /api/orders/{id}/track | GET | 位置追踪 (SSE) |
//! | /api/orders/{id}/ledger/verify | GET | 账本校验 |
//! | /api/orders/{id}/ledger/history | GET | 账本记录 |
//! | /api/users/{user_id}/orders | GET | 用户订单列表 |
//! | /api/providers/{provider_id}/orders | GET | 服务商订单列表 |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// 订单路由
pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/orders", order_routes())
        .route("/api/users/{user_id}/orders", get(handler::list_by_user))
        .route(
            "/api/providers/{provider_id}/orders",
            get(handler::list_by_provider),
        )
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
        // 派单
        .route("/{id}/assign", post(handler::assign_provider))
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/reject", post(handler::reject))
        // 位置
        .route("/{id}/location", post(handler::update_location))
        .route("/{id}/locations", get(handler::location_history))
        .route("/{id}/track", get(handler::track))
        // 账本
        .route("/{id}/ledger/verify", get(handler::verify_ledger))
        .route("/{id}/ledger/history", get(handler::ledger_history))
}
