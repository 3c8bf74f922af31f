//! Order API Module
//!
//! 所有状态变更统一走 [`crate::orders::OrderService`]，与实时通道
//! 入口执行完全相同的权限矩阵与原子性纪律。

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Place order / role-scoped listing
        .route("/", post(handler::place).get(handler::list))
        // Single order (party-scoped)
        .route("/{id}", get(handler::get_by_id))
        // Status transition (unified entry for all roles)
        .route("/{id}/status", patch(handler::update_status))
        // Customer cancellation (restricted variant of the above)
        .route("/{id}/cancel", post(handler::cancel))
        // Current status + full timeline
        .route("/{id}/track", get(handler::track))
        // Delivery partner self-assignment
        .route("/{id}/claim", post(handler::claim))
        // Pull-style partner location
        .route("/{id}/location", get(handler::partner_location))
        // One-shot rating after delivery
        .route("/{id}/rating", post(handler::rate))
}
