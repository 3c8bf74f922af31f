//! Pickup/Drop API Module

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Pickup/drop router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/pickup-drops", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::place).get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", patch(handler::update_status))
        .route("/{id}/cancel", post(handler::cancel))
        .route("/{id}/claim", post(handler::claim))
}
