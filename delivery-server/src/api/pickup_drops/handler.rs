//! Pickup/Drop API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::PickupDrop;
use crate::orders::PlacePickupRequest;
use crate::utils::{AppError, AppResult};
use shared::order::PickupStatus;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<PickupStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: PickupStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// Create a pickup task (customer only)
pub async fn place(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<PlacePickupRequest>,
) -> AppResult<Json<PickupDrop>> {
    let pickup = state.pickups.place(&user, payload).await?;
    Ok(Json(pickup))
}

/// Role-scoped pickup task listing
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<PickupDrop>>> {
    let pickups = state.pickups.list(&user, query.status).await?;
    Ok(Json(pickups))
}

/// Get pickup task by id (party-scoped)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<PickupDrop>> {
    let pickup = state.pickups.get(&user, &id).await?;
    Ok(Json(pickup))
}

/// Request a status transition
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<PickupDrop>> {
    let pickup = state
        .pickups
        .apply_transition(&user, &id, payload.status, payload.note)
        .await?;
    Ok(Json(pickup))
}

/// Customer cancellation
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<PickupDrop>> {
    if payload.reason.trim().is_empty() {
        return Err(AppError::validation("cancellation reason must not be empty"));
    }
    let pickup = state.pickups.cancel(&user, &id, payload.reason).await?;
    Ok(Json(pickup))
}

/// Delivery partner claims an unassigned task
pub async fn claim(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<PickupDrop>> {
    let pickup = state.pickups.claim(&user, &id).await?;
    Ok(Json(pickup))
}
