//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::Order;
use crate::orders::{PlaceOrderRequest, RatingRequest, TrackResponse};
use crate::utils::{AppError, AppResult};
use shared::message::LocationResponsePayload;
use shared::order::OrderStatus;

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 状态过滤（管理端列表用），扁平字符串
    pub status: Option<String>,
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

/// Cancellation request
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// Place a new order (customer only)
pub async fn place(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.place_order(&user, payload).await?;
    Ok(Json(order))
}

/// Role-scoped order listing
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let status = query
        .status
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(|e| AppError::validation(e))?;
    let orders = state.orders.list(&user, status).await?;
    Ok(Json(orders))
}

/// Get order by id (party-scoped)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get(&user, &id).await?;
    Ok(Json(order))
}

/// Request a status transition
///
/// 未知状态字面量 → 400；订单不存在 → 404；
/// 角色/归属不符 → 403；状态机拒绝 → 422。
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Order>> {
    let target: OrderStatus = payload
        .status
        .parse()
        .map_err(|e: String| AppError::validation(e))?;
    let order = state
        .orders
        .apply_transition(&user, &id, target, payload.note)
        .await?;
    Ok(Json(order))
}

/// Customer cancellation (restricted to `cancelled`)
pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<CancelRequest>,
) -> AppResult<Json<Order>> {
    if payload.reason.trim().is_empty() {
        return Err(AppError::validation("cancellation reason must not be empty"));
    }
    let order = state.orders.cancel(&user, &id, payload.reason).await?;
    Ok(Json(order))
}

/// Current status + full timeline
pub async fn track(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<TrackResponse>> {
    let track = state.orders.track(&user, &id).await?;
    Ok(Json(track))
}

/// Delivery partner claims a ready order (first come, first served)
pub async fn claim(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.claim(&user, &id).await?;
    Ok(Json(order))
}

/// Pull-style "where is my delivery partner"
pub async fn partner_location(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LocationResponsePayload>> {
    let response = state.relay.lookup(&user, &id).await?;
    Ok(Json(response))
}

/// One-shot rating, only after delivery
pub async fn rate(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<RatingRequest>,
) -> AppResult<Json<Order>> {
    let order = state.orders.rate(&user, &id, payload).await?;
    Ok(Json(order))
}
