//! Guest API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::models::{Guest, OrderGroupDetail, Table};
use validator::Validate;

use crate::api::{AppError, AppResult, ConnectionId};
use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::tables::parse_reservation_time;
use crate::utils::validation::{
    MAX_NAME_LEN_U64, MAX_NOTE_LEN_U64, MAX_SHORT_TEXT_LEN_U64, validate_request,
};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckInRequest {
    #[validate(length(min = 1, max = MAX_SHORT_TEXT_LEN_U64))]
    pub token: String,
    #[validate(length(max = MAX_NAME_LEN_U64))]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub guest: Guest,
    pub access_token: String,
    /// 会话过期时间 (Unix millis)
    pub expires_at: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReserveRequest {
    #[validate(length(min = 1, max = MAX_SHORT_TEXT_LEN_U64))]
    pub token: String,
    /// RFC 3339 或 `YYYY-MM-DDTHH:MM` (按 UTC 处理)
    #[serde(alias = "reservationTime")]
    pub reservation_time: String,
    #[validate(length(max = MAX_NOTE_LEN_U64))]
    pub note: Option<String>,
}

/// GET /api/guest/tables/{number}?token= - 扫码落地页
pub async fn scan_table(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<Table>> {
    Ok(Json(state.tables.get_table_for_guest(number, &query.token)?))
}

/// POST /api/guest/tables/{number}/check-in - 扫码入座
pub async fn check_in(
    State(state): State<ServerState>,
    Path(number): Path<i32>,
    Json(payload): Json<CheckInRequest>,
) -> AppResult<Json<CheckInResponse>> {
    validate_request(&payload)?;
    let jwt = state.get_jwt_service();
    let guest = state.tables.check_in_guest(
        number,
        &payload.token,
        payload.name,
        jwt.expiration_millis(),
    )?;

    let access_token = jwt.generate_token(guest.id, Role::Guest).map_err(|e| {
        tracing::error!(guest_id = guest.id, error = %e, "Failed to issue guest token");
        AppError::internal("Failed to issue guest token")
    })?;

    Ok(Json(CheckInResponse {
        expires_at: guest.refresh_token_expires_at,
        guest,
        access_token,
    }))
}

/// POST /api/guest/tables/{number}/reservation - 预订
pub async fn reserve(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Path(number): Path<i32>,
    Json(payload): Json<ReserveRequest>,
) -> AppResult<Json<Table>> {
    let guest_id = user.require_guest()?;
    validate_request(&payload)?;
    let reservation_time = parse_reservation_time(&payload.reservation_time)?;

    let table = state.tables.reserve(
        number,
        &payload.token,
        guest_id,
        reservation_time,
        payload.note,
        &conn.origin(&user),
    )?;
    Ok(Json(table))
}

/// DELETE /api/guest/tables/{number}/reservation?token= - 取消自己的预订
pub async fn cancel_reservation(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Path(number): Path<i32>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<Table>> {
    let guest_id = user.require_guest()?;
    let table = state.tables.cancel_reservation(
        number,
        &query.token,
        guest_id,
        &conn.origin(&user),
    )?;
    Ok(Json(table))
}

/// GET /api/guest/orders - 我的订单
pub async fn my_orders(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<OrderGroupDetail>>> {
    let guest_id = user.require_guest()?;
    Ok(Json(state.orders.get_guest_orders(guest_id)?))
}
