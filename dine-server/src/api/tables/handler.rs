//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::models::{Table, TableCreate, TableStatus, TableUpdate};
use validator::Validate;

use crate::api::{AppResult, ConnectionId};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::validation::{MAX_NAME_LEN_U64, validate_request};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTableRequest {
    #[validate(range(min = 1))]
    pub number: i32,
    #[validate(range(min = 1, max = 100))]
    pub capacity: i32,
    #[validate(length(max = MAX_NAME_LEN_U64))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTableRequest {
    #[validate(range(min = 1, max = 100))]
    pub capacity: Option<i32>,
    #[validate(length(max = MAX_NAME_LEN_U64))]
    pub location: Option<String>,
    pub status: Option<TableStatus>,
    #[serde(default, alias = "changeToken")]
    pub change_token: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderingUrl {
    pub number: i32,
    pub url: String,
}

/// GET /api/tables - 获取所有桌台
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Table>>> {
    user.require_staff()?;
    Ok(Json(state.tables.list_tables()?))
}

/// GET /api/tables/{number} - 获取单个桌台
pub async fn get_by_number(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(number): Path<i32>,
) -> AppResult<Json<Table>> {
    user.require_staff()?;
    Ok(Json(state.tables.get_table(number)?))
}

/// POST /api/tables - 创建桌台
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateTableRequest>,
) -> AppResult<Json<Table>> {
    user.require_staff()?;
    validate_request(&payload)?;
    let table = state.tables.create_table(TableCreate {
        number: payload.number,
        capacity: payload.capacity,
        location: payload.location,
    })?;
    Ok(Json(table))
}

/// PUT /api/tables/{number} - 更新桌台
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Path(number): Path<i32>,
    Json(payload): Json<UpdateTableRequest>,
) -> AppResult<Json<Table>> {
    user.require_staff()?;
    validate_request(&payload)?;
    let update = TableUpdate {
        capacity: payload.capacity,
        location: payload.location,
        status: payload.status,
        change_token: payload.change_token,
    };
    let table = state.tables.update_table(number, update, &conn.origin(&user))?;
    Ok(Json(table))
}

/// GET /api/tables/{number}/ordering-url - 二维码内容
pub async fn ordering_url(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(number): Path<i32>,
) -> AppResult<Json<OrderingUrl>> {
    user.require_staff()?;
    let table = state.tables.get_table(number)?;
    Ok(Json(OrderingUrl {
        number,
        url: state.tables.ordering_url(&table),
    }))
}

/// DELETE /api/tables/{number}/reservation - 员工取消预订
pub async fn cancel_reservation(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Path(number): Path<i32>,
) -> AppResult<Json<Table>> {
    user.require_staff()?;
    let table = state
        .tables
        .staff_cancel_reservation(number, &conn.origin(&user))?;
    Ok(Json(table))
}
