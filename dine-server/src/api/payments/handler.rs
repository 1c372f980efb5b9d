//! Payments API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use shared::models::{CreatePayment, Payment};

use crate::api::{AppResult, owner_scope};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::payments::WebhookAck;

/// POST /api/payments - 生成收款链接
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreatePayment>,
) -> AppResult<Json<Payment>> {
    let payment = state
        .payments
        .create_payment_link(payload, owner_scope(&user))?;
    Ok(Json(payment))
}

/// GET /api/payments/{id} - 查询付款
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Payment>> {
    Ok(Json(state.payments.get_payment(id, owner_scope(&user))?))
}

/// POST /api/payments/webhook - 银行入账通知
///
/// 使用原始 body，解析失败同样应答成功，银行不会重试。
pub async fn webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let ack = state.payments.handle_webhook(authorization, &body)?;
    Ok(Json(ack))
}
