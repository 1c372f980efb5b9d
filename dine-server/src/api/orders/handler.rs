//! Orders API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::ErrorCode;
use shared::models::{
    CreateOrders, DeliveryInfo, Order, OrderActor, OrderFilter, OrderGroupDetail, OrderItemInput,
    OrderStatus, OrderType, OrderUpdate, TakeawayInfo,
};
use validator::Validate;

use crate::api::{AppError, AppResult, ConnectionId};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::Settlement;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_NAME_LEN_U64, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN,
    validate_optional_text, validate_request, validate_required_text,
};

#[derive(Debug, Deserialize, Validate)]
pub struct OrderItemRequest {
    #[validate(length(min = 1, max = MAX_NAME_LEN_U64))]
    pub dish_id: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrdersRequest {
    pub table_number: Option<i32>,
    #[serde(default)]
    pub order_type: OrderType,
    #[validate(nested)]
    pub items: Vec<OrderItemRequest>,
    pub delivery: Option<DeliveryInfo>,
    pub takeaway: Option<TakeawayInfo>,
    /// 员工代客下单时的目标访客
    pub guest_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub dish_id: Option<String>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PayOrdersRequest {
    #[serde(alias = "guestId")]
    pub guest_id: i64,
}

fn validate_delivery(delivery: &Option<DeliveryInfo>) -> AppResult<()> {
    if let Some(d) = delivery {
        validate_required_text(&d.receiver_name, "receiver_name", MAX_NAME_LEN)?;
        validate_required_text(&d.phone, "phone", MAX_SHORT_TEXT_LEN)?;
        validate_required_text(&d.address, "address", MAX_ADDRESS_LEN)?;
        validate_optional_text(&d.note, "note", MAX_NOTE_LEN)?;
    }
    Ok(())
}

fn validate_takeaway(takeaway: &Option<TakeawayInfo>) -> AppResult<()> {
    if let Some(t) = takeaway {
        validate_optional_text(&t.phone, "phone", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&t.note, "note", MAX_NOTE_LEN)?;
    }
    Ok(())
}

/// POST /api/orders - 下单
///
/// 访客 / 会员为自己下单；员工必须指定 `guest_id` 代客下单。
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Json(payload): Json<CreateOrdersRequest>,
) -> AppResult<Json<OrderGroupDetail>> {
    validate_request(&payload)?;
    validate_delivery(&payload.delivery)?;
    validate_takeaway(&payload.takeaway)?;

    let (actor, handler_id) = match (user.as_actor(), payload.guest_id) {
        (Some(actor), _) => (actor, None),
        (None, Some(guest_id)) => {
            if state.storage.get_guest(guest_id)?.is_none() {
                return Err(
                    AppError::not_found(format!("Guest {}", guest_id)).with_detail("id", guest_id)
                );
            }
            (OrderActor::Guest(guest_id), Some(user.id))
        }
        (None, None) => {
            return Err(AppError::validation(
                "guest_id is required when staff place an order",
            ));
        }
    };

    let request = CreateOrders {
        table_number: payload.table_number,
        order_type: payload.order_type,
        items: payload
            .items
            .into_iter()
            .map(|item| OrderItemInput {
                dish_id: item.dish_id,
                quantity: item.quantity,
            })
            .collect(),
        delivery: payload.delivery,
        takeaway: payload.takeaway,
    };

    let detail = state
        .orders
        .create_orders(actor, handler_id, request, &conn.origin(&user))?;
    Ok(Json(detail))
}

/// GET /api/orders - 订单列表
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<Vec<Order>>> {
    user.require_staff()?;
    Ok(Json(state.orders.get_orders(&filter)?))
}

/// GET /api/orders/groups/{id} - 订单组详情
pub async fn get_group(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderGroupDetail>> {
    let detail = state.orders.get_order_detail(id)?;
    if !user.is_staff() && user.as_actor() != Some(detail.group.actor) {
        return Err(AppError::with_message(
            ErrorCode::PermissionDenied,
            format!("Order group {} belongs to another caller", id),
        ));
    }
    Ok(Json(detail))
}

/// PUT /api/orders/{id} - 更新订单
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<Order>> {
    user.require_staff()?;
    if let Some(dish_id) = &payload.dish_id {
        validate_required_text(dish_id, "dish_id", MAX_NAME_LEN)?;
    }
    let update = OrderUpdate {
        status: payload.status,
        dish_id: payload.dish_id,
        quantity: payload.quantity,
    };
    let order = state
        .orders
        .update_order(id, update, user.id, &conn.origin(&user))?;
    Ok(Json(order))
}

/// POST /api/orders/pay - 现金结清
pub async fn pay(
    State(state): State<ServerState>,
    user: CurrentUser,
    conn: ConnectionId,
    Json(payload): Json<PayOrdersRequest>,
) -> AppResult<Json<Settlement>> {
    user.require_staff()?;
    let settlement = state
        .orders
        .pay_orders(payload.guest_id, user.id, &conn.origin(&user))?;
    Ok(Json(settlement))
}
