//! Orders API 模块
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/orders | POST | 由购物车下单 (员工可代客下单) | 访客 / 会员 / 员工 |
//! | /api/orders | GET | 订单列表 (过滤) | 员工 |
//! | /api/orders/groups/{id} | GET | 订单组详情 | 归属方 / 员工 |
//! | /api/orders/{id} | PUT | 推进状态 / 修改数量 | 员工 |
//! | /api/orders/pay | POST | 现金结清访客全部未付订单 | 员工 |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/groups/{id}", get(handler::get_group))
        .route("/pay", post(handler::pay))
        .route("/{id}", put(handler::update))
}
