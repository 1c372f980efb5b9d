//! Payments API 模块
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/payments | POST | 为订单组生成银行转账收款链接 | 已登录 |
//! | /api/payments/{id} | GET | 查询付款 | 归属方 / 员工 |
//! | /api/payments/webhook | POST | 银行入账通知 | `Authorization: Apikey` |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/webhook", post(handler::webhook))
        .route("/{id}", get(handler::get_by_id))
}
