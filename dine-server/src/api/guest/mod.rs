//! 访客 API 模块 (扫码流程)
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/guest/tables/{number} | GET | 扫码落地页 (?token=) | 无 |
//! | /api/guest/tables/{number}/check-in | POST | 入座，签发访客令牌 | 无 |
//! | /api/guest/tables/{number}/reservation | POST | 预订桌台 | 访客 |
//! | /api/guest/tables/{number}/reservation | DELETE | 取消自己的预订 (?token=) | 访客 |
//! | /api/guest/orders | GET | 我的订单 (按订单组) | 访客 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/guest", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/tables/{number}", get(handler::scan_table))
        .route("/tables/{number}/check-in", post(handler::check_in))
        .route(
            "/tables/{number}/reservation",
            post(handler::reserve).delete(handler::cancel_reservation),
        )
        .route("/orders", get(handler::my_orders))
}
