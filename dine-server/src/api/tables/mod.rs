//! Dining Table API 模块 (员工)
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/tables | GET | 桌台列表 |
//! | /api/tables | POST | 创建桌台 |
//! | /api/tables/{number} | GET | 单个桌台 |
//! | /api/tables/{number} | PUT | 更新桌台 / 轮换二维码 |
//! | /api/tables/{number}/ordering-url | GET | 访客点餐 URL |
//! | /api/tables/{number}/reservation | DELETE | 强制取消预订 |

mod handler;

use axum::{
    Router,
    routing::{delete, get},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{number}", get(handler::get_by_number).put(handler::update))
        .route("/{number}/ordering-url", get(handler::ordering_url))
        .route("/{number}/reservation", delete(handler::cancel_reservation))
}
