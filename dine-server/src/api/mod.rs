//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`tables`] - 桌台管理 (员工)
//! - [`guest`] - 访客扫码、入座、预订、订单查询
//! - [`orders`] - 下单、订单状态、结账
//! - [`payments`] - 收款链接与银行 webhook
//! - [`dashboard`] - 营收汇总
//! - [`dishes`] - 菜单协作方写入口
//! - [`realtime`] - WebSocket 实时推送

pub mod dashboard;
pub mod dishes;
pub mod guest;
pub mod health;
pub mod orders;
pub mod payments;
pub mod realtime;
pub mod tables;

use std::convert::Infallible;

use axum::{Router, extract::FromRequestParts, http::request::Parts};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::hub::Origin;

pub use shared::error::{AppError, AppResult};

/// 客户端携带自己的实时连接 ID，用于跳过本连接的回显
pub const CONNECTION_ID_HEADER: &str = "x-connection-id";

/// 组装完整的 axum 应用
pub fn build_app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(tables::router())
        .merge(guest::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(dashboard::router())
        .merge(dishes::router())
        .merge(realtime::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// 请求来源的实时连接 ID (`X-Connection-Id`，可选)
#[derive(Debug, Clone, Default)]
pub struct ConnectionId(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ConnectionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(CONNECTION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        ))
    }
}

impl ConnectionId {
    pub fn origin(self, user: &CurrentUser) -> Origin {
        Origin::new(user.id, self.0)
    }
}

/// 非员工调用方只能访问自己的资源
pub(crate) fn owner_scope(user: &CurrentUser) -> Option<i64> {
    (!user.is_staff()).then_some(user.id)
}
