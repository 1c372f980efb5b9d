//! 营收看板
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/dashboard/revenue | GET | 营收汇总 (?from=&to=, Unix millis) | 员工 |
//! | /api/dashboard/revenue/entries | GET | 营收流水 | 员工 |

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::models::{Revenue, RevenueSummary};

use crate::api::{AppError, AppResult};
use crate::auth::CurrentUser;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/dashboard", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/revenue", get(summary))
        .route("/revenue/entries", get(entries))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl RangeQuery {
    fn check(&self) -> AppResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(AppError::validation("from must not be after to"));
        }
        Ok(())
    }
}

async fn summary(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<RevenueSummary>> {
    user.require_staff()?;
    range.check()?;
    Ok(Json(state.revenue.summary(range.from, range.to)?))
}

async fn entries(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<Vec<Revenue>>> {
    user.require_staff()?;
    range.check()?;
    Ok(Json(state.revenue.list(range.from, range.to)?))
}
