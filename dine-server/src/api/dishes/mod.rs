//! 菜品写入口 (菜单协作方 / 员工)
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/dishes/{id} | GET | 查询菜品 | 无 |
//! | /api/dishes/{id} | PUT | 新增或覆盖菜品 | 员工 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use shared::models::{Dish, DishUpsert};

use crate::api::{AppError, AppResult};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::orders::MenuCatalog;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/dishes/{id}", get(get_dish).put(upsert_dish))
}

async fn get_dish(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Dish>> {
    state
        .menu
        .get_dish(&id)?
        .map(Json)
        .ok_or_else(|| AppError::dish_not_found(&id))
}

async fn upsert_dish(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<DishUpsert>,
) -> AppResult<Json<Dish>> {
    user.require_staff()?;
    Ok(Json(state.menu.upsert_dish(&id, payload)?))
}
