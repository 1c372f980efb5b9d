//! 菜单协作方接口
//!
//! 下单时通过 [`MenuCatalog`] 获取菜品快照。默认实现 [`StoredMenu`] 读取
//! 本地 `dishes` 表，菜单服务 (以及测试) 通过 `upsert_dish` 写入。

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Dish, DishSnapshot, DishStatus, DishUpsert};
use std::fmt::Debug;

use crate::storage::Storage;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_URL_LEN, validate_optional_text, validate_required_text,
};

pub trait MenuCatalog: Send + Sync + Debug {
    fn get_dish(&self, dish_id: &str) -> AppResult<Option<Dish>>;

    /// 下单快照：菜品不存在返回 `DishNotFound`，不可售返回 `DishUnavailable`
    fn snapshot(&self, dish_id: &str) -> AppResult<DishSnapshot> {
        let dish = self
            .get_dish(dish_id)?
            .ok_or_else(|| AppError::dish_not_found(dish_id))?;
        if dish.status != DishStatus::Available {
            return Err(AppError::with_message(
                ErrorCode::DishUnavailable,
                format!("Dish {} is {:?}", dish_id, dish.status),
            ));
        }
        Ok(DishSnapshot::from(&dish))
    }
}

/// 基于 redb `dishes` 表的菜单
#[derive(Debug, Clone)]
pub struct StoredMenu {
    storage: Storage,
}

impl StoredMenu {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// 新增或覆盖菜品 (不影响已下单的快照)
    pub fn upsert_dish(&self, dish_id: &str, payload: DishUpsert) -> AppResult<Dish> {
        validate_required_text(dish_id, "dish_id", MAX_NAME_LEN)?;
        validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
        validate_optional_text(&payload.image, "image", MAX_URL_LEN)?;
        validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
        shared::money::validate_price(payload.price)?;

        let dish = Dish {
            id: dish_id.to_string(),
            name: payload.name,
            price: payload.price,
            image: payload.image,
            description: payload.description,
            status: payload.status,
        };
        self.storage.put_dish(&dish)?;
        tracing::info!(dish_id = %dish.id, price = dish.price, "Dish upserted");
        Ok(dish)
    }
}

impl MenuCatalog for StoredMenu {
    fn get_dish(&self, dish_id: &str) -> AppResult<Option<Dish>> {
        Ok(self.storage.get_dish(dish_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(name: &str, price: f64, status: DishStatus) -> DishUpsert {
        DishUpsert {
            name: name.to_string(),
            price,
            image: None,
            description: None,
            status,
        }
    }

    #[test]
    fn test_snapshot_rejects_missing_and_unavailable() {
        let menu = StoredMenu::new(Storage::open_in_memory().unwrap());
        assert_eq!(menu.snapshot("nope").unwrap_err().code, ErrorCode::DishNotFound);

        menu.upsert_dish("D2", upsert("Bun cha", 40.0, DishStatus::Hidden)).unwrap();
        assert_eq!(menu.snapshot("D2").unwrap_err().code, ErrorCode::DishUnavailable);

        menu.upsert_dish("D1", upsert("Pho", 45.0, DishStatus::Available)).unwrap();
        let snapshot = menu.snapshot("D1").unwrap();
        assert_eq!(snapshot.name, "Pho");
        assert_eq!(snapshot.price, 45.0);
    }

    #[test]
    fn test_upsert_validates_price() {
        let menu = StoredMenu::new(Storage::open_in_memory().unwrap());
        assert!(menu.upsert_dish("D1", upsert("Pho", -1.0, DishStatus::Available)).is_err());
        assert!(menu.upsert_dish("D1", upsert("Pho", f64::NAN, DishStatus::Available)).is_err());
        assert!(menu.upsert_dish("D1", upsert(" ", 1.0, DishStatus::Available)).is_err());

        let huge = menu
            .upsert_dish("D1", upsert("Pho", 5e28, DishStatus::Available))
            .unwrap_err();
        assert_eq!(huge.code, ErrorCode::ValidationFailed);
        assert!(menu.get_dish("D1").unwrap().is_none());
    }
}
