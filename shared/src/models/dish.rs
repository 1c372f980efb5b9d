//! Dish model (menu collaborator)

use serde::{Deserialize, Serialize};

/// Dish availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DishStatus {
    #[default]
    Available,
    Unavailable,
    Hidden,
}

/// Dish entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dish {
    pub id: String,
    pub name: String,
    /// Price in currency unit
    pub price: f64,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub status: DishStatus,
}

/// Upsert dish payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishUpsert {
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub status: DishStatus,
}

/// Immutable copy of a dish taken at order time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DishSnapshot {
    pub dish_id: String,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl From<&Dish> for DishSnapshot {
    fn from(dish: &Dish) -> Self {
        Self {
            dish_id: dish.id.clone(),
            name: dish.name.clone(),
            price: dish.price,
            image: dish.image.clone(),
            description: dish.description.clone(),
        }
    }
}
