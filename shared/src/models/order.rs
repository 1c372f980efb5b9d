//! Order model

use super::dish::DishSnapshot;
use serde::{Deserialize, Serialize};

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Delivered,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Not yet settled and not cancelled
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, Self::Paid | Self::Cancelled)
    }
}

/// Owning actor of an order: exactly one of guest or customer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OrderActor {
    Guest(i64),
    Customer(i64),
}

impl OrderActor {
    pub fn id(&self) -> i64 {
        match self {
            Self::Guest(id) | Self::Customer(id) => *id,
        }
    }

    pub fn guest_id(&self) -> Option<i64> {
        match self {
            Self::Guest(id) => Some(*id),
            Self::Customer(_) => None,
        }
    }

    pub fn customer_id(&self) -> Option<i64> {
        match self {
            Self::Customer(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }
}

/// Single order line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub group_id: i64,
    pub actor: OrderActor,
    /// None for takeaway/delivery
    pub table_number: Option<i32>,
    pub dish: DishSnapshot,
    pub quantity: i32,
    pub status: OrderStatus,
    /// Staff member who last advanced the order
    pub handler_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order type of a group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub receiver_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TakeawayInfo {
    pub phone: Option<String>,
    /// Pickup time (Unix millis)
    pub pickup_time: Option<i64>,
    pub note: Option<String>,
}

/// Batch of orders created together; the unit of payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderGroup {
    pub id: i64,
    pub actor: OrderActor,
    pub table_number: Option<i32>,
    pub order_type: OrderType,
    pub order_ids: Vec<i64>,
    pub delivery: Option<DeliveryInfo>,
    pub takeaway: Option<TakeawayInfo>,
    pub is_paid: bool,
    pub paid_at: Option<i64>,
    pub payment_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Group with its orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGroupDetail {
    pub group: OrderGroup,
    pub orders: Vec<Order>,
    /// Σ line totals of non-cancelled orders
    pub total: f64,
}

/// Cart line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub dish_id: String,
    pub quantity: i32,
}

/// Create orders request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrders {
    pub table_number: Option<i32>,
    #[serde(default)]
    pub order_type: OrderType,
    pub items: Vec<OrderItemInput>,
    pub delivery: Option<DeliveryInfo>,
    pub takeaway: Option<TakeawayInfo>,
}

/// Update order payload (staff)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub dish_id: Option<String>,
    pub quantity: Option<i32>,
}

/// Order list filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// created_at lower bound (inclusive, millis)
    pub from: Option<i64>,
    /// created_at upper bound (exclusive, millis)
    pub to: Option<i64>,
    pub status: Option<OrderStatus>,
    pub table_number: Option<i32>,
    pub guest_id: Option<i64>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.from.is_none_or(|from| order.created_at >= from)
            && self.to.is_none_or(|to| order.created_at < to)
            && self.status.is_none_or(|s| order.status == s)
            && self
                .table_number
                .is_none_or(|n| order.table_number == Some(n))
            && self
                .guest_id
                .is_none_or(|g| order.actor.guest_id() == Some(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_is_tagged_union() {
        let json = serde_json::to_value(OrderActor::Guest(42)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "guest", "id": 42 }));
        let actor: OrderActor =
            serde_json::from_value(serde_json::json!({ "type": "customer", "id": 5 })).unwrap();
        assert_eq!(actor.customer_id(), Some(5));
        assert_eq!(actor.guest_id(), None);
    }

    #[test]
    fn test_outstanding_statuses() {
        assert!(OrderStatus::Pending.is_outstanding());
        assert!(OrderStatus::Delivered.is_outstanding());
        assert!(!OrderStatus::Paid.is_outstanding());
        assert!(!OrderStatus::Cancelled.is_outstanding());
    }
}
