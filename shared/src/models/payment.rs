//! Payment model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Bank,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Reconciliation applies only to pending payments
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Payment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub order_group_ids: Vec<i64>,
    /// Amount in currency unit
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Bank transaction id (set on reconciliation)
    pub transaction_id: Option<String>,
    /// Code the payer puts in the transfer description
    pub reference_code: String,
    pub payment_link: Option<String>,
    pub transaction_date: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create payment link request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayment {
    pub order_group_ids: Vec<i64>,
    #[serde(default)]
    pub method: PaymentMethod,
}
