//! Revenue ledger model

use super::payment::PaymentMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Append-only ledger record, one per settlement source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Revenue {
    pub id: i64,
    /// Settlement source (`payment:<id>` or `settle:<id>`), unique
    pub source_id: String,
    pub payment_id: Option<i64>,
    pub order_group_ids: Vec<i64>,
    pub amount: f64,
    pub method: PaymentMethod,
    pub created_at: i64,
}

/// Dashboard revenue aggregation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueSummary {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub total: f64,
    pub count: usize,
    pub by_method: BTreeMap<String, f64>,
}
