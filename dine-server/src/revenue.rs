//! Revenue ledger
//!
//! Append-only: one record per settlement source (`payment:<id>` for bank
//! reconciliation, `settle:<id>` for staff cash settlement). Records are
//! never updated.

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::error::AppResult;
use shared::models::{PaymentMethod, Revenue, RevenueSummary};
use std::collections::BTreeMap;

use crate::storage::{Storage, StorageResult};

/// Source id for a reconciled bank payment
pub fn payment_source(payment_id: i64) -> String {
    format!("payment:{payment_id}")
}

/// Source id for a staff settlement
pub fn settlement_source(settlement_id: i64) -> String {
    format!("settle:{settlement_id}")
}

/// Pending ledger entry, written by [`RevenueLedger::append_txn`]
#[derive(Debug, Clone)]
pub struct RevenueEntry {
    pub source_id: String,
    pub payment_id: Option<i64>,
    pub order_group_ids: Vec<i64>,
    pub amount: f64,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct RevenueLedger {
    storage: Storage,
}

impl RevenueLedger {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Append an entry inside the caller's transaction.
    ///
    /// Returns `None` when the source already has a record, so replays of the
    /// same settlement never double-count.
    pub fn append_txn(
        storage: &Storage,
        txn: &WriteTransaction,
        entry: RevenueEntry,
    ) -> StorageResult<Option<Revenue>> {
        if storage.has_revenue_source_txn(txn, &entry.source_id)? {
            tracing::debug!(source_id = %entry.source_id, "Revenue already recorded for source");
            return Ok(None);
        }

        let revenue = Revenue {
            id: storage.next_revenue_id(txn)?,
            source_id: entry.source_id,
            payment_id: entry.payment_id,
            order_group_ids: entry.order_group_ids,
            amount: entry.amount,
            method: entry.method,
            created_at: shared::util::now_millis(),
        };
        storage.insert_revenue_txn(txn, &revenue)?;
        Ok(Some(revenue))
    }

    /// Records in `[from, to)`, oldest first
    pub fn list(&self, from: Option<i64>, to: Option<i64>) -> AppResult<Vec<Revenue>> {
        let revenues = self.storage.list_revenues(|r| {
            from.is_none_or(|f| r.created_at >= f) && to.is_none_or(|t| r.created_at < t)
        })?;
        Ok(revenues)
    }

    /// Dashboard totals for `[from, to)`
    pub fn summary(&self, from: Option<i64>, to: Option<i64>) -> AppResult<RevenueSummary> {
        let revenues = self.list(from, to)?;

        let mut total = Decimal::ZERO;
        let mut by_method: BTreeMap<String, Decimal> = BTreeMap::new();
        for revenue in &revenues {
            let amount = shared::money::to_decimal(revenue.amount);
            total += amount;
            *by_method
                .entry(revenue.method.as_str().to_string())
                .or_insert(Decimal::ZERO) += amount;
        }

        Ok(RevenueSummary {
            from,
            to,
            total: shared::money::to_f64(total),
            count: revenues.len(),
            by_method: by_method
                .into_iter()
                .map(|(method, amount)| (method, shared::money::to_f64(amount)))
                .collect(),
        })
    }
}
