//! Settlement helpers shared by `payOrders` and bank reconciliation
//!
//! All functions run inside the caller's write transaction so that order,
//! group, table and revenue effects commit as one unit.

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::error::AppResult;
use shared::models::{Order, OrderGroup, OrderStatus, Payment, PaymentStatus, Table};
use std::collections::BTreeSet;

use crate::storage::{Storage, StorageResult};
use crate::tables;

/// Effects of one settlement, published after commit
#[derive(Debug, Default, Clone)]
pub struct SettlementEffects {
    pub orders: Vec<Order>,
    pub groups: Vec<OrderGroup>,
    pub released_tables: Vec<Table>,
}

impl SettlementEffects {
    /// Actor ids to notify (self channels)
    pub fn actor_ids(&self) -> BTreeSet<i64> {
        self.orders
            .iter()
            .map(|o| o.actor.id())
            .chain(self.groups.iter().map(|g| g.actor.id()))
            .collect()
    }
}

/// Sum of line totals, ignoring cancelled lines
pub fn orders_total<'a>(orders: impl IntoIterator<Item = &'a Order>) -> AppResult<Decimal> {
    shared::money::checked_sum(
        orders
            .into_iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| shared::money::line_total(o.dish.price, o.quantity)),
    )
}

/// Outstanding lines only (what is still owed)
pub fn outstanding_total<'a>(orders: impl IntoIterator<Item = &'a Order>) -> AppResult<Decimal> {
    shared::money::checked_sum(
        orders
            .into_iter()
            .filter(|o| o.status.is_outstanding())
            .map(|o| shared::money::line_total(o.dish.price, o.quantity)),
    )
}

/// Fail every pending Payment that covers one of `group_ids`
///
/// 订单金额变化或已由其他途径结账后，旧的收款链接不再有效；
/// 之后到账的转账命中 `AlreadyFinal`，需人工退款。
pub fn supersede_pending_payments_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    group_ids: &BTreeSet<i64>,
    reason: &str,
    now: i64,
) -> StorageResult<Vec<Payment>> {
    let pending = storage.find_payments_txn(txn, |p| {
        p.status == PaymentStatus::Pending
            && p.order_group_ids.iter().any(|id| group_ids.contains(id))
    })?;

    let mut superseded = Vec::with_capacity(pending.len());
    for mut payment in pending {
        payment.status = PaymentStatus::Failed;
        payment.failure_reason = Some(reason.to_string());
        payment.updated_at = now;
        storage.put_payment_txn(txn, &payment)?;
        tracing::warn!(payment_id = payment.id, reason, "Pending payment superseded");
        superseded.push(payment);
    }
    Ok(superseded)
}

/// Mark the given orders Paid
pub fn mark_orders_paid_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    orders: Vec<Order>,
    handler_id: Option<i64>,
    now: i64,
) -> StorageResult<Vec<Order>> {
    let mut paid = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.status = OrderStatus::Paid;
        if handler_id.is_some() {
            order.handler_id = handler_id;
        }
        order.updated_at = now;
        storage.put_order_txn(txn, &order)?;
        paid.push(order);
    }
    Ok(paid)
}

/// Mark groups paid once none of their orders is outstanding
pub fn complete_groups_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    group_ids: &BTreeSet<i64>,
    payment_id: Option<i64>,
    now: i64,
) -> StorageResult<Vec<OrderGroup>> {
    let mut completed = Vec::new();
    for group_id in group_ids {
        let Some(mut group) = storage.get_group_txn(txn, *group_id)? else {
            tracing::warn!(group_id, "Order group missing during settlement");
            continue;
        };
        if group.is_paid {
            continue;
        }

        let mut all_settled = true;
        for order_id in &group.order_ids {
            if let Some(order) = storage.get_order_txn(txn, *order_id)?
                && order.status.is_outstanding()
            {
                all_settled = false;
                break;
            }
        }
        if !all_settled {
            continue;
        }

        group.is_paid = true;
        group.paid_at = Some(now);
        if payment_id.is_some() {
            group.payment_id = payment_id;
        }
        group.updated_at = now;
        storage.put_group_txn(txn, &group)?;
        completed.push(group);
    }
    Ok(completed)
}

/// Settle every outstanding order of the given groups (bank reconciliation)
pub fn settle_groups_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    group_ids: &[i64],
    payment_id: i64,
    now: i64,
) -> StorageResult<SettlementEffects> {
    let mut outstanding = Vec::new();
    for group_id in group_ids {
        let Some(group) = storage.get_group_txn(txn, *group_id)? else {
            continue;
        };
        for order_id in &group.order_ids {
            if let Some(order) = storage.get_order_txn(txn, *order_id)?
                && order.status.is_outstanding()
            {
                outstanding.push(order);
            }
        }
    }

    let tables: BTreeSet<i32> = outstanding.iter().filter_map(|o| o.table_number).collect();
    let orders = mark_orders_paid_txn(storage, txn, outstanding, None, now)?;
    let group_set: BTreeSet<i64> = group_ids.iter().copied().collect();
    let groups = complete_groups_txn(storage, txn, &group_set, Some(payment_id), now)?;
    let released_tables = release_tables_txn(storage, txn, &tables)?;

    Ok(SettlementEffects {
        orders,
        groups,
        released_tables,
    })
}

/// Release tables that no longer have outstanding orders
pub fn release_tables_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    numbers: &BTreeSet<i32>,
) -> StorageResult<Vec<Table>> {
    let mut released = Vec::new();
    for number in numbers {
        if let Some(table) = tables::release_txn(storage, txn, *number)? {
            tracing::info!(table_number = number, "Table released after settlement");
            released.push(table);
        }
    }
    Ok(released)
}
