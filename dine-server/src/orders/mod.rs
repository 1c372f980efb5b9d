//! Order Lifecycle Service
//!
//! 订单与订单组的唯一写入方：
//!
//! - `create_orders` - 整批快照菜品并写入 (全部成功或全部失败)
//! - `update_order` - 员工推进状态 / 改菜 / 改数量，记录经手人
//! - `pay_orders` - 员工现金结账，与 `update_order` 互斥 (同一 redb 写事务序列)
//!
//! 写入提交后再发布实时事件，发布失败只记录日志，不回滚。
//!
//! # 结算锁
//!
//! 已 Paid 的订单 (以及已付清订单组内的订单) 拒绝任何修改，
//! 因此并发的状态更新不会把已结账订单 "复活" 为 Pending。

pub mod menu;
pub mod policy;
pub mod settlement;

pub use menu::{MenuCatalog, StoredMenu};
pub use policy::{ForwardOnlyTransitions, PermissiveTransitions, TransitionPolicy};
pub use settlement::SettlementEffects;

use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::RealtimeEvent;
use shared::models::{
    CreateOrders, DishSnapshot, Order, OrderActor, OrderFilter, OrderGroup, OrderGroupDetail,
    OrderStatus, OrderType, OrderUpdate, PaymentMethod, Revenue,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::hub::{Channel, FanoutHub, Origin};
use crate::revenue::{RevenueEntry, RevenueLedger};
use crate::storage::Storage;
use crate::tables;

/// 员工现金结账结果 (同时作为 `payment` 事件负载)
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub settlement_id: i64,
    pub guest_id: i64,
    pub handler_id: i64,
    pub amount: f64,
    pub orders: Vec<Order>,
    pub order_group_ids: Vec<i64>,
    pub paid_group_ids: Vec<i64>,
    pub revenue: Option<Revenue>,
}

#[derive(Clone)]
pub struct OrdersManager {
    storage: Storage,
    hub: FanoutHub,
    menu: Arc<dyn MenuCatalog>,
    policy: Arc<dyn TransitionPolicy>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("menu", &self.menu)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OrdersManager {
    pub fn new(storage: Storage, hub: FanoutHub, menu: Arc<dyn MenuCatalog>) -> Self {
        Self {
            storage,
            hub,
            menu,
            policy: Arc::new(PermissiveTransitions),
        }
    }

    /// 替换状态流转策略
    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// 由购物车创建一个订单组
    ///
    /// `actor` 为订单归属方，员工代客下单时为该访客。`handler_id` 记录代下单的员工。
    pub fn create_orders(
        &self,
        actor: OrderActor,
        handler_id: Option<i64>,
        request: CreateOrders,
        origin: &Origin,
    ) -> AppResult<OrderGroupDetail> {
        if request.items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        for item in &request.items {
            shared::money::validate_quantity(item.quantity)
                .map_err(|e| e.with_detail("dish_id", item.dish_id.clone()))?;
        }
        if request.order_type == OrderType::Delivery && request.delivery.is_none() {
            return Err(AppError::validation("Delivery orders need delivery info"));
        }

        let table_number = self.resolve_table(actor, &request)?;

        // 快照在事务外获取：任何一项失败则整批不写入
        let snapshots: Vec<(DishSnapshot, i32)> = request
            .items
            .iter()
            .map(|item| self.menu.snapshot(&item.dish_id).map(|dish| (dish, item.quantity)))
            .collect::<AppResult<_>>()?;

        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;

        let occupied = match table_number {
            Some(number) => tables::occupy_txn(&self.storage, &txn, number, actor.guest_id())?,
            None => None,
        };

        let group_id = self.storage.next_group_id(&txn)?;
        let mut orders = Vec::with_capacity(snapshots.len());
        for (dish, quantity) in snapshots {
            // 分配后立即写入，下一次分配才能看到该 key
            let order = Order {
                id: self.storage.next_order_id(&txn)?,
                group_id,
                actor,
                table_number,
                dish,
                quantity,
                status: OrderStatus::Pending,
                handler_id,
                created_at: now,
                updated_at: now,
            };
            self.storage.put_order_txn(&txn, &order)?;
            orders.push(order);
        }

        let group = OrderGroup {
            id: group_id,
            actor,
            table_number,
            order_type: request.order_type,
            order_ids: orders.iter().map(|o| o.id).collect(),
            delivery: request.delivery,
            takeaway: request.takeaway,
            is_paid: false,
            paid_at: None,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.put_group_txn(&txn, &group)?;
        let detail = detail_of(group, orders)?;
        Storage::commit(txn)?;

        tracing::info!(
            group_id,
            actor_id = actor.id(),
            table_number = ?table_number,
            items = detail.orders.len(),
            total = detail.total,
            "Orders created"
        );

        self.hub
            .publish(RealtimeEvent::NewOrder, &detail, [actor.id()], origin);
        if let Some(table) = occupied {
            self.hub
                .emit_to_room(Channel::Managers, RealtimeEvent::UpdateTable, &table);
        }
        Ok(detail)
    }

    /// 员工更新单个订单 (状态 / 菜品 / 数量)
    pub fn update_order(
        &self,
        order_id: i64,
        update: OrderUpdate,
        handler_id: i64,
        origin: &Origin,
    ) -> AppResult<Order> {
        if let Some(quantity) = update.quantity {
            shared::money::validate_quantity(quantity)?;
        }
        let snapshot = match &update.dish_id {
            Some(dish_id) => Some(self.menu.snapshot(dish_id)?),
            None => None,
        };

        let txn = self.storage.begin_write()?;
        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))?;

        if order.status == OrderStatus::Paid {
            return Err(AppError::with_message(
                ErrorCode::OrderAlreadyPaid,
                format!("Order {} is already paid", order_id),
            ));
        }
        if self
            .storage
            .get_group_txn(&txn, order.group_id)?
            .is_some_and(|g| g.is_paid)
        {
            return Err(AppError::with_message(
                ErrorCode::OrderAlreadyPaid,
                format!("Order group {} is already paid", order.group_id),
            ));
        }

        let owed_before = owed(&order)?;
        if let Some(status) = update.status {
            self.policy.check(order.status, status)?;
            order.status = status;
        }
        if let Some(dish) = snapshot {
            order.dish = dish;
        }
        if let Some(quantity) = update.quantity {
            order.quantity = quantity;
        }
        let now = shared::util::now_millis();
        order.handler_id = Some(handler_id);
        order.updated_at = now;
        self.storage.put_order_txn(&txn, &order)?;

        // 金额变化后旧收款链接作废
        let superseded = if owed(&order)? != owed_before {
            settlement::supersede_pending_payments_txn(
                &self.storage,
                &txn,
                &BTreeSet::from([order.group_id]),
                &format!("Superseded: order {} changed after the link was issued", order_id),
                now,
            )?
        } else {
            Vec::new()
        };
        Storage::commit(txn)?;

        tracing::info!(order_id, status = ?order.status, handler_id, "Order updated");
        let actor_id = order.actor.id();
        self.hub
            .publish(RealtimeEvent::UpdateOrder, &order, [actor_id], origin);
        for payment in &superseded {
            self.hub
                .publish(RealtimeEvent::Payment, payment, [actor_id], origin);
        }
        Ok(order)
    }

    /// 员工结账：访客所有未结订单 → Paid，并记一笔营收
    ///
    /// 覆盖这些订单组的 pending 收款链接同时作废，之后的转账不会再记一笔营收。
    pub fn pay_orders(
        &self,
        guest_id: i64,
        handler_id: i64,
        origin: &Origin,
    ) -> AppResult<Settlement> {
        let now = shared::util::now_millis();
        let txn = self.storage.begin_write()?;

        let outstanding = self.storage.find_orders_txn(&txn, |o| {
            o.actor.guest_id() == Some(guest_id) && o.status.is_outstanding()
        })?;
        if outstanding.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::NoOutstandingOrders,
                format!("Guest {} has no outstanding orders", guest_id),
            ));
        }

        let settlement_id = shared::util::snowflake_id();
        let amount = shared::money::to_f64(settlement::outstanding_total(&outstanding)?);
        let group_ids: BTreeSet<i64> = outstanding.iter().map(|o| o.group_id).collect();
        let table_numbers: BTreeSet<i32> = outstanding
            .iter()
            .filter_map(|o| o.table_number)
            .collect();

        let orders = settlement::mark_orders_paid_txn(
            &self.storage,
            &txn,
            outstanding,
            Some(handler_id),
            now,
        )?;
        let paid_groups =
            settlement::complete_groups_txn(&self.storage, &txn, &group_ids, None, now)?;
        let released = settlement::release_tables_txn(&self.storage, &txn, &table_numbers)?;
        let superseded = settlement::supersede_pending_payments_txn(
            &self.storage,
            &txn,
            &group_ids,
            &format!("Superseded: settled in cash (settlement {})", settlement_id),
            now,
        )?;
        let revenue = RevenueLedger::append_txn(
            &self.storage,
            &txn,
            RevenueEntry {
                source_id: crate::revenue::settlement_source(settlement_id),
                payment_id: None,
                order_group_ids: group_ids.iter().copied().collect(),
                amount,
                method: PaymentMethod::Cash,
            },
        )?;
        Storage::commit(txn)?;

        let settlement = Settlement {
            settlement_id,
            guest_id,
            handler_id,
            amount,
            orders,
            order_group_ids: group_ids.into_iter().collect(),
            paid_group_ids: paid_groups.iter().map(|g| g.id).collect(),
            revenue,
        };
        tracing::info!(
            settlement_id,
            guest_id,
            handler_id,
            amount,
            orders = settlement.orders.len(),
            "Orders settled"
        );

        self.hub
            .publish(RealtimeEvent::Payment, &settlement, [guest_id], origin);
        for payment in &superseded {
            self.hub
                .publish(RealtimeEvent::Payment, payment, [guest_id], origin);
        }
        for table in &released {
            self.hub
                .emit_to_room(Channel::Managers, RealtimeEvent::UpdateTable, table);
        }
        Ok(settlement)
    }

    pub fn get_order(&self, order_id: i64) -> AppResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| AppError::order_not_found(order_id))
    }

    pub fn get_orders(&self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        Ok(self.storage.list_orders(|o| filter.matches(o))?)
    }

    pub fn get_order_detail(&self, group_id: i64) -> AppResult<OrderGroupDetail> {
        let (group, orders) = self
            .storage
            .get_group_with_orders(group_id)?
            .ok_or_else(|| AppError::order_group_not_found(group_id))?;
        detail_of(group, orders)
    }

    /// 访客自己的订单组 (最早的在前)
    pub fn get_guest_orders(&self, guest_id: i64) -> AppResult<Vec<OrderGroupDetail>> {
        let actor = OrderActor::Guest(guest_id);
        let groups = self.storage.list_groups(|g| g.actor == actor)?;
        let mut by_group: HashMap<i64, Vec<Order>> = HashMap::new();
        for order in self.storage.list_orders(|o| o.actor == actor)? {
            by_group.entry(order.group_id).or_default().push(order);
        }

        groups
            .into_iter()
            .map(|group| {
                let orders = by_group.remove(&group.id).unwrap_or_default();
                detail_of(group, orders)
            })
            .collect()
    }

    /// 堂食桌号：访客默认使用其扫码绑定的桌台，且不能替其他桌台下单。
    /// 外带与外送不关联桌台。
    fn resolve_table(&self, actor: OrderActor, request: &CreateOrders) -> AppResult<Option<i32>> {
        if request.order_type != OrderType::DineIn {
            if let Some(number) = request.table_number {
                tracing::debug!(
                    table_number = number,
                    order_type = ?request.order_type,
                    "Table number ignored for non dine-in order"
                );
            }
            return Ok(None);
        }

        let bound = match actor {
            OrderActor::Guest(guest_id) => self
                .storage
                .get_guest(guest_id)?
                .and_then(|g| g.table_number),
            OrderActor::Customer(_) => None,
        };
        match (request.table_number, bound) {
            (Some(requested), Some(bound)) if requested != bound => Err(AppError::forbidden(format!(
                "Guest is seated at table {}, not {}",
                bound, requested
            ))),
            (Some(number), _) | (None, Some(number)) => Ok(Some(number)),
            (None, None) => Err(AppError::validation("Dine-in orders need a table number")),
        }
    }
}

fn detail_of(group: OrderGroup, orders: Vec<Order>) -> AppResult<OrderGroupDetail> {
    let total = shared::money::to_f64(settlement::orders_total(&orders)?);
    Ok(OrderGroupDetail {
        group,
        orders,
        total,
    })
}

/// 该行仍欠的金额 (已付或已取消为 0)
fn owed(order: &Order) -> AppResult<rust_decimal::Decimal> {
    if order.status.is_outstanding() {
        shared::money::line_total(order.dish.price, order.quantity)
    } else {
        Ok(rust_decimal::Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DishStatus, DishUpsert, OrderItemInput, Table, TableStatus};

    struct Fixture {
        storage: Storage,
        menu: StoredMenu,
        orders: OrdersManager,
    }

    fn setup() -> Fixture {
        let storage = Storage::open_in_memory().unwrap();
        let menu = StoredMenu::new(storage.clone());
        let orders =
            OrdersManager::new(storage.clone(), FanoutHub::default(), Arc::new(menu.clone()));
        menu.upsert_dish("D1", dish("Pho", 45.5)).unwrap();
        menu.upsert_dish("D2", dish("Tra da", 5.0)).unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .put_table_txn(
                &txn,
                &Table {
                    id: 1,
                    number: 7,
                    capacity: 4,
                    status: TableStatus::Available,
                    token: "abc123".into(),
                    location: None,
                    reservation: None,
                    created_at: 0,
                    updated_at: 0,
                },
            )
            .unwrap();
        Storage::commit(txn).unwrap();

        Fixture { storage, menu, orders }
    }

    fn dish(name: &str, price: f64) -> DishUpsert {
        DishUpsert {
            name: name.into(),
            price,
            image: None,
            description: None,
            status: DishStatus::Available,
        }
    }

    fn cart(items: &[(&str, i32)]) -> CreateOrders {
        CreateOrders {
            table_number: Some(7),
            order_type: OrderType::DineIn,
            items: items
                .iter()
                .map(|(id, q)| OrderItemInput {
                    dish_id: id.to_string(),
                    quantity: *q,
                })
                .collect(),
            delivery: None,
            takeaway: None,
        }
    }

    #[test]
    fn test_create_orders_snapshots_and_occupies_table() {
        let f = setup();
        let detail = f
            .orders
            .create_orders(
                OrderActor::Guest(1),
                None,
                cart(&[("D1", 2), ("D2", 1)]),
                &Origin::system(),
            )
            .unwrap();

        assert_eq!(detail.orders.len(), 2);
        assert_eq!(detail.total, 96.0);
        assert!(detail.orders.iter().all(|o| o.status == OrderStatus::Pending));
        assert_eq!(
            f.storage.get_table(7).unwrap().unwrap().status,
            TableStatus::Occupied
        );
    }

    #[test]
    fn test_create_orders_is_all_or_nothing() {
        let f = setup();
        let err = f
            .orders
            .create_orders(
                OrderActor::Guest(1),
                None,
                cart(&[("D1", 1), ("missing", 1)]),
                &Origin::system(),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DishNotFound);
        assert!(f.orders.get_orders(&OrderFilter::default()).unwrap().is_empty());
        assert_eq!(
            f.storage.get_table(7).unwrap().unwrap().status,
            TableStatus::Available
        );
    }

    #[test]
    fn test_create_orders_rejects_bad_quantity_and_empty_cart() {
        let f = setup();
        let empty = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[]), &Origin::system())
            .unwrap_err();
        assert_eq!(empty.code, ErrorCode::OrderEmpty);

        let zero = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 0)]), &Origin::system())
            .unwrap_err();
        assert_eq!(zero.code, ErrorCode::InvalidQuantity);
    }

    #[test]
    fn test_snapshot_survives_reprice() {
        let f = setup();
        let detail = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 2)]), &Origin::system())
            .unwrap();

        f.menu.upsert_dish("D1", dish("Pho", 60.0)).unwrap();

        let reread = f.orders.get_order_detail(detail.group.id).unwrap();
        assert_eq!(reread.orders[0].dish.price, 45.5);
        assert_eq!(reread.orders[0].status, OrderStatus::Pending);
        assert_eq!(reread.total, 91.0);
    }

    #[test]
    fn test_update_order_records_handler() {
        let f = setup();
        let detail = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 1)]), &Origin::system())
            .unwrap();
        let order_id = detail.orders[0].id;

        let updated = f
            .orders
            .update_order(
                order_id,
                OrderUpdate {
                    status: Some(OrderStatus::Processing),
                    quantity: Some(3),
                    ..Default::default()
                },
                99,
                &Origin::system(),
            )
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Processing);
        assert_eq!(updated.quantity, 3);
        assert_eq!(updated.handler_id, Some(99));

        let missing = f
            .orders
            .update_order(1, OrderUpdate::default(), 99, &Origin::system())
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_strict_policy_can_be_swapped_in() {
        let f = setup();
        let orders = f.orders.clone().with_policy(Arc::new(ForwardOnlyTransitions));
        let detail = orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 1)]), &Origin::system())
            .unwrap();
        let id = detail.orders[0].id;

        let update = |status| OrderUpdate {
            status: Some(status),
            ..Default::default()
        };
        orders.update_order(id, update(OrderStatus::Delivered), 1, &Origin::system()).unwrap();
        let err = orders
            .update_order(id, update(OrderStatus::Pending), 1, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn test_pay_orders_settles_and_locks() {
        let f = setup();
        let detail = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 2)]), &Origin::system())
            .unwrap();

        let settlement = f.orders.pay_orders(1, 50, &Origin::system()).unwrap();
        assert_eq!(settlement.amount, 91.0);
        assert_eq!(settlement.paid_group_ids, vec![detail.group.id]);
        assert!(settlement.revenue.is_some());
        assert_eq!(f.storage.count_revenues().unwrap(), 1);
        assert_eq!(
            f.storage.get_table(7).unwrap().unwrap().status,
            TableStatus::Available
        );

        // 结算锁
        let err = f
            .orders
            .update_order(
                detail.orders[0].id,
                OrderUpdate {
                    status: Some(OrderStatus::Pending),
                    ..Default::default()
                },
                50,
                &Origin::system(),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);

        // 无未结订单
        let again = f.orders.pay_orders(1, 50, &Origin::system()).unwrap_err();
        assert_eq!(again.code, ErrorCode::NoOutstandingOrders);
        assert_eq!(f.storage.count_revenues().unwrap(), 1);
    }

    #[test]
    fn test_pay_orders_skips_cancelled_lines() {
        let f = setup();
        let detail = f
            .orders
            .create_orders(
                OrderActor::Guest(1),
                None,
                cart(&[("D1", 1), ("D2", 2)]),
                &Origin::system(),
            )
            .unwrap();
        f.orders
            .update_order(
                detail.orders[0].id,
                OrderUpdate {
                    status: Some(OrderStatus::Cancelled),
                    ..Default::default()
                },
                2,
                &Origin::system(),
            )
            .unwrap();

        let settlement = f.orders.pay_orders(1, 2, &Origin::system()).unwrap();
        assert_eq!(settlement.amount, 10.0);
        assert_eq!(settlement.orders.len(), 1);
        assert_eq!(settlement.paid_group_ids.len(), 1);
    }

    #[test]
    fn test_guest_cannot_order_for_other_table() {
        let f = setup();
        f.storage
            .put_guest(&shared::models::Guest {
                id: 5,
                name: None,
                table_number: Some(3),
                refresh_token: Some("s".into()),
                refresh_token_expires_at: None,
                created_at: 0,
            })
            .unwrap();

        let err = f
            .orders
            .create_orders(OrderActor::Guest(5), None, cart(&[("D1", 1)]), &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_takeaway_needs_no_table() {
        let f = setup();
        let mut request = cart(&[("D2", 1)]);
        request.order_type = OrderType::Takeaway;
        request.table_number = None;

        let detail = f
            .orders
            .create_orders(OrderActor::Customer(8), None, request, &Origin::system())
            .unwrap();
        assert_eq!(detail.group.table_number, None);
        assert_eq!(f.orders.get_guest_orders(8).unwrap().len(), 0);
    }

    #[test]
    fn test_quantity_upper_bound() {
        let f = setup();
        let err = f
            .orders
            .create_orders(
                OrderActor::Guest(1),
                None,
                cart(&[("D1", shared::money::MAX_QUANTITY + 1)]),
                &Origin::system(),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);

        let detail = f
            .orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 1)]), &Origin::system())
            .unwrap();
        let err = f
            .orders
            .update_order(
                detail.orders[0].id,
                OrderUpdate {
                    quantity: Some(i32::MAX),
                    ..Default::default()
                },
                9,
                &Origin::system(),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidQuantity);
        assert_eq!(f.orders.get_order(detail.orders[0].id).unwrap().quantity, 1);
    }

    /// 外部菜单服务返回超出金额范围的单价
    #[derive(Debug)]
    struct OversizedMenu;

    impl MenuCatalog for OversizedMenu {
        fn get_dish(&self, dish_id: &str) -> AppResult<Option<shared::models::Dish>> {
            Ok(Some(shared::models::Dish {
                id: dish_id.to_string(),
                name: "Gold leaf pho".into(),
                price: 5e28,
                image: None,
                description: None,
                status: DishStatus::Available,
            }))
        }
    }

    #[test]
    fn test_total_overflow_is_rejected_without_writes() {
        let f = setup();
        let orders = OrdersManager::new(
            f.storage.clone(),
            FanoutHub::default(),
            Arc::new(OversizedMenu),
        );
        let mut request = cart(&[("X", 2)]);
        request.order_type = OrderType::Takeaway;

        let err = orders
            .create_orders(OrderActor::Guest(1), None, request, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(f.orders.get_orders(&OrderFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_takeaway_ignores_table_number() {
        let f = setup();
        let mut request = cart(&[("D2", 1)]);
        request.order_type = OrderType::Takeaway;

        let detail = f
            .orders
            .create_orders(OrderActor::Guest(1), None, request, &Origin::system())
            .unwrap();
        assert_eq!(detail.group.table_number, None);
        assert!(detail.orders.iter().all(|o| o.table_number.is_none()));
        assert_eq!(
            f.storage.get_table(7).unwrap().unwrap().status,
            TableStatus::Available
        );
    }

    #[test]
    fn test_get_guest_orders_groups_orders() {
        let f = setup();
        f.orders
            .create_orders(OrderActor::Guest(1), None, cart(&[("D1", 1)]), &Origin::system())
            .unwrap();
        f.orders
            .create_orders(
                OrderActor::Guest(1),
                None,
                cart(&[("D2", 1), ("D2", 1)]),
                &Origin::system(),
            )
            .unwrap();

        let groups = f.orders.get_guest_orders(1).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.iter().map(|g| g.orders.len()).sum::<usize>(), 3);
    }
}
