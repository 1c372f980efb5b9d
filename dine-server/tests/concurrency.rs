//! 并发测试 - 基于磁盘 redb 的真实写事务竞争
//!
//! - 多个访客同时预订同一桌台：只有一个成功
//! - 结账与改单同时进行：不会出现 "已结账订单被修改"
//! - 同一银行交易并发投递：只入账一次
//! - 到账与改单同时进行：订单组不会以少于应付的金额被结清

use dine_server::orders::StoredMenu;
use dine_server::payments::{BankNotification, PaymentConfig, ReconcileOutcome};
use dine_server::{FanoutHub, Origin, OrdersManager, PaymentService, Storage, TableManager};
use shared::error::{AppResult, ErrorCode};
use shared::models::{
    CreateOrders, CreatePayment, DishStatus, DishUpsert, OrderActor, OrderItemInput, OrderStatus,
    OrderType, OrderUpdate, Payment, PaymentMethod, PaymentStatus, TableCreate, TableStatus,
};
use std::sync::{Arc, Barrier};
use std::thread;

const RESERVE_THREADS: usize = 16;
const DELIVERY_THREADS: usize = 8;

struct Fixture {
    storage: Storage,
    orders: OrdersManager,
    payments: PaymentService,
    _dir: tempfile::TempDir,
}

fn open_storage(dir: &tempfile::TempDir) -> Storage {
    Storage::open(dir.path().join("dine.redb")).unwrap()
}

fn setup() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let hub = FanoutHub::default();
    let menu = StoredMenu::new(storage.clone());
    menu.upsert_dish(
        "D1",
        DishUpsert {
            name: "Pho".into(),
            price: 48000.0,
            image: None,
            description: None,
            status: DishStatus::Available,
        },
    )
    .unwrap();
    let orders = OrdersManager::new(storage.clone(), hub.clone(), Arc::new(menu));
    let payments = PaymentService::new(
        storage.clone(),
        hub,
        PaymentConfig {
            webhook_api_key: "test-webhook-key".into(),
            bank_account: "0123499999".into(),
            bank_name: "VCB".into(),
            qr_base_url: "https://img.vietqr.io/image".into(),
            reference_prefix: "DH".into(),
        },
    );
    Fixture {
        storage,
        orders,
        payments,
        _dir: dir,
    }
}

/// 访客 1 的一份外带 Pho，返回 (group_id, order_id)
fn takeaway(f: &Fixture) -> (i64, i64) {
    let detail = f
        .orders
        .create_orders(
            OrderActor::Guest(1),
            None,
            CreateOrders {
                table_number: None,
                order_type: OrderType::Takeaway,
                items: vec![OrderItemInput {
                    dish_id: "D1".into(),
                    quantity: 1,
                }],
                delivery: None,
                takeaway: None,
            },
            &Origin::system(),
        )
        .unwrap();
    (detail.group.id, detail.orders[0].id)
}

fn bank_link(f: &Fixture, group_id: i64) -> Payment {
    f.payments
        .create_payment_link(
            CreatePayment {
                order_group_ids: vec![group_id],
                method: PaymentMethod::Bank,
            },
            None,
        )
        .unwrap()
}

fn transfer(tx_id: &str, reference: &str, amount: f64) -> BankNotification {
    BankNotification {
        id: Some(tx_id.into()),
        content: Some(format!("{reference} thanh toan")),
        transfer_type: "in".into(),
        transfer_amount: amount,
        ..Default::default()
    }
}

/// 两个操作在 barrier 之后同时开始
fn race<A, B>(
    a: impl FnOnce() -> A + Send + 'static,
    b: impl FnOnce() -> B + Send + 'static,
) -> (A, B)
where
    A: Send + 'static,
    B: Send + 'static,
{
    let barrier = Arc::new(Barrier::new(2));
    let first = {
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            a()
        })
    };
    let second = thread::spawn(move || {
        barrier.wait();
        b()
    });
    (first.join().unwrap(), second.join().unwrap())
}

fn status_update(status: OrderStatus) -> OrderUpdate {
    OrderUpdate {
        status: Some(status),
        ..Default::default()
    }
}

#[test]
fn concurrent_reservations_have_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let tables =
        TableManager::new(storage.clone(), FanoutHub::default(), "http://localhost:5173");
    let table = tables
        .create_table(TableCreate {
            number: 7,
            capacity: 4,
            location: None,
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(RESERVE_THREADS));
    let handles: Vec<_> = (0..RESERVE_THREADS)
        .map(|i| {
            let tables = tables.clone();
            let token = table.token.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let guest_id = 100 + i as i64;
                barrier.wait();
                tables.reserve(7, &token, guest_id, 1_735_758_000_000, None, &Origin::system())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.code, ErrorCode::TableNotAvailable);
    }

    let stored = storage.get_table(7).unwrap().unwrap();
    assert_eq!(stored.status, TableStatus::Reserved);
    assert!(stored.is_consistent());
    assert_eq!(
        stored.reservation.map(|r| r.guest_id),
        winners[0].reservation.as_ref().map(|r| r.guest_id)
    );
}

#[test]
fn pay_and_status_update_race_never_reopens_settled_orders() {
    let f = setup();
    let (_, order_id) = takeaway(&f);

    let (payer, updater) = (f.orders.clone(), f.orders.clone());
    let (settlement, update) = race(
        move || payer.pay_orders(1, 900, &Origin::system()),
        move || {
            updater.update_order(
                order_id,
                status_update(OrderStatus::Processing),
                901,
                &Origin::system(),
            )
        },
    );

    let settlement = settlement.unwrap();
    assert_eq!(settlement.amount, 48000.0);
    let stored = f.storage.get_order(order_id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(f.storage.count_revenues().unwrap(), 1);

    match update {
        // 状态先推进，随后被结清
        Ok(order) => assert_eq!(order.status, OrderStatus::Processing),
        // 结账先提交：状态更新被拒绝
        Err(e) => assert_eq!(e.code, ErrorCode::OrderAlreadyPaid),
    }
}

#[test]
fn pay_and_quantity_update_race_never_modifies_settled_orders() {
    let f = setup();
    let (_, order_id) = takeaway(&f);

    let (payer, updater) = (f.orders.clone(), f.orders.clone());
    let (settlement, update) = race(
        move || payer.pay_orders(1, 900, &Origin::system()),
        move || {
            updater.update_order(
                order_id,
                OrderUpdate {
                    quantity: Some(3),
                    ..Default::default()
                },
                901,
                &Origin::system(),
            )
        },
    );

    let settlement = settlement.unwrap();
    let stored = f.storage.get_order(order_id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);

    match update {
        // 改单先提交：结算金额包含新数量
        Ok(_) => {
            assert_eq!(stored.quantity, 3);
            assert_eq!(settlement.amount, 144000.0);
        }
        // 结账先提交：改单被拒绝，数量不变
        Err(e) => {
            assert_eq!(e.code, ErrorCode::OrderAlreadyPaid);
            assert_eq!(stored.quantity, 1);
            assert_eq!(settlement.amount, 48000.0);
        }
    }
}

#[test]
fn concurrent_duplicate_deliveries_settle_once() {
    let f = setup();
    let (group_id, _) = takeaway(&f);
    let payment = bank_link(&f, group_id);

    let barrier = Arc::new(Barrier::new(DELIVERY_THREADS));
    let handles: Vec<_> = (0..DELIVERY_THREADS)
        .map(|_| {
            let payments = f.payments.clone();
            let barrier = barrier.clone();
            let notification = transfer("92704", &payment.reference_code, 48000.0);
            thread::spawn(move || {
                barrier.wait();
                payments.reconcile(&notification)
            })
        })
        .collect();

    let outcomes: Vec<ReconcileOutcome> = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<AppResult<_>>()
        .unwrap();
    let succeeded = outcomes
        .iter()
        .filter(|o| **o == ReconcileOutcome::Succeeded(payment.id))
        .count();
    assert_eq!(succeeded, 1);
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, ReconcileOutcome::Succeeded(_) | ReconcileOutcome::Duplicate))
    );

    let stored = f.storage.get_payment(payment.id).unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    assert_eq!(stored.transaction_id.as_deref(), Some("92704"));
    assert_eq!(f.storage.count_revenues().unwrap(), 1);
    assert!(f.storage.get_group(group_id).unwrap().unwrap().is_paid);
}

#[test]
fn webhook_and_order_update_race_never_underpays() {
    let f = setup();
    let (group_id, order_id) = takeaway(&f);
    let payment = bank_link(&f, group_id);
    let notification = transfer("1", &payment.reference_code, 48000.0);

    let (payments, updater) = (f.payments.clone(), f.orders.clone());
    let (outcome, update) = race(
        move || payments.reconcile(&notification),
        move || {
            updater.update_order(
                order_id,
                OrderUpdate {
                    quantity: Some(3),
                    ..Default::default()
                },
                901,
                &Origin::system(),
            )
        },
    );

    let outcome = outcome.unwrap();
    let order = f.storage.get_order(order_id).unwrap().unwrap();
    let group = f.storage.get_group(group_id).unwrap().unwrap();
    let revenues = f.storage.list_revenues(|_| true).unwrap();

    match update {
        // 到账先提交：订单已结清，改单被拒绝
        Err(e) => {
            assert_eq!(e.code, ErrorCode::OrderAlreadyPaid);
            assert_eq!(outcome, ReconcileOutcome::Succeeded(payment.id));
            assert_eq!(order.quantity, 1);
            assert_eq!(order.status, OrderStatus::Paid);
            assert!(group.is_paid);
            assert_eq!(revenues.len(), 1);
            assert_eq!(revenues[0].amount, 48000.0);
        }
        // 改单先提交：旧链接作废，转账需退款，订单保持未付
        Ok(updated) => {
            assert_eq!(updated.quantity, 3);
            assert_eq!(outcome, ReconcileOutcome::AlreadyFinal(payment.id));
            assert_ne!(order.status, OrderStatus::Paid);
            assert!(!group.is_paid);
            assert!(revenues.is_empty());
            assert_eq!(
                f.storage.get_payment(payment.id).unwrap().unwrap().status,
                PaymentStatus::Failed
            );
        }
    }
}
