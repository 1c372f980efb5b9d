//! Payment Reconciliation Service
//!
//! # 流程
//!
//! ```text
//! create_payment_link ──▶ Payment(pending) + reference code (DH<id>)
//!                                 │
//! bank webhook ──verify key──▶ parse ──▶ reconcile (单个写事务)
//!                                          ├── 非转入         → Ignored
//!                                          ├── 无匹配         → Unmatched
//!                                          ├── 交易已处理      → Duplicate
//!                                          ├── Payment 已终结  → AlreadyFinal
//!                                          ├── 金额不符       → Failed
//!                                          └── Payment success + 订单组/订单 Paid
//!                                              + 桌台释放 + Revenue (同一事务提交)
//! ```
//!
//! 校验通过后始终应答 200，内部错误只记录 error 日志 (发送方不会重试 200)。
//! `recover` 在启动时补齐 success 但缺少营收记录的 Payment。

pub mod webhook;

pub use webhook::{BankNotification, verify_api_key};

use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::RealtimeEvent;
use shared::models::{CreatePayment, Order, Payment, PaymentMethod, PaymentStatus};
use std::collections::BTreeSet;

use crate::hub::{Channel, FanoutHub, Origin};
use crate::orders::settlement::{self, SettlementEffects};
use crate::revenue::{self, RevenueEntry, RevenueLedger};
use crate::security_log;
use crate::storage::Storage;

/// 收款配置
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Webhook API key (`Authorization: Apikey <key>`)
    pub webhook_api_key: String,
    /// 收款账号
    pub bank_account: String,
    /// 银行代码 (VietQR)
    pub bank_name: String,
    /// 二维码图片服务地址
    pub qr_base_url: String,
    /// 转账备注中的参考码前缀
    pub reference_prefix: String,
}

/// Webhook 应答 (校验通过后始终 200)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

impl WebhookAck {
    fn accepted(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// 单次对账结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 非转入交易
    Ignored,
    /// 找不到对应 Payment
    Unmatched,
    /// 同一银行交易重复投递
    Duplicate,
    /// Payment 已是终态
    AlreadyFinal(i64),
    /// 金额不符，Payment 标记为 failed
    Failed(i64),
    /// Payment 成功入账
    Succeeded(i64),
}

impl ReconcileOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ignored => "Ignored: not an incoming transfer",
            Self::Unmatched => "Acknowledged: no matching payment",
            Self::Duplicate => "Acknowledged: duplicate transaction",
            Self::AlreadyFinal(_) => "Acknowledged: payment already finalized",
            Self::Failed(_) => "Acknowledged: amount mismatch",
            Self::Succeeded(_) => "Payment confirmed",
        }
    }
}

/// `payment` 事件负载
#[derive(Debug, Clone, Serialize)]
pub struct PaymentNotice {
    pub payment: Payment,
    pub orders: Vec<Order>,
    pub paid_group_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct PaymentService {
    storage: Storage,
    hub: FanoutHub,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(storage: Storage, hub: FanoutHub, config: PaymentConfig) -> Self {
        Self {
            storage,
            hub,
            config,
        }
    }

    /// 为一个或多个未付订单组创建收款链接
    ///
    /// `owner` 为非员工调用方的 actor id，只能为自己的订单组下单付款。
    /// 相同订单组已有 pending 链接且金额未变时直接复用；金额已变则作废旧链接。
    pub fn create_payment_link(
        &self,
        request: CreatePayment,
        owner: Option<i64>,
    ) -> AppResult<Payment> {
        if request.method == PaymentMethod::Cash {
            return Err(AppError::invalid_request(
                "Cash payments are settled by staff, not through a payment link",
            ));
        }
        let group_ids: BTreeSet<i64> = request.order_group_ids.iter().copied().collect();
        if group_ids.is_empty() {
            return Err(AppError::validation("order_group_ids must not be empty"));
        }
        if self.config.bank_account.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                "Bank account is not configured",
            ));
        }

        let txn = self.storage.begin_write()?;

        let mut orders = Vec::new();
        for group_id in &group_ids {
            let group = self
                .storage
                .get_group_txn(&txn, *group_id)?
                .ok_or_else(|| AppError::order_group_not_found(*group_id))?;
            if owner.is_some_and(|id| group.actor.id() != id) {
                return Err(AppError::forbidden(format!(
                    "Order group {} belongs to another guest",
                    group_id
                )));
            }
            if group.is_paid {
                return Err(AppError::with_message(
                    ErrorCode::OrderGroupAlreadyPaid,
                    format!("Order group {} is already paid", group_id),
                ));
            }
            for order_id in &group.order_ids {
                if let Some(order) = self.storage.get_order_txn(&txn, *order_id)? {
                    orders.push(order);
                }
            }
        }

        let amount = shared::money::to_f64(settlement::outstanding_total(&orders)?);
        let now = shared::util::now_millis();

        let pending = self.storage.find_payments_txn(&txn, |p| {
            p.status == PaymentStatus::Pending
                && p.order_group_ids.iter().any(|id| group_ids.contains(id))
        })?;
        for mut payment in pending {
            let covered: BTreeSet<i64> = payment.order_group_ids.iter().copied().collect();
            if covered != group_ids {
                return Err(AppError::with_message(
                    ErrorCode::PaymentPendingExists,
                    format!(
                        "Payment {} is already pending for these order groups",
                        payment.id
                    ),
                ));
            }
            if shared::money::amounts_equal(payment.amount, amount) {
                tracing::debug!(payment_id = payment.id, "Reusing pending payment link");
                return Ok(payment);
            }

            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(format!(
                "Superseded: amount changed from {} to {}",
                payment.amount, amount
            ));
            payment.updated_at = now;
            self.storage.put_payment_txn(&txn, &payment)?;
            tracing::warn!(
                payment_id = payment.id,
                stale_amount = payment.amount,
                amount,
                "Stale pending payment superseded"
            );
        }

        if amount <= 0.0 {
            return Err(AppError::invalid_state(
                "Nothing left to pay for these order groups",
            ));
        }

        let id = self.storage.next_payment_id(&txn)?;
        let reference_code = webhook::reference_for(&self.config.reference_prefix, id);
        let payment = Payment {
            id,
            order_group_ids: group_ids.into_iter().collect(),
            amount,
            method: PaymentMethod::Bank,
            status: PaymentStatus::Pending,
            transaction_id: None,
            payment_link: Some(self.payment_link(amount, &reference_code)),
            reference_code,
            transaction_date: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.put_payment_txn(&txn, &payment)?;
        self.storage
            .put_payment_ref_txn(&txn, &payment.reference_code, payment.id)?;
        Storage::commit(txn)?;

        tracing::info!(
            payment_id = payment.id,
            reference_code = %payment.reference_code,
            amount,
            "Payment link created"
        );
        Ok(payment)
    }

    /// 读取 Payment；非员工只能读取自己订单组的 Payment
    pub fn get_payment(&self, id: i64, owner: Option<i64>) -> AppResult<Payment> {
        let payment = self
            .storage
            .get_payment(id)?
            .ok_or_else(|| AppError::payment_not_found(id))?;

        if let Some(owner) = owner {
            for group_id in &payment.order_group_ids {
                if self
                    .storage
                    .get_group(*group_id)?
                    .is_some_and(|g| g.actor.id() != owner)
                {
                    return Err(AppError::forbidden("Payment belongs to another guest"));
                }
            }
        }
        Ok(payment)
    }

    /// Webhook 入口
    ///
    /// 仅 API key 校验失败时返回错误 (401)，其余情况一律应答成功。
    pub fn handle_webhook(
        &self,
        authorization: Option<&str>,
        body: &[u8],
    ) -> AppResult<WebhookAck> {
        if !verify_api_key(authorization, &self.config.webhook_api_key) {
            security_log!(
                "WARN",
                "webhook_unauthorized",
                has_header = authorization.is_some()
            );
            return Err(AppError::new(ErrorCode::WebhookUnauthorized));
        }

        let notification: BankNotification = match serde_json::from_slice(body) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Malformed bank webhook payload, acknowledged without processing"
                );
                return Ok(WebhookAck::accepted("Acknowledged: malformed payload"));
            }
        };

        tracing::info!(
            transaction_id = ?notification.id,
            gateway = ?notification.gateway,
            transfer_type = %notification.transfer_type,
            amount = notification.transfer_amount,
            "Received bank webhook"
        );

        match self.reconcile(&notification) {
            Ok(outcome) => Ok(WebhookAck::accepted(outcome.message())),
            Err(e) => {
                tracing::error!(
                    transaction_id = ?notification.id,
                    code = %e.code,
                    error = %e,
                    "Bank webhook processing failed after acknowledgement"
                );
                Ok(WebhookAck::accepted("Acknowledged"))
            }
        }
    }

    /// 对账：匹配 Payment 并一次性终结
    pub fn reconcile(&self, notification: &BankNotification) -> AppResult<ReconcileOutcome> {
        if !notification.is_incoming() {
            tracing::debug!(
                transfer_type = %notification.transfer_type,
                "Ignoring non-incoming transfer"
            );
            return Ok(ReconcileOutcome::Ignored);
        }
        let Some(reference) = notification.find_reference(&self.config.reference_prefix) else {
            tracing::warn!(transaction_id = ?notification.id, "No payment reference in transfer");
            return Ok(ReconcileOutcome::Unmatched);
        };
        let tx_id = notification.id.as_deref();

        let txn = self.storage.begin_write()?;
        if let Some(tx_id) = tx_id
            && self.storage.is_transaction_processed_txn(&txn, tx_id)?
        {
            tracing::info!(transaction_id = %tx_id, "Duplicate bank transaction, skipping");
            return Ok(ReconcileOutcome::Duplicate);
        }

        let payment = match self.storage.find_payment_by_ref_txn(&txn, &reference)? {
            Some(payment_id) => self.storage.get_payment_txn(&txn, payment_id)?,
            None => None,
        };
        let Some(mut payment) = payment else {
            tracing::warn!(
                reference_code = %reference,
                transaction_id = ?tx_id,
                "No payment matches reference"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        if payment.status.is_final() {
            if let Some(tx_id) = tx_id {
                self.storage
                    .mark_transaction_processed(&txn, tx_id, payment.id)?;
                Storage::commit(txn)?;
            }
            // 钱已到账但不再入账 (链接已作废 / 已结账)，需人工退款
            tracing::warn!(
                payment_id = payment.id,
                status = ?payment.status,
                transaction_id = ?tx_id,
                amount = notification.transfer_amount,
                failure_reason = ?payment.failure_reason,
                "Transfer matched a finalized payment, manual refund required"
            );
            return Ok(ReconcileOutcome::AlreadyFinal(payment.id));
        }

        let now = shared::util::now_millis();
        payment.transaction_id = notification.id.clone();
        payment.transaction_date = notification.transaction_date.clone();
        payment.updated_at = now;

        if !shared::money::amounts_equal(payment.amount, notification.transfer_amount) {
            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(format!(
                "Amount mismatch: expected {}, received {}",
                payment.amount, notification.transfer_amount
            ));
            self.storage.put_payment_txn(&txn, &payment)?;
            if let Some(tx_id) = tx_id {
                self.storage
                    .mark_transaction_processed(&txn, tx_id, payment.id)?;
            }
            let actors = self.group_actors(&payment)?;
            Storage::commit(txn)?;

            tracing::warn!(
                payment_id = payment.id,
                expected = payment.amount,
                received = notification.transfer_amount,
                "Payment failed: amount mismatch"
            );
            let id = payment.id;
            self.publish(payment, SettlementEffects::default(), actors);
            return Ok(ReconcileOutcome::Failed(id));
        }

        payment.status = PaymentStatus::Success;
        let effects = self.finalize_txn(&txn, &payment)?;
        self.storage.put_payment_txn(&txn, &payment)?;
        if let Some(tx_id) = tx_id {
            self.storage
                .mark_transaction_processed(&txn, tx_id, payment.id)?;
        }
        Storage::commit(txn)?;

        tracing::info!(
            payment_id = payment.id,
            amount = payment.amount,
            orders = effects.orders.len(),
            "Payment confirmed"
        );
        let id = payment.id;
        let actors = effects.actor_ids();
        self.publish(payment, effects, actors);
        Ok(ReconcileOutcome::Succeeded(id))
    }

    /// 补齐 success 但未完成入账的 Payment，返回修复数量
    pub fn recover(&self) -> AppResult<usize> {
        let succeeded = self
            .storage
            .list_payments(|p| p.status == PaymentStatus::Success)?;

        let mut recovered = 0;
        for payment in succeeded {
            let txn = self.storage.begin_write()?;
            if self
                .storage
                .has_revenue_source_txn(&txn, &revenue::payment_source(payment.id))?
            {
                continue;
            }
            let effects = self.finalize_txn(&txn, &payment)?;
            Storage::commit(txn)?;

            tracing::warn!(
                payment_id = payment.id,
                orders = effects.orders.len(),
                "Recovered incomplete payment settlement"
            );
            recovered += 1;
        }

        if recovered > 0 {
            tracing::info!(recovered, "Payment recovery finished");
        }
        Ok(recovered)
    }

    /// 订单组 / 订单 Paid + 桌台释放 + Revenue，幂等
    fn finalize_txn(
        &self,
        txn: &redb::WriteTransaction,
        payment: &Payment,
    ) -> AppResult<SettlementEffects> {
        for group_id in &payment.order_group_ids {
            if let Some(group) = self.storage.get_group_txn(txn, *group_id)?
                && group.is_paid
                && group.payment_id != Some(payment.id)
            {
                tracing::warn!(
                    payment_id = payment.id,
                    group_id,
                    "Order group was already settled by another path"
                );
            }
        }

        let now = shared::util::now_millis();
        let effects = settlement::settle_groups_txn(
            &self.storage,
            txn,
            &payment.order_group_ids,
            payment.id,
            now,
        )?;
        RevenueLedger::append_txn(
            &self.storage,
            txn,
            RevenueEntry {
                source_id: revenue::payment_source(payment.id),
                payment_id: Some(payment.id),
                order_group_ids: payment.order_group_ids.clone(),
                amount: payment.amount,
                method: payment.method,
            },
        )?;
        Ok(effects)
    }

    fn group_actors(&self, payment: &Payment) -> AppResult<BTreeSet<i64>> {
        let mut actors = BTreeSet::new();
        for group_id in &payment.order_group_ids {
            if let Some(group) = self.storage.get_group(*group_id)? {
                actors.insert(group.actor.id());
            }
        }
        Ok(actors)
    }

    fn publish(&self, payment: Payment, effects: SettlementEffects, actors: BTreeSet<i64>) {
        for table in &effects.released_tables {
            self.hub
                .emit_to_room(Channel::Managers, RealtimeEvent::UpdateTable, table);
        }
        let notice = PaymentNotice {
            payment,
            paid_group_ids: effects.groups.iter().map(|g| g.id).collect(),
            orders: effects.orders,
        };
        self.hub
            .publish(RealtimeEvent::Payment, &notice, actors, &Origin::system());
    }

    fn payment_link(&self, amount: f64, reference_code: &str) -> String {
        format!(
            "{}/{}-{}-compact2.png?amount={}&addInfo={}",
            self.config.qr_base_url.trim_end_matches('/'),
            self.config.bank_name,
            self.config.bank_account,
            shared::money::to_decimal(amount).normalize(),
            reference_code
        )
    }
}
