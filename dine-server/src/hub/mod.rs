//! FanoutHub - 实时事件分发
//!
//! 每个已认证连接加入自己的 self 频道 (按账户 / 访客 ID)，员工额外加入
//! 共享的 managers 频道。其他组件只通过 `emit_*` 发布事件。
//!
//! ```text
//! TableManager / OrdersManager / PaymentService
//!       │ emit (commit 之后, 非阻塞)
//!       ▼
//! FanoutHub
//!   ├── connections: conn_id → Connection (有界 mpsc Sender)
//!   └── rooms: Channel → {conn_id}
//!         │
//!         ▼
//!   WS session (每个连接一个 Receiver)
//! ```
//!
//! 投递是尽力而为：无订阅者时直接丢弃，队列满或已关闭时记录 warn 并丢弃，
//! 不做重放。客户端重连后需要主动刷新。

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use shared::message::{RealtimeEvent, RealtimeMessage};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::Role;

/// 默认每连接队列容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// 广播频道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// 所有员工连接
    Managers,
    /// 单个账户 / 访客的所有连接
    Actor(i64),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Managers => write!(f, "managers"),
            Channel::Actor(id) => write!(f, "actor:{id}"),
        }
    }
}

/// 推送给连接会话的帧
#[derive(Debug, Clone)]
pub enum HubFrame {
    Event(Arc<RealtimeMessage>),
    /// 服务端主动断开 (例如桌台二维码轮换)
    Close,
}

/// 注册成功后返回给 WS 会话的句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub conn_id: String,
    pub actor_id: i64,
    pub role: Role,
}

struct Connection {
    actor_id: i64,
    is_staff: bool,
    tx: mpsc::Sender<HubFrame>,
}

/// 事件来源：发起请求的调用方以及 (可选) 其所在连接
///
/// 发起请求的连接已经从 HTTP 响应拿到结果，因此不再回推给它。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    pub actor_id: Option<i64>,
    pub connection_id: Option<String>,
}

impl Origin {
    pub fn new(actor_id: i64, connection_id: Option<String>) -> Self {
        Self {
            actor_id: Some(actor_id),
            connection_id,
        }
    }

    /// 系统内部触发 (webhook、恢复任务)
    pub fn system() -> Self {
        Self::default()
    }
}

/// 全局实时分发 hub (注入使用，不是单例)
#[derive(Clone)]
pub struct FanoutHub {
    connections: Arc<DashMap<String, Connection>>,
    rooms: Arc<DashMap<Channel, DashSet<String>>>,
    capacity: usize,
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl fmt::Debug for FanoutHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutHub")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl FanoutHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            rooms: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// 连接建立：加入 self 频道，员工额外加入 managers
    pub fn register(
        &self,
        actor_id: i64,
        role: Role,
    ) -> (ConnectionHandle, mpsc::Receiver<HubFrame>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let conn_id = uuid::Uuid::new_v4().to_string();
        let is_staff = role.is_staff();

        self.connections.insert(
            conn_id.clone(),
            Connection {
                actor_id,
                is_staff,
                tx,
            },
        );
        self.join(Channel::Actor(actor_id), &conn_id);
        if is_staff {
            self.join(Channel::Managers, &conn_id);
        }

        tracing::debug!(conn_id = %conn_id, actor_id, role = %role, "Hub connection registered");
        (
            ConnectionHandle {
                conn_id,
                actor_id,
                role,
            },
            rx,
        )
    }

    /// 连接断开：从所有频道移除
    pub fn deregister(&self, conn_id: &str) {
        let Some((_, conn)) = self.connections.remove(conn_id) else {
            return;
        };
        self.leave(Channel::Actor(conn.actor_id), conn_id);
        if conn.is_staff {
            self.leave(Channel::Managers, conn_id);
        }
        tracing::debug!(
            conn_id = %conn_id,
            actor_id = conn.actor_id,
            "Hub connection deregistered"
        );
    }

    /// 向单个频道发布 (无订阅者时丢弃)
    pub fn emit_to_room<T: Serialize>(
        &self,
        channel: Channel,
        event: RealtimeEvent,
        payload: &T,
    ) -> usize {
        self.emit(&[channel], event, payload, None)
    }

    /// 向单个频道发布，跳过指定连接
    pub fn emit_to_room_except<T: Serialize>(
        &self,
        channel: Channel,
        event: RealtimeEvent,
        payload: &T,
        skip_conn: Option<&str>,
    ) -> usize {
        self.emit(&[channel], event, payload, skip_conn)
    }

    /// 向多个频道发布；同一连接只收到一次。返回成功入队的连接数
    pub fn emit<T: Serialize>(
        &self,
        channels: &[Channel],
        event: RealtimeEvent,
        payload: &T,
        skip_conn: Option<&str>,
    ) -> usize {
        let mut targets: HashSet<String> = HashSet::new();
        for channel in channels {
            if let Some(members) = self.rooms.get(channel) {
                targets.extend(members.iter().map(|m| m.key().clone()));
            }
        }
        if let Some(skip) = skip_conn {
            targets.remove(skip);
        }
        if targets.is_empty() {
            tracing::trace!(event = %event, "No subscribers, event dropped");
            return 0;
        }

        let message = Arc::new(RealtimeMessage::from_payload(event, payload));
        let mut delivered = 0;
        for conn_id in &targets {
            let Some(conn) = self.connections.get(conn_id) else {
                continue;
            };
            match conn.tx.try_send(HubFrame::Event(message.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        conn_id = %conn_id,
                        event = %event,
                        "Subscriber queue full, event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        conn_id = %conn_id,
                        event = %event,
                        "Subscriber gone, event dropped"
                    );
                }
            }
        }
        delivered
    }

    /// 发布到 managers 以及相关 actor 的 self 频道
    pub fn publish<T: Serialize>(
        &self,
        event: RealtimeEvent,
        payload: &T,
        actor_ids: impl IntoIterator<Item = i64>,
        origin: &Origin,
    ) -> usize {
        let mut channels = vec![Channel::Managers];
        channels.extend(actor_ids.into_iter().map(Channel::Actor));
        if let Some(id) = origin.actor_id {
            channels.push(Channel::Actor(id));
        }
        self.emit(&channels, event, payload, origin.connection_id.as_deref())
    }

    /// 强制断开某个 actor 的全部连接 (先发 logout 事件)
    pub fn disconnect_actor(&self, actor_id: i64) -> usize {
        let conn_ids: Vec<String> = self
            .rooms
            .get(&Channel::Actor(actor_id))
            .map(|members| members.iter().map(|m| m.key().clone()).collect())
            .unwrap_or_default();

        let logout = Arc::new(RealtimeMessage::from_payload(
            RealtimeEvent::Logout,
            &serde_json::json!({ "reason": "session_invalidated" }),
        ));
        let mut closed = 0;
        for conn_id in &conn_ids {
            if let Some(conn) = self.connections.get(conn_id) {
                let _ = conn.tx.try_send(HubFrame::Event(logout.clone()));
                if conn.tx.try_send(HubFrame::Close).is_ok() {
                    closed += 1;
                } else {
                    tracing::warn!(conn_id = %conn_id, actor_id, "Could not deliver close frame");
                }
            }
        }
        closed
    }

    /// 频道当前订阅连接数
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.rooms.get(&channel).map(|m| m.len()).unwrap_or(0)
    }

    /// 总连接数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn join(&self, channel: Channel, conn_id: &str) {
        self.rooms
            .entry(channel)
            .or_default()
            .insert(conn_id.to_string());
    }

    fn leave(&self, channel: Channel, conn_id: &str) {
        if let Some(members) = self.rooms.get(&channel) {
            members.remove(conn_id);
        }
        // 空频道清理
        self.rooms.remove_if(&channel, |_, members| members.is_empty());
    }
}
