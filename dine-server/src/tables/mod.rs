//! Table Reservation Manager
//!
//! 桌台状态与预订子记录的唯一写入方。
//!
//! ```text
//! Available ──reserve──▶ Reserved ──cancel──▶ Available
//!     │                     │
//!     └──────occupy─────────┴──▶ Occupied ──release (全部结清)──▶ Available
//!
//! 任意状态 ⇄ Hidden (仅员工)
//! ```
//!
//! 所有状态变更都在单个 redb 写事务内完成 "读取 → 检查前置状态 → 写入"，
//! 并发请求中只有第一个提交的事务能看到预期状态，其余返回冲突错误。

use redb::WriteTransaction;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::RealtimeEvent;
use shared::models::{Guest, Reservation, Table, TableCreate, TableStatus, TableUpdate};

use crate::hub::{Channel, FanoutHub, Origin};
use crate::security_log;
use crate::storage::{Storage, StorageResult};

/// 桌台访问令牌长度 (字节，hex 编码后翻倍)
const TABLE_TOKEN_BYTES: usize = 16;

/// 访客会话刷新令牌长度 (字节)
const GUEST_SESSION_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct TableManager {
    storage: Storage,
    hub: FanoutHub,
    client_url: String,
}

impl TableManager {
    pub fn new(storage: Storage, hub: FanoutHub, client_url: impl Into<String>) -> Self {
        Self {
            storage,
            hub,
            client_url: client_url.into(),
        }
    }

    /// 创建桌台并签发初始访问令牌
    pub fn create_table(&self, payload: TableCreate) -> AppResult<Table> {
        if payload.number <= 0 {
            return Err(AppError::validation("Table number must be positive"));
        }
        if payload.capacity <= 0 {
            return Err(AppError::validation("Capacity must be positive"));
        }

        let txn = self.storage.begin_write()?;
        if self.storage.get_table_txn(&txn, payload.number)?.is_some() {
            return Err(AppError::with_message(
                ErrorCode::TableNumberExists,
                format!("Table {} already exists", payload.number),
            ));
        }

        let now = shared::util::now_millis();
        let table = Table {
            id: shared::util::snowflake_id(),
            number: payload.number,
            capacity: payload.capacity,
            status: TableStatus::Available,
            token: shared::util::random_token(TABLE_TOKEN_BYTES),
            location: payload.location,
            reservation: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.put_table_txn(&txn, &table)?;
        Storage::commit(txn)?;

        tracing::info!(table_number = table.number, "Table created");
        self.hub
            .emit_to_room(Channel::Managers, RealtimeEvent::UpdateTable, &table);
        Ok(table)
    }

    pub fn list_tables(&self) -> AppResult<Vec<Table>> {
        Ok(self.storage.list_tables()?)
    }

    pub fn get_table(&self, number: i32) -> AppResult<Table> {
        self.storage
            .get_table(number)?
            .ok_or_else(|| AppError::table_not_found(number))
    }

    /// 扫码落地页：按 (number, token) 查找，Hidden 桌台对访客不可见
    pub fn get_table_for_guest(&self, number: i32, token: &str) -> AppResult<Table> {
        match self.storage.get_table(number)? {
            Some(table) if table.token == token && table.status != TableStatus::Hidden => Ok(table),
            _ => Err(AppError::table_not_found(number)),
        }
    }

    /// 扫码入座：创建访客会话并绑定到桌台
    pub fn check_in_guest(
        &self,
        number: i32,
        token: &str,
        name: Option<String>,
        session_ttl_ms: i64,
    ) -> AppResult<Guest> {
        let txn = self.storage.begin_write()?;
        match self.storage.get_table_txn(&txn, number)? {
            Some(table) if table.token == token && table.status != TableStatus::Hidden => {}
            _ => return Err(AppError::table_not_found(number)),
        }

        let now = shared::util::now_millis();
        let guest = Guest {
            id: self.storage.next_guest_id(&txn)?,
            name,
            table_number: Some(number),
            refresh_token: Some(shared::util::random_token(GUEST_SESSION_BYTES)),
            refresh_token_expires_at: Some(now + session_ttl_ms),
            created_at: now,
        };
        self.storage.put_guest_txn(&txn, &guest)?;
        Storage::commit(txn)?;

        tracing::info!(guest_id = guest.id, table_number = number, "Guest checked in");
        Ok(guest)
    }

    /// 访客预订
    ///
    /// 仅当桌台当前为 Available 时成功。并发预订同一桌台时只有一个请求获胜。
    pub fn reserve(
        &self,
        number: i32,
        token: &str,
        guest_id: i64,
        reservation_time: i64,
        note: Option<String>,
        origin: &Origin,
    ) -> AppResult<Table> {
        let txn = self.storage.begin_write()?;
        let mut table = self.find_by_token_txn(&txn, number, token)?;

        if table.status != TableStatus::Available {
            return Err(AppError::with_message(
                ErrorCode::TableNotAvailable,
                format!("Table {} is {:?}, cannot reserve", number, table.status),
            ));
        }

        let now = shared::util::now_millis();
        table.status = TableStatus::Reserved;
        table.reservation = Some(Reservation {
            guest_id,
            reservation_time,
            note,
            created_at: now,
        });
        table.updated_at = now;
        self.storage.put_table_txn(&txn, &table)?;
        Storage::commit(txn)?;

        tracing::info!(table_number = number, guest_id, "Table reserved");
        self.hub
            .publish(RealtimeEvent::Reservation, &table, [guest_id], origin);
        Ok(table)
    }

    /// 访客取消自己的预订 (校验归属)
    pub fn cancel_reservation(
        &self,
        number: i32,
        token: &str,
        guest_id: i64,
        origin: &Origin,
    ) -> AppResult<Table> {
        let txn = self.storage.begin_write()?;
        let mut table = self.find_by_token_txn(&txn, number, token)?;

        let owner = match (&table.status, &table.reservation) {
            (TableStatus::Reserved, Some(reservation)) => reservation.guest_id,
            _ => return Err(table_not_reserved(number)),
        };
        if owner != guest_id {
            return Err(AppError::with_message(
                ErrorCode::ReservationNotOwned,
                "Reservation belongs to another guest",
            ));
        }

        clear_reservation(&mut table);
        self.storage.put_table_txn(&txn, &table)?;
        Storage::commit(txn)?;

        tracing::info!(table_number = number, guest_id, "Reservation cancelled by guest");
        self.hub
            .publish(RealtimeEvent::Reservation, &table, [guest_id], origin);
        Ok(table)
    }

    /// 员工强制取消预订
    pub fn staff_cancel_reservation(&self, number: i32, origin: &Origin) -> AppResult<Table> {
        let txn = self.storage.begin_write()?;
        let mut table = self
            .storage
            .get_table_txn(&txn, number)?
            .ok_or_else(|| AppError::table_not_found(number))?;

        let owner = match (&table.status, &table.reservation) {
            (TableStatus::Reserved, Some(reservation)) => reservation.guest_id,
            _ => return Err(table_not_reserved(number)),
        };

        clear_reservation(&mut table);
        self.storage.put_table_txn(&txn, &table)?;
        Storage::commit(txn)?;

        tracing::info!(table_number = number, guest_id = owner, "Reservation cancelled by staff");
        self.hub
            .publish(RealtimeEvent::Reservation, &table, [owner], origin);
        Ok(table)
    }

    /// 员工更新桌台
    ///
    /// `change_token = true` 时轮换访问令牌，并在同一事务中清除绑定到该桌台的
    /// 所有访客会话。提交后强制断开这些访客的实时连接。
    pub fn update_table(
        &self,
        number: i32,
        payload: TableUpdate,
        origin: &Origin,
    ) -> AppResult<Table> {
        if payload.capacity.is_some_and(|c| c <= 0) {
            return Err(AppError::validation("Capacity must be positive"));
        }
        if payload.status == Some(TableStatus::Reserved) {
            return Err(AppError::invalid_state(
                "Reservations must be placed through the reservation flow",
            ));
        }

        let txn = self.storage.begin_write()?;
        let mut table = self
            .storage
            .get_table_txn(&txn, number)?
            .ok_or_else(|| AppError::table_not_found(number))?;

        if let Some(capacity) = payload.capacity {
            table.capacity = capacity;
        }
        if payload.location.is_some() {
            table.location = payload.location;
        }
        if let Some(status) = payload.status
            && status != table.status
        {
            table.status = status;
            table.reservation = None;
        }

        let mut invalidated = Vec::new();
        if payload.change_token {
            table.token = shared::util::random_token(TABLE_TOKEN_BYTES);
            let now = shared::util::now_millis();
            for mut guest in self.storage.guests_at_table_txn(&txn, number)? {
                if guest.has_active_session(now) {
                    invalidated.push(guest.id);
                }
                guest.invalidate_session();
                self.storage.put_guest_txn(&txn, &guest)?;
            }
        }

        table.updated_at = shared::util::now_millis();
        self.storage.put_table_txn(&txn, &table)?;
        Storage::commit(txn)?;

        if payload.change_token {
            security_log!(
                "INFO",
                "table_token_rotated",
                table_number = number,
                invalidated_sessions = invalidated.len()
            );
            for guest_id in &invalidated {
                self.hub.disconnect_actor(*guest_id);
            }
        }

        tracing::info!(table_number = number, status = ?table.status, "Table updated");
        self.hub.emit_to_room_except(
            Channel::Managers,
            RealtimeEvent::UpdateTable,
            &table,
            origin.connection_id.as_deref(),
        );
        Ok(table)
    }

    /// 访客点餐 URL (二维码内容)
    pub fn ordering_url(&self, table: &Table) -> String {
        format!(
            "{}/tables/{}?token={}",
            self.client_url.trim_end_matches('/'),
            table.number,
            table.token
        )
    }

    fn find_by_token_txn(
        &self,
        txn: &WriteTransaction,
        number: i32,
        token: &str,
    ) -> AppResult<Table> {
        match self.storage.get_table_txn(txn, number)? {
            Some(table) if table.token == token => Ok(table),
            _ => Err(AppError::table_not_found(number)),
        }
    }
}

/// 入座占用 (下单时调用，与订单写入同一事务)
///
/// Available 或由同一访客预订的 Reserved 桌台转为 Occupied。
/// 返回 `Some(table)` 表示状态发生了变化。
pub fn occupy_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    number: i32,
    guest_id: Option<i64>,
) -> AppResult<Option<Table>> {
    let mut table = storage
        .get_table_txn(txn, number)?
        .ok_or_else(|| AppError::table_not_found(number))?;

    match table.status {
        TableStatus::Occupied => return Ok(None),
        TableStatus::Available => {}
        TableStatus::Reserved if guest_id.is_some_and(|g| table.is_reserved_by(g)) => {}
        TableStatus::Reserved | TableStatus::Hidden => {
            return Err(AppError::with_message(
                ErrorCode::TableNotAvailable,
                format!("Table {} is {:?}", number, table.status),
            ));
        }
    }

    table.status = TableStatus::Occupied;
    table.reservation = None;
    table.updated_at = shared::util::now_millis();
    storage.put_table_txn(txn, &table)?;
    Ok(Some(table))
}

/// 结清后释放桌台 (该桌台已无未结订单时 Occupied → Available)
pub fn release_txn(
    storage: &Storage,
    txn: &WriteTransaction,
    number: i32,
) -> StorageResult<Option<Table>> {
    let Some(mut table) = storage.get_table_txn(txn, number)? else {
        return Ok(None);
    };
    if table.status != TableStatus::Occupied {
        return Ok(None);
    }

    let outstanding = storage.find_orders_txn(txn, |o| {
        o.table_number == Some(number) && o.status.is_outstanding()
    })?;
    if !outstanding.is_empty() {
        return Ok(None);
    }

    table.status = TableStatus::Available;
    table.updated_at = shared::util::now_millis();
    storage.put_table_txn(txn, &table)?;
    Ok(Some(table))
}

/// 解析预订时间：RFC 3339，或不带时区的 `YYYY-MM-DDTHH:MM[:SS]` (按 UTC)
pub fn parse_reservation_time(value: &str) -> AppResult<i64> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| AppError::validation(format!("Invalid reservation time: {value}")))
}

fn clear_reservation(table: &mut Table) {
    table.status = TableStatus::Available;
    table.reservation = None;
    table.updated_at = shared::util::now_millis();
}

fn table_not_reserved(number: i32) -> AppError {
    AppError::with_message(
        ErrorCode::TableNotReserved,
        format!("Table {} has no active reservation", number),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (TableManager, Storage) {
        let storage = Storage::open_in_memory().unwrap();
        let manager =
            TableManager::new(storage.clone(), FanoutHub::default(), "http://localhost:5173");
        (manager, storage)
    }

    fn seed_table(storage: &Storage, number: i32, token: &str) {
        let txn = storage.begin_write().unwrap();
        storage
            .put_table_txn(
                &txn,
                &Table {
                    id: shared::util::snowflake_id(),
                    number,
                    capacity: 4,
                    status: TableStatus::Available,
                    token: token.to_string(),
                    location: None,
                    reservation: None,
                    created_at: 0,
                    updated_at: 0,
                },
            )
            .unwrap();
        Storage::commit(txn).unwrap();
    }

    #[test]
    fn test_create_table_rejects_duplicate_number() {
        let (manager, _) = setup();
        let payload = TableCreate {
            number: 3,
            capacity: 2,
            location: None,
        };
        let table = manager.create_table(payload.clone()).unwrap();
        assert_eq!(table.status, TableStatus::Available);
        assert_eq!(table.token.len(), TABLE_TOKEN_BYTES * 2);

        let err = manager.create_table(payload).unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNumberExists);
    }

    #[test]
    fn test_reserve_requires_matching_token() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");

        let err = manager
            .reserve(7, "wrong", 1, 0, None, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNotFound);
        assert_eq!(storage.get_table(7).unwrap().unwrap().status, TableStatus::Available);
    }

    #[test]
    fn test_second_reserve_is_rejected() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");

        manager.reserve(7, "abc123", 1, 0, None, &Origin::system()).unwrap();
        let err = manager
            .reserve(7, "abc123", 2, 0, None, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNotAvailable);
        assert!(storage.get_table(7).unwrap().unwrap().is_reserved_by(1));
    }

    #[test]
    fn test_cancel_by_other_guest_is_forbidden() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");
        let reserved = manager
            .reserve(7, "abc123", 1, 0, Some("window".into()), &Origin::system())
            .unwrap();

        let err = manager
            .cancel_reservation(7, "abc123", 2, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ReservationNotOwned);
        assert_eq!(err.http_status(), http::StatusCode::FORBIDDEN);
        assert_eq!(storage.get_table(7).unwrap().unwrap(), reserved);
    }

    #[test]
    fn test_reserve_then_cancel_restores_table() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");
        let before = storage.get_table(7).unwrap().unwrap();

        manager.reserve(7, "abc123", 1, 0, None, &Origin::system()).unwrap();
        let after = manager
            .cancel_reservation(7, "abc123", 1, &Origin::system())
            .unwrap();

        assert_eq!(after.status, TableStatus::Available);
        assert!(after.reservation.is_none());
        assert_eq!(Table { updated_at: 0, ..after }, before);
    }

    #[test]
    fn test_staff_cancel_requires_reservation() {
        let (manager, storage) = setup();
        seed_table(&storage, 2, "t");
        let err = manager
            .staff_cancel_reservation(2, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNotReserved);

        manager.reserve(2, "t", 5, 0, None, &Origin::system()).unwrap();
        let table = manager.staff_cancel_reservation(2, &Origin::system()).unwrap();
        assert!(table.is_consistent());
        assert_eq!(table.status, TableStatus::Available);
    }

    #[test]
    fn test_rotation_invalidates_bound_guests() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");
        let guest = manager.check_in_guest(7, "abc123", None, 60_000).unwrap();
        assert!(guest.has_active_session(shared::util::now_millis()));
        manager
            .reserve(7, "abc123", guest.id, 0, None, &Origin::system())
            .unwrap();

        let table = manager
            .update_table(
                7,
                TableUpdate {
                    change_token: true,
                    ..Default::default()
                },
                &Origin::system(),
            )
            .unwrap();

        assert_ne!(table.token, "abc123");
        let stored = storage.get_guest(guest.id).unwrap().unwrap();
        assert!(!stored.has_active_session(0));
        assert_eq!(
            manager.get_table_for_guest(7, "abc123").unwrap_err().code,
            ErrorCode::TableNotFound
        );

        // 旧令牌不能再取消预订
        let err = manager
            .cancel_reservation(7, "abc123", guest.id, &Origin::system())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNotFound);
        assert!(storage.get_table(7).unwrap().unwrap().is_reserved_by(guest.id));

        let released = manager
            .cancel_reservation(7, &table.token, guest.id, &Origin::system())
            .unwrap();
        assert_eq!(released.status, TableStatus::Available);
    }

    #[test]
    fn test_update_rejects_direct_reserved_status() {
        let (manager, storage) = setup();
        seed_table(&storage, 1, "t");
        let err = manager
            .update_table(
                1,
                TableUpdate {
                    status: Some(TableStatus::Reserved),
                    ..Default::default()
                },
                &Origin::system(),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);
    }

    #[test]
    fn test_hiding_clears_reservation() {
        let (manager, storage) = setup();
        seed_table(&storage, 1, "t");
        manager.reserve(1, "t", 9, 0, None, &Origin::system()).unwrap();

        let table = manager
            .update_table(
                1,
                TableUpdate {
                    status: Some(TableStatus::Hidden),
                    ..Default::default()
                },
                &Origin::system(),
            )
            .unwrap();
        assert_eq!(table.status, TableStatus::Hidden);
        assert!(table.is_consistent());
        assert!(manager.get_table_for_guest(1, "t").is_err());
    }

    #[test]
    fn test_occupy_respects_reservation_owner() {
        let (manager, storage) = setup();
        seed_table(&storage, 4, "t");
        manager.reserve(4, "t", 1, 0, None, &Origin::system()).unwrap();

        let txn = storage.begin_write().unwrap();
        assert!(occupy_txn(&storage, &txn, 4, Some(2)).is_err());
        let table = occupy_txn(&storage, &txn, 4, Some(1)).unwrap().unwrap();
        assert_eq!(table.status, TableStatus::Occupied);
        assert!(table.reservation.is_none());
        assert!(occupy_txn(&storage, &txn, 4, Some(2)).unwrap().is_none());

        // 无未结订单 → 释放
        assert!(release_txn(&storage, &txn, 4).unwrap().is_some());
        Storage::commit(txn).unwrap();
        assert_eq!(storage.get_table(4).unwrap().unwrap().status, TableStatus::Available);
    }

    #[test]
    fn test_ordering_url() {
        let (manager, storage) = setup();
        seed_table(&storage, 7, "abc123");
        let table = manager.get_table(7).unwrap();
        assert_eq!(
            manager.ordering_url(&table),
            "http://localhost:5173/tables/7?token=abc123"
        );
    }

    #[test]
    fn test_parse_reservation_time() {
        let naive = parse_reservation_time("2025-01-01T19:00").unwrap();
        let rfc = parse_reservation_time("2025-01-01T19:00:00Z").unwrap();
        assert_eq!(naive, rfc);
        assert_eq!(
            parse_reservation_time("2025-01-01T20:00:00+01:00").unwrap(),
            rfc
        );
        assert!(parse_reservation_time("tomorrow").is_err());
    }
}
