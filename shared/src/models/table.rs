//! Dining table model

use serde::{Deserialize, Serialize};

/// Table status
///
/// Available → Reserved → Available | Occupied, Occupied → Available,
/// any ⇄ Hidden (operator only).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Hidden,
    Reserved,
}

/// Reservation sub-record, present only while the table is Reserved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub guest_id: i64,
    /// Reserved-for time (Unix millis)
    pub reservation_time: i64,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Dining table entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    pub id: i64,
    /// Unique, human-facing table number (storage key)
    pub number: i32,
    pub capacity: i32,
    pub status: TableStatus,
    /// Opaque QR access token
    pub token: String,
    pub location: Option<String>,
    pub reservation: Option<Reservation>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Table {
    /// A reservation may exist only while status = Reserved
    pub fn is_consistent(&self) -> bool {
        match self.status {
            TableStatus::Reserved => self.reservation.is_some(),
            _ => self.reservation.is_none(),
        }
    }

    pub fn is_reserved_by(&self, guest_id: i64) -> bool {
        self.reservation
            .as_ref()
            .is_some_and(|r| r.guest_id == guest_id)
    }
}

/// Create table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCreate {
    pub number: i32,
    pub capacity: i32,
    pub location: Option<String>,
}

/// Update table payload (staff)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableUpdate {
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub status: Option<TableStatus>,
    /// Rotate the QR token and invalidate guest sessions bound to the table
    #[serde(default)]
    pub change_token: bool,
}
