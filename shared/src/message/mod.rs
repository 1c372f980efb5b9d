//! Real-time event envelope
//!
//! Every event pushed through the fan-out hub is wrapped in a
//! [`RealtimeMessage`]. Consumers must tolerate additive fields in `data`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Named real-time events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// Orders were created
    NewOrder,
    /// A single order changed
    UpdateOrder,
    /// Orders or a payment were settled / failed
    Payment,
    /// A table changed (staff view)
    UpdateTable,
    /// A reservation was placed or cancelled
    Reservation,
    /// The server is dropping this session (e.g. QR token rotated)
    Logout,
    /// Handshake sent right after the socket is accepted
    Connected,
}

impl RealtimeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewOrder => "new-order",
            Self::UpdateOrder => "update-order",
            Self::Payment => "payment",
            Self::UpdateTable => "update-table",
            Self::Reservation => "reservation",
            Self::Logout => "logout",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope sent over the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub event: RealtimeEvent,
    pub data: Value,
    /// Unix millis at emit time
    pub timestamp: i64,
}

impl RealtimeMessage {
    pub fn new(event: RealtimeEvent, data: Value) -> Self {
        Self {
            event,
            data,
            timestamp: crate::util::now_millis(),
        }
    }

    /// Serialize a payload into an envelope; serialization failure degrades to `null`
    pub fn from_payload<T: Serialize>(event: RealtimeEvent, payload: &T) -> Self {
        let data = serde_json::to_value(payload).unwrap_or(Value::Null);
        Self::new(event, data)
    }

    /// JSON text frame
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
