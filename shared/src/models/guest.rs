//! Guest session model

use serde::{Deserialize, Serialize};

/// Guest bound to a table through the QR flow
///
/// The session credential is cleared when the table's token is rotated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guest {
    pub id: i64,
    pub name: Option<String>,
    pub table_number: Option<i32>,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<i64>,
    pub created_at: i64,
}

impl Guest {
    pub fn has_active_session(&self, now: i64) -> bool {
        self.refresh_token.is_some() && self.refresh_token_expires_at.is_none_or(|exp| exp > now)
    }

    /// Clear stored credentials
    pub fn invalidate_session(&mut self) {
        self.refresh_token = None;
        self.refresh_token_expires_at = None;
    }
}
