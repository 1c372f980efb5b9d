//! Error types and API response structures

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every request-level failure of the dine platform is an `AppError`. The
/// code decides the HTTP status, the message is shown to the caller and
/// `details` carries machine-readable context (ids, invalid fields).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the default message of the code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// 4xx: the caller can fix the request
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    // ==================== General ====================

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Precondition on the current status violated
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidState, msg)
    }

    /// Generic missing resource (`"{resource} not found"`)
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    // ==================== Auth ====================

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    // ==================== Domain lookups ====================

    pub fn table_not_found(number: i32) -> Self {
        Self::keyed(ErrorCode::TableNotFound, "Table", number)
    }

    pub fn order_not_found(order_id: i64) -> Self {
        Self::keyed(ErrorCode::OrderNotFound, "Order", order_id)
    }

    pub fn order_group_not_found(group_id: i64) -> Self {
        Self::keyed(ErrorCode::OrderGroupNotFound, "Order group", group_id)
    }

    pub fn payment_not_found(payment_id: i64) -> Self {
        Self::keyed(ErrorCode::PaymentNotFound, "Payment", payment_id)
    }

    pub fn dish_not_found(dish_id: &str) -> Self {
        Self::keyed(ErrorCode::DishNotFound, "Dish", dish_id)
    }

    fn keyed<K: Display + Into<Value> + Copy>(code: ErrorCode, what: &str, key: K) -> Self {
        Self::with_message(code, format!("{} {} not found", what, key)).with_detail("id", key)
    }

    // ==================== System ====================

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }
}

/// Error envelope returned by every failing endpoint
///
/// `{ "code": 7001, "message": "Table 7 not found", "details": { "id": 7 } }`
///
/// Successful endpoints return their payload as plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse<()> {
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        // 客户端错误由各业务点按需记录，这里只兜底系统错误
        if self.category() == ErrorCategory::System {
            tracing::error!(
                code = %self.code,
                category = %self.category(),
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new_uses_default_message() {
        let err = AppError::new(ErrorCode::NoOutstandingOrders);
        assert_eq!(err.code, ErrorCode::NoOutstandingOrders);
        assert_eq!(err.message, ErrorCode::NoOutstandingOrders.message());
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Invalid fields: capacity")
            .with_detail("fields", vec!["capacity"])
            .with_detail("table", 7);

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details["fields"], serde_json::json!(["capacity"]));
        assert_eq!(details["table"], 7);
    }

    #[test]
    fn test_domain_lookup_errors() {
        let err = AppError::table_not_found(7);
        assert_eq!(err.code, ErrorCode::TableNotFound);
        assert_eq!(err.message, "Table 7 not found");
        assert_eq!(err.details.as_ref().unwrap()["id"], 7);
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);

        let err = AppError::dish_not_found("D1");
        assert_eq!(err.code, ErrorCode::DishNotFound);
        assert_eq!(err.details.as_ref().unwrap()["id"], "D1");

        assert_eq!(
            AppError::order_group_not_found(42).message,
            "Order group 42 not found"
        );
        assert_eq!(AppError::payment_not_found(3).code, ErrorCode::PaymentNotFound);
        assert_eq!(AppError::order_not_found(9).category(), ErrorCategory::Order);
    }

    #[test]
    fn test_client_vs_system_errors() {
        let err = AppError::invalid_state("Table 7 is Occupied");
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
        assert!(err.is_client_error());

        assert_eq!(AppError::unauthorized().http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("Staff only").http_status(), StatusCode::FORBIDDEN);
        assert!(!AppError::database("disk full").is_client_error());
        assert_eq!(AppError::internal("boom").category(), ErrorCategory::System);
    }

    #[test]
    fn test_error_envelope_serialization() {
        let err = AppError::payment_not_found(123);
        let json = serde_json::to_value(ApiResponse::<()>::error(&err)).unwrap();

        assert_eq!(json["code"], 5001);
        assert_eq!(json["message"], "Payment 123 not found");
        assert_eq!(json["details"]["id"], 123);
        assert!(json.get("data").is_none());
    }
}
