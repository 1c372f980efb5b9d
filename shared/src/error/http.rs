//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::OrderGroupNotFound
            | Self::PaymentNotFound
            | Self::DishNotFound
            | Self::TableNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (precondition on current state)
            Self::InvalidState
            | Self::OrderAlreadyPaid
            | Self::NoOutstandingOrders
            | Self::OrderGroupAlreadyPaid
            | Self::PaymentPendingExists
            | Self::DishUnavailable
            | Self::TableNotAvailable
            | Self::TableNumberExists
            | Self::TableNotReserved => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::SessionExpired
            | Self::WebhookUnauthorized => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::PermissionDenied | Self::StaffRequired | Self::ReservationNotOwned => {
                StatusCode::FORBIDDEN
            }

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::OrderEmpty
            | Self::InvalidQuantity => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_status_mapping() {
        assert_eq!(ErrorCode::TableNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::TableNotAvailable.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::ReservationNotOwned.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::WebhookUnauthorized.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::ValidationFailed.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
