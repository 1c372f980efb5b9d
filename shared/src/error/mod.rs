//! 统一错误体系
//!
//! 业务错误分类与 HTTP 状态的对应关系：
//!
//! | 分类 | 代码 | HTTP |
//! |------|------|------|
//! | NotFound | `NotFound`, `TableNotFound`, `OrderNotFound`, `PaymentNotFound`, `DishNotFound` | 404 |
//! | InvalidState | `InvalidState`, `TableNotAvailable`, `OrderAlreadyPaid`, ... | 409 |
//! | Forbidden | `PermissionDenied`, `StaffRequired`, `ReservationNotOwned` | 403 |
//! | Unauthorized | `NotAuthenticated`, `TokenInvalid`, `SessionExpired`, `WebhookUnauthorized` | 401 |
//! | ValidationError | `ValidationFailed`, `OrderEmpty`, `InvalidQuantity` | 400 |
//! | InternalError | `InternalError`, `DatabaseError`, `ConfigError` | 500 |
//!
//! 代码首位数字决定 [`ErrorCategory`]：0 通用、1 认证、2 权限、4 订单、
//! 5 收款、6 菜品、7 桌台、9 系统。
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let err = AppError::table_not_found(7);
//! assert_eq!(err.code, ErrorCode::TableNotFound);
//!
//! let body = ApiResponse::<()>::error(&err);
//! assert_eq!(body.code, Some(7001));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
