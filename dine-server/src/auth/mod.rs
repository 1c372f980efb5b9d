//! 认证授权模块
//!
//! 令牌由外部认证协作方签发，这里只做验证：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前调用方上下文 (axum extractor)
//! - [`authenticate`] - WebSocket 等无 header 场景的手动验证

pub mod extractor;
pub mod jwt;

pub use extractor::authenticate;
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, Role};
