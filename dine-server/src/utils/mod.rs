//! 工具模块 - 日志与输入校验
//!
//! # 内容
//!
//! - [`logger`] - tracing 订阅器初始化
//! - [`validation`] - 文本长度限制与请求 DTO 校验

pub mod logger;
pub mod validation;

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
