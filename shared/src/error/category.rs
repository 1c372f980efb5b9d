//! 错误码分段
//!
//! 错误码的千位决定所属领域，日志和前端提示都按这个分组。

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 0xxx 通用 (校验、请求格式、状态冲突)
    General,
    /// 1xxx 认证
    Auth,
    /// 2xxx 权限
    Permission,
    /// 4xxx 订单
    Order,
    /// 5xxx 收款
    Payment,
    /// 6xxx 菜品
    Dish,
    /// 7xxx 桌台
    Table,
    /// 9xxx 以及未分配的段
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Dish,
            7 => Self::Table,
            _ => Self::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Order => "order",
            Self::Payment => "payment",
            Self::Dish => "dish",
            Self::Table => "table",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
