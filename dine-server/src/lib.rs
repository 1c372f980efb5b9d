//! Dine Server - 餐厅扫码点餐后端
//!
//! # 架构概述
//!
//! 单进程 HTTP + WebSocket 服务，提供以下核心功能：
//!
//! - **桌台** (`tables`): 二维码令牌、预订、占用 / 释放
//! - **订单** (`orders`): 菜品快照、订单组、状态推进、现金结账
//! - **收款** (`payments`): 银行转账收款链接与 webhook 对账
//! - **营收** (`revenue`): 按结算来源去重的只追加台账
//! - **实时推送** (`hub`): 按角色 / 访客分组的 WebSocket 分发
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! dine-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── auth/          # JWT 认证
//! ├── api/           # HTTP 路由和处理器
//! ├── hub/           # 实时分发
//! ├── orders/        # 订单生命周期
//! ├── payments/      # 收款与对账
//! ├── tables/        # 桌台与预订
//! ├── storage.rs     # redb 持久化
//! ├── revenue.rs     # 营收台账
//! └── utils/         # 日志、校验
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod hub;
pub mod orders;
pub mod payments;
pub mod revenue;
pub mod storage;
pub mod tables;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use hub::{FanoutHub, Origin};
pub use orders::OrdersManager;
pub use payments::PaymentService;
pub use storage::Storage;
pub use tables::TableManager;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境：加载 `.env`，初始化日志 (LOG_LEVEL / LOG_JSON / LOG_DIR)
pub fn setup_environment() -> core::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_json = std::env::var("LOG_JSON")
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    let log_dir = std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty());
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(log_level.as_deref(), log_json, log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  _
   / __ \(_)___  ___
  / / / / / __ \/ _ \
 / /_/ / / / / /  __/
/_____/_/_/ /_/\___/
    "#
    );
}
