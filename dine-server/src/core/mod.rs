//! 进程级基础设施
//!
//! - [`Config`] - 环境变量配置 (端口、工作目录、收款、JWT)
//! - [`ServerState`] - 注入到每个 handler 的服务集合
//! - [`Server`] - 启动恢复、监听、优雅退出
//! - [`ServerError`] - 启动 / 运行期错误 (请求级错误见 `AppError`)

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
