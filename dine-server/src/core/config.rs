use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::hub::DEFAULT_CHANNEL_CAPACITY;
use crate::payments::PaymentConfig;

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (启动时先加载 `.env`)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (无) | 日志目录，存在时按天滚动写文件 |
/// | JWT_SECRET | (随机) | JWT 密钥，至少 32 字符 |
/// | JWT_ISSUER | dine-server | JWT 签发者 |
/// | PAYMENT_WEBHOOK_API_KEY | (空，拒绝所有 webhook) | 银行 webhook API key |
/// | BANK_ACCOUNT | (空) | 收款账号 |
/// | BANK_NAME | (空) | 银行代码 |
/// | PAYMENT_QR_BASE_URL | https://img.vietqr.io/image | 收款二维码服务 |
/// | CLIENT_URL | http://localhost:5173 | 访客点餐前端地址 |
/// | HUB_CHANNEL_CAPACITY | 64 | 每个实时连接的队列容量 |
/// | REFERENCE_PREFIX | DH | 转账参考码前缀 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/dine HTTP_PORT=8080 cargo run -p dine-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志级别
    pub log_level: String,
    /// 日志目录
    pub log_dir: Option<String>,
    /// JWT 认证配置
    pub jwt: JwtConfig,

    // === 收款 ===
    /// 银行 webhook API key
    pub webhook_api_key: String,
    pub bank_account: String,
    pub bank_name: String,
    pub qr_base_url: String,
    pub reference_prefix: String,

    /// 访客点餐前端地址 (二维码 URL 前缀)
    pub client_url: String,
    /// 实时连接队列容量
    pub hub_channel_capacity: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            jwt: JwtConfig::default(),

            webhook_api_key: std::env::var("PAYMENT_WEBHOOK_API_KEY").unwrap_or_default(),
            bank_account: std::env::var("BANK_ACCOUNT").unwrap_or_default(),
            bank_name: std::env::var("BANK_NAME").unwrap_or_default(),
            qr_base_url: std::env::var("PAYMENT_QR_BASE_URL")
                .unwrap_or_else(|_| "https://img.vietqr.io/image".into()),
            reference_prefix: std::env::var("REFERENCE_PREFIX")
                .ok()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "DH".into()),

            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            hub_channel_capacity: std::env::var("HUB_CHANNEL_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_CHANNEL_CAPACITY),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径: `{work_dir}/database/dine.redb`
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database").join("dine.redb")
    }

    pub fn payment_config(&self) -> PaymentConfig {
        PaymentConfig {
            webhook_api_key: self.webhook_api_key.clone(),
            bank_account: self.bank_account.clone(),
            bank_name: self.bank_name.clone(),
            qr_base_url: self.qr_base_url.clone(),
            reference_prefix: self.reference_prefix.clone(),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_and_database_path() {
        let config = Config::with_overrides("/tmp/dine-test", 4000);
        assert_eq!(config.http_port, 4000);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/dine-test/database/dine.redb")
        );
        assert_eq!(config.payment_config().reference_prefix, config.reference_prefix);
    }
}
