use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::{Config, Result};
use crate::hub::FanoutHub;
use crate::orders::{OrdersManager, StoredMenu};
use crate::payments::PaymentService;
use crate::revenue::RevenueLedger;
use crate::storage::Storage;
use crate::tables::TableManager;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是浅拷贝 (内部 Arc)，axum 每个请求 clone 一份。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | Storage | redb 持久化网关 |
/// | hub | FanoutHub | 实时分发 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | tables | TableManager | 桌台与预订 |
/// | orders | OrdersManager | 订单生命周期 |
/// | payments | PaymentService | 收款对账 |
/// | revenue | RevenueLedger | 营收台账 |
/// | menu | StoredMenu | 菜单协作方 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: Storage,
    pub hub: FanoutHub,
    pub jwt_service: Arc<JwtService>,
    pub tables: TableManager,
    pub orders: OrdersManager,
    pub payments: PaymentService,
    pub revenue: RevenueLedger,
    pub menu: StoredMenu,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 工作目录结构 (`{work_dir}/database`)
    /// 2. 数据库 (`{work_dir}/database/dine.redb`)
    /// 3. 各服务
    pub fn initialize(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let storage = Storage::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "Database opened");

        Ok(Self::with_storage(config.clone(), storage))
    }

    /// 使用已打开的存储组装服务 (测试使用内存数据库)
    pub fn with_storage(config: Config, storage: Storage) -> Self {
        let hub = FanoutHub::new(config.hub_channel_capacity);
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let menu = StoredMenu::new(storage.clone());
        let tables = TableManager::new(storage.clone(), hub.clone(), config.client_url.clone());
        let orders = OrdersManager::new(storage.clone(), hub.clone(), Arc::new(menu.clone()));
        let payments = PaymentService::new(storage.clone(), hub.clone(), config.payment_config());
        let revenue = RevenueLedger::new(storage.clone());

        Self {
            config,
            storage,
            hub,
            jwt_service,
            tables,
            orders,
            payments,
            revenue,
            menu,
        }
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
