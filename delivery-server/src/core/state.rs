use std::sync::Arc;
use std::time::Instant;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{OrderRepository, PickupRepository, UserRepository};
use crate::orders::{OrderService, PickupService};
use crate::realtime::notifier::NotifierConfig;
use crate::realtime::{IntentHandler, LocationRelay, Notifier, Publisher};

/// 服务器状态 - 持有所有服务的共享引用
///
/// ServerState 是整个后端的核心数据结构。所有字段内部都是
/// Arc/Clone 浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Surreal<Db> | 嵌入式数据库 |
/// | notifier | Notifier | 实时通知总线 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | orders | OrderService | 订单编排 |
/// | pickups | PickupService | 跑腿任务编排 |
/// | relay | LocationRelay | 骑手位置转发 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式数据库 (SurrealDB)
    pub db: Surreal<Db>,
    /// 实时通知总线
    pub notifier: Notifier,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 订单编排服务
    pub orders: OrderService,
    /// 跑腿任务编排服务
    pub pickups: PickupService,
    /// 骑手位置转发
    pub relay: LocationRelay,
    /// 启动时刻（健康检查用）
    pub started_at: Instant,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/marketplace.db)
    /// 3. 通知总线、JWT、各服务
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("marketplace.db");
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");
        let db = db_service.db;

        // 2. Initialize services
        let notifier = Notifier::from_config(NotifierConfig {
            tcp_listen_addr: format!("0.0.0.0:{}", config.channel_tcp_port),
            channel_capacity: config.channel_capacity,
        });
        let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
        let publisher: Arc<dyn Publisher> = Arc::new(notifier.clone());

        let orders = OrderService::new(
            OrderRepository::new(db.clone()),
            publisher.clone(),
            config.charges.clone(),
        );
        let pickups = PickupService::new(PickupRepository::new(db.clone()), publisher.clone());
        let relay = LocationRelay::new(
            OrderRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            publisher,
        );

        Self {
            config: config.clone(),
            db,
            notifier,
            jwt_service,
            orders,
            pickups,
            relay,
            started_at: Instant::now(),
        }
    }

    /// 启动后台任务
    ///
    /// 必须在 `Server::run()` 之前调用
    ///
    /// 启动的任务：
    /// - 实时通道 TCP 服务器
    /// - 入站意图处理器 (IntentHandler)
    pub async fn start_background_tasks(&self) {
        let handler = IntentHandler::new(
            self.notifier.clone(),
            self.orders.clone(),
            self.relay.clone(),
        );
        tokio::spawn(handler.run());

        let notifier = self.notifier.clone();
        let jwt = self.jwt_service.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.start_tcp_server(jwt).await {
                tracing::error!("Realtime channel server failed: {}", e);
            }
        });
    }

    /// 获取数据库实例
    pub fn get_db(&self) -> Surreal<Db> {
        self.db.clone()
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 运行时长（秒）
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
