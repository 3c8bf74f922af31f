//! Delivery Server - 外卖/跑腿市场后端
//!
//! # 架构概述
//!
//! 本模块是后端的主入口，提供以下核心功能：
//!
//! - **订单状态机** (`orders`): 权限矩阵、流转合法性、只追加时间线
//! - **实时通知** (`realtime`): 支持 TCP/Memory 传输的主题广播总线
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储（CAS 条件更新）
//! - **认证** (`auth`): JWT 校验（签发属外部身份网关）
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! delivery-server/src/
//! ├── core/          # 配置、状态、服务器装配
//! ├── auth/          # JWT 认证
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单/跑腿状态机与编排
//! ├── realtime/      # 通知总线、位置转发
//! ├── db/            # 数据库层
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod orders;
pub mod realtime;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{ChargeConfig, Config, Server, ServerState};
pub use orders::{OrderService, PickupService};
pub use realtime::{LocationRelay, Notifier, Publisher};
pub use utils::{AppError, AppResponse, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____       ___
   / __ \___  / (_)   _____  _______  __
  / / / / _ \/ / / | / / _ \/ ___/ / / /
 / /_/ /  __/ / /| |/ /  __/ /  / /_/ /
/_____/\___/_/_/ |___/\___/_/   \__, /
                               /____/
    "#
    );
}
