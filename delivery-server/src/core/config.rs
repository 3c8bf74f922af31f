use std::path::PathBuf;

use crate::auth::JwtConfig;

/// 计费配置 - 核心只读消费，来源（后台配置）在范围之外
///
/// 打包/手续费在下单时并入 delivery_fee 一项冻结。
#[derive(Debug, Clone)]
pub struct ChargeConfig {
    /// 基础配送费
    pub delivery_fee: f64,
    /// 税率（百分比，如 5 表示 5%）
    pub tax_percent: f64,
    /// 打包/手续费
    pub handling_charge: f64,
}

impl Default for ChargeConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 30.0,
            tax_percent: 5.0,
            handling_charge: 5.0,
        }
    }
}

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/delivery/server | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | CHANNEL_TCP_PORT | 8081 | 实时通道 TCP 端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | CHANNEL_CAPACITY | 1024 | 广播通道容量 |
/// | DELIVERY_FEE | 30 | 基础配送费 |
/// | TAX_PERCENT | 5 | 税率（百分比） |
/// | HANDLING_CHARGE | 5 | 打包/手续费 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/delivery HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 实时通道 TCP 端口 (用于客户端直连)
    pub channel_tcp_port: u16,
    /// 广播通道容量
    pub channel_capacity: usize,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 计费配置（下单时冻结进订单）
    pub charges: ChargeConfig,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let default_charges = ChargeConfig::default();
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/delivery/server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            channel_tcp_port: std::env::var("CHANNEL_TCP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8081),
            channel_capacity: std::env::var("CHANNEL_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            charges: ChargeConfig {
                delivery_fee: std::env::var("DELIVERY_FEE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default_charges.delivery_fee),
                tax_percent: std::env::var("TAX_PERCENT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default_charges.tax_percent),
                handling_charge: std::env::var("HANDLING_CHARGE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default_charges.handling_charge),
            },
        }
    }

    /// 数据库目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    /// 日志目录 (work_dir/logs)
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
