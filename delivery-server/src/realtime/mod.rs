//! 实时通知层
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Notifier                            │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<ChannelMessage> (server → 客户端) │  │
//! │  │  broadcast::Sender<ChannelMessage> (客户端 → server) │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │   Transport Trait   │  ◄── 可插拔实现
//!               └──────────┬──────────┘
//!                          │
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!        TcpTransport           MemoryTransport
//!        (网络客户端)            (同进程/测试)
//! ```
//!
//! 每个连接首帧必须是 `auth` 握手（携带 JWT）；认证通过后按角色
//! 加入订阅主题，转发任务按主题过滤广播。投递是尽力而为的
//! at-most-once：主题无订阅者时消息直接丢弃，断线客户端重连后
//! 通过同步读路径补状态。

pub mod handler;
pub mod location;
pub mod notifier;
pub mod tcp_server;
pub mod transport;

pub use handler::IntentHandler;
pub use location::LocationRelay;
pub use notifier::{ConnectionInfo, Notifier, Publisher};
pub use transport::{MemoryTransport, TcpTransport, Transport, TransportError};
