//! 通知总线核心实现
//!
//! # 消息流
//!
//! ```text
//! Client ──▶ read loop ──▶ inbound_tx ──▶ IntentHandler
//!                                      │
//! Server ──▶ publish() ──▶ server_tx ──┤
//!                                      ▼
//!                          各连接转发任务（按主题过滤）
//! ```
//!
//! 发布是尽力而为：无订阅者时 send 失败被吞掉，不存在
//! 持久化 outbox 或重试。状态真相永远在存储层。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use shared::message::{ChannelEvent, ChannelMessage, ResultPayload, Topic};
use shared::order::Role;

/// 注入到状态机提交后钩子的发布能力
///
/// 生产实现是 [`Notifier`]；测试换成内存记录器即可断言扇出，
/// 不需要真实连接。
#[async_trait]
pub trait Publisher: Send + Sync {
    /// 发布一条已携带路由主题（或单播目标）的消息
    async fn publish(&self, message: ChannelMessage);
}

/// 已认证连接的身份信息
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub topics: Vec<Topic>,
}

/// Configuration for the notifier
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channels (default: 1024)
    pub channel_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
        }
    }
}

/// 通知总线 - 订阅拓扑管理 + 出站扇出 + 入站汇聚
#[derive(Debug, Clone)]
pub struct Notifier {
    /// 服务器到客户端的广播通道（转发任务按主题过滤）
    server_tx: broadcast::Sender<ChannelMessage>,
    /// 客户端到服务器的消息通道
    inbound_tx: broadcast::Sender<ChannelMessage>,
    /// 配置
    pub(crate) config: NotifierConfig,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已认证连接 (connection id -> identity/topics)
    pub(crate) clients: Arc<DashMap<String, ConnectionInfo>>,
}

impl Notifier {
    /// 创建默认配置的通知总线
    pub fn new() -> Self {
        Self::from_config(NotifierConfig::default())
    }

    /// 从配置创建
    pub fn from_config(config: NotifierConfig) -> Self {
        let capacity = config.channel_capacity;
        let (server_tx, _) = broadcast::channel(capacity);
        let (inbound_tx, _) = broadcast::channel(capacity);
        Self {
            server_tx,
            inbound_tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    /// 连接认证成功后应加入的主题集合
    pub fn topics_for(user_id: &str, role: Role) -> Vec<Topic> {
        let mut topics = vec![Topic::Role(role), Topic::User(user_id.to_string())];
        match role {
            Role::Restaurant => topics.push(Topic::Restaurant(user_id.to_string())),
            Role::Delivery => topics.push(Topic::Delivery(user_id.to_string())),
            _ => {}
        }
        topics
    }

    /// 注册已认证连接
    pub(crate) fn register(&self, connection_id: &str, info: ConnectionInfo) {
        self.clients.insert(connection_id.to_string(), info);
    }

    /// 注销连接
    pub(crate) fn unregister(&self, connection_id: &str) {
        self.clients.remove(connection_id);
    }

    /// 解析连接身份（入站意图处理用）
    pub fn identity(&self, connection_id: &str) -> Option<ConnectionInfo> {
        self.clients.get(connection_id).map(|e| e.value().clone())
    }

    /// 订阅出站广播（每个连接的转发任务持有一个接收端）
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelMessage> {
        self.server_tx.subscribe()
    }

    /// 订阅入站消息（IntentHandler 持有）
    pub fn subscribe_inbound(&self) -> broadcast::Receiver<ChannelMessage> {
        self.inbound_tx.subscribe()
    }

    /// 入站发送端（连接读取任务使用）
    pub(crate) fn inbound_sender(&self) -> &broadcast::Sender<ChannelMessage> {
        &self.inbound_tx
    }

    /// 给指定连接发送单播回执
    pub async fn unicast(&self, connection_id: &str, message: ChannelMessage) {
        self.publish(message.with_target(connection_id)).await;
    }

    /// 给指定连接发送错误回执
    pub async fn unicast_error(
        &self,
        connection_id: &str,
        correlation_id: uuid::Uuid,
        message: impl Into<String>,
    ) {
        let reply = ChannelMessage::event(ChannelEvent::Error, &ResultPayload::err(message))
            .with_correlation_id(correlation_id);
        self.unicast(connection_id, reply).await;
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 当前已认证连接数
    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    /// 优雅关闭：取消所有连接任务和 TCP accept loop
    pub fn shutdown(&self) {
        tracing::info!("Shutting down notifier");
        self.shutdown_token.cancel();
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for Notifier {
    async fn publish(&self, message: ChannelMessage) {
        // 无任何订阅者时 send 返回 Err —— 按 at-most-once 语义直接丢弃
        if self.server_tx.send(message).is_err() {
            tracing::debug!("No active subscriber, event dropped");
        }
    }
}
