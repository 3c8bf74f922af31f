//! 实时通道消息类型定义
//!
//! 这些类型在 delivery-server 和客户端之间共享，用于
//! 进程内（内存）和网络（TCP）通信。
//!
//! # 消息流
//!
//! ```text
//! Client ──▶ auth ──▶ (JWT 校验) ──▶ 加入订阅主题
//! Client ──▶ order:status_update / location:update / location:request
//! Server ──▶ order:status_update / order:placed / order:ready_for_pickup /
//!            order:rate_request / location:update / location:response /
//!            success / error
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::order::Role;

pub mod payload;
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

// ============================================================================
// Topics
// ============================================================================

/// 订阅主题 - 发布到主题即投递给当前所有订阅者
///
/// 连接认证成功后自动加入：角色主题 + 个人主题，
/// 餐厅/骑手额外加入各自的实体主题。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// 角色广播主题 (`role:<role>`)
    Role(Role),
    /// 个人主题 (`user:<id>`)
    User(String),
    /// 餐厅主题 (`restaurant:<id>`)
    Restaurant(String),
    /// 骑手主题 (`delivery:<id>`)
    Delivery(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Role(role) => write!(f, "role:{}", role),
            Topic::User(id) => write!(f, "user:{}", id),
            Topic::Restaurant(id) => write!(f, "restaurant:{}", id),
            Topic::Delivery(id) => write!(f, "delivery:{}", id),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid topic: {}", s))?;
        match kind {
            "role" => Ok(Topic::Role(rest.parse()?)),
            "user" => Ok(Topic::User(rest.to_string())),
            "restaurant" => Ok(Topic::Restaurant(rest.to_string())),
            "delivery" => Ok(Topic::Delivery(rest.to_string())),
            other => Err(format!("unknown topic kind: {}", other)),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Channel Events
// ============================================================================

/// 通道事件类型（线上名称用冒号分隔的惯例）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// 握手认证（首条消息，携带 JWT）
    #[serde(rename = "auth")]
    Auth,
    /// 订单状态变更（双向：入站是意图，出站是通知）
    #[serde(rename = "order:status_update")]
    OrderStatusUpdate,
    /// 新订单提醒（餐厅侧）
    #[serde(rename = "order:placed")]
    OrderPlaced,
    /// 待取件广播（骑手池）
    #[serde(rename = "order:ready_for_pickup")]
    OrderReadyForPickup,
    /// 评价邀请（顾客侧）
    #[serde(rename = "order:rate_request")]
    OrderRateRequest,
    /// 跑腿任务状态变更
    #[serde(rename = "pickup:status_update")]
    PickupStatusUpdate,
    /// 新跑腿任务广播（骑手池）
    #[serde(rename = "pickup:available")]
    PickupAvailable,
    /// 骑手位置（入站是上报，出站是转发）
    #[serde(rename = "location:update")]
    LocationUpdate,
    /// 位置查询请求
    #[serde(rename = "location:request")]
    LocationRequest,
    /// 位置查询响应
    #[serde(rename = "location:response")]
    LocationResponse,
    /// 操作成功回执
    #[serde(rename = "success")]
    Success,
    /// 操作失败回执
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelEvent::Auth => "auth",
            ChannelEvent::OrderStatusUpdate => "order:status_update",
            ChannelEvent::OrderPlaced => "order:placed",
            ChannelEvent::OrderReadyForPickup => "order:ready_for_pickup",
            ChannelEvent::OrderRateRequest => "order:rate_request",
            ChannelEvent::PickupStatusUpdate => "pickup:status_update",
            ChannelEvent::PickupAvailable => "pickup:available",
            ChannelEvent::LocationUpdate => "location:update",
            ChannelEvent::LocationRequest => "location:request",
            ChannelEvent::LocationResponse => "location:response",
            ChannelEvent::Success => "success",
            ChannelEvent::Error => "error",
        };
        write!(f, "{}", s)
    }
}

impl ChannelEvent {
    /// 出站专用事件 - 客户端不得发送，服务端读到即丢弃
    pub fn is_server_only(&self) -> bool {
        matches!(
            self,
            ChannelEvent::OrderPlaced
                | ChannelEvent::OrderReadyForPickup
                | ChannelEvent::OrderRateRequest
                | ChannelEvent::PickupStatusUpdate
                | ChannelEvent::PickupAvailable
                | ChannelEvent::LocationResponse
                | ChannelEvent::Success
                | ChannelEvent::Error
        )
    }
}

// ============================================================================
// Message Frame
// ============================================================================

/// 通道消息帧
///
/// 出站消息按 `topics` 路由（每个连接按自己加入的主题过滤），
/// `target` 用于单播回执；入站消息由服务端注入 `source`（连接 ID）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub request_id: Uuid,
    pub event: ChannelEvent,
    /// 路由主题（出站广播用，入站为空）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<Topic>,
    /// 单播目标连接 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// 来源连接 ID（服务端注入，客户端填写无效）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 关联请求 ID（回执消息使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// 业务载荷 (JSON bytes)
    pub payload: Vec<u8>,
}

impl ChannelMessage {
    /// 构造事件消息（序列化失败即编程错误，载荷类型都是本 crate 定义的）
    pub fn event<T: Serialize>(event: ChannelEvent, payload: &T) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event,
            topics: Vec::new(),
            target: None,
            source: None,
            correlation_id: None,
            payload: serde_json::to_vec(payload).expect("channel payload must serialize"),
        }
    }

    /// 设置路由主题
    pub fn with_topics(mut self, topics: Vec<Topic>) -> Self {
        self.topics = topics;
        self
    }

    /// 设置单播目标
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// 设置关联 ID（回执）
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 解析业务载荷
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// 该消息是否应投递给订阅了 `subscribed` 主题集合的连接
    pub fn matches(&self, connection_id: &str, subscribed: &[Topic]) -> bool {
        if let Some(target) = &self.target {
            return target == connection_id;
        }
        self.topics.iter().any(|t| subscribed.contains(t))
    }

    /// 序列化为二进制（长度前缀帧之内的内容）
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 从二进制解析
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_string_round_trip() {
        let t: Topic = "role:delivery".parse().unwrap();
        assert_eq!(t, Topic::Role(Role::Delivery));
        assert_eq!(Topic::User("u1".into()).to_string(), "user:u1");
    }

    #[test]
    fn unicast_target_beats_topics() {
        let msg = ChannelMessage::event(ChannelEvent::Success, &ResultPayload::ok("done"))
            .with_target("conn-1")
            .with_topics(vec![Topic::Role(Role::Admin)]);
        assert!(msg.matches("conn-1", &[]));
        assert!(!msg.matches("conn-2", &[Topic::Role(Role::Admin)]));
    }

    #[test]
    fn topic_filtering() {
        let msg = ChannelMessage::event(ChannelEvent::OrderStatusUpdate, &serde_json::json!({}))
            .with_topics(vec![Topic::User("c1".into()), Topic::Role(Role::Admin)]);
        assert!(msg.matches("x", &[Topic::User("c1".into())]));
        assert!(msg.matches("y", &[Topic::Role(Role::Admin), Topic::User("a9".into())]));
        assert!(!msg.matches("z", &[Topic::User("c2".into())]));
    }
}
