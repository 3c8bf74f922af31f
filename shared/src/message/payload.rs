//! 通道事件载荷定义

use serde::{Deserialize, Serialize};

use crate::order::{GeoPoint, OrderStatus, PickupStatus};

// ==================== Handshake ====================

/// 握手载荷 (客户端 -> 服务端，必须是连接上的首条消息)
///
/// 凭证无效或缺失时服务端直接关闭连接，不加入任何主题。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    /// 协议版本
    pub version: u16,
    /// Bearer 凭证 (JWT)
    pub token: String,
    /// 客户端名称/标识 (调试用)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

// ==================== Order Events ====================

/// 状态变更通知 (服务端 -> 订阅方)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    /// 时间线条目的服务端时间戳 (Unix millis)
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 状态变更意图 (客户端 -> 服务端)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusIntentPayload {
    pub order_id: String,
    /// 扁平状态字符串，未知值返回 error 回执
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 订单提醒 (order:placed → 餐厅主题；order:ready_for_pickup → 骑手池)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAlertPayload {
    pub order_id: String,
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<String>,
}

/// 评价邀请 (order:rate_request → 顾客个人主题)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRequestPayload {
    pub order_id: String,
    pub order_number: String,
}

// ==================== Pickup Events ====================

/// 跑腿任务状态通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupUpdatePayload {
    pub pickup_id: String,
    pub pickup_number: String,
    pub status: PickupStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ==================== Location Events ====================

/// 位置上报 (骑手客户端 -> 服务端)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReportPayload {
    pub latitude: f64,
    pub longitude: f64,
}

/// 位置转发 (服务端 -> 配送中订单的顾客个人主题)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdatePayload {
    pub order_id: String,
    pub location: GeoPoint,
}

/// 位置查询 (客户端 -> 服务端)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRequestPayload {
    pub order_id: String,
}

/// 位置查询响应 (服务端 -> 请求连接单播)
///
/// `location` 为 None 表示未分配骑手或骑手从未上报过位置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResponsePayload {
    pub order_id: String,
    pub location: Option<GeoPoint>,
}

// ==================== Result ====================

/// success / error 回执载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub message: String,
}

impl ResultPayload {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
