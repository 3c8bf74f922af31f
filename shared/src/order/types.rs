//! 订单状态词汇表
//!
//! 对外（存储/网络）状态是扁平字符串（`placed`、`delayed_weather`、
//! `cancelled_by_admin`...），内部用带原因的 tagged enum 建模，
//! 仅在 serde 边界折叠成扁平字符串。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Actor Roles
// ============================================================================

/// 参与方角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Restaurant,
    Delivery,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Restaurant => write!(f, "restaurant"),
            Role::Delivery => write!(f, "delivery"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "restaurant" => Ok(Role::Restaurant),
            "delivery" => Ok(Role::Delivery),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// 账号状态 - 由身份网关下发，核心只做放行检查
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Blocked,
}

// ============================================================================
// Status Reasons
// ============================================================================

/// 延迟原因（管理端专用词汇）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayReason {
    HighDemand,
    Weather,
    RiderAssignedLate,
    RiderUnavailable,
}

/// 取消原因（管理端专用词汇）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    ByCustomer,
    ByAdmin,
    PaymentFailed,
}

/// 配送失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailureReason {
    WrongAddress,
    NoResponse,
}

// ============================================================================
// Order Status
// ============================================================================

/// Order lifecycle status.
///
/// `Delayed`/`Cancelled` carry an optional reason qualifier; `None` collapses
/// to the plain `delayed`/`cancelled` wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Placed,
    Confirmed,
    Preparing,
    Packing,
    Packed,
    Ready,
    Picked,
    OnTheWay,
    Delayed(Option<DelayReason>),
    Delivered,
    Cancelled(Option<CancelReason>),
    DeliveryFailed(DeliveryFailureReason),
    OnHold,
    RefundIssued,
}

impl OrderStatus {
    /// 扁平字符串表示（存储/网络格式）
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Packing => "packing",
            OrderStatus::Packed => "packed",
            OrderStatus::Ready => "ready",
            OrderStatus::Picked => "picked",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delayed(None) => "delayed",
            OrderStatus::Delayed(Some(DelayReason::HighDemand)) => "delayed_high_demand",
            OrderStatus::Delayed(Some(DelayReason::Weather)) => "delayed_weather",
            OrderStatus::Delayed(Some(DelayReason::RiderAssignedLate)) => {
                "delayed_rider_assigned_late"
            }
            OrderStatus::Delayed(Some(DelayReason::RiderUnavailable)) => {
                "delayed_rider_unavailable"
            }
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled(None) => "cancelled",
            OrderStatus::Cancelled(Some(CancelReason::ByCustomer)) => "cancelled_by_customer",
            OrderStatus::Cancelled(Some(CancelReason::ByAdmin)) => "cancelled_by_admin",
            OrderStatus::Cancelled(Some(CancelReason::PaymentFailed)) => "cancelled_payment_failed",
            OrderStatus::DeliveryFailed(DeliveryFailureReason::WrongAddress) => {
                "delivery_failed_wrong_address"
            }
            OrderStatus::DeliveryFailed(DeliveryFailureReason::NoResponse) => {
                "delivery_failed_no_response"
            }
            OrderStatus::OnHold => "on_hold",
            OrderStatus::RefundIssued => "refund_issued",
        }
    }

    /// 终态：delivered、所有 cancelled* 变体、refund_issued
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled(_) | OrderStatus::RefundIssued
        )
    }

    /// 取消家族（含所有原因限定变体）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled(_))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(OrderStatus::Placed),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "packing" => Ok(OrderStatus::Packing),
            "packed" => Ok(OrderStatus::Packed),
            "ready" => Ok(OrderStatus::Ready),
            "picked" => Ok(OrderStatus::Picked),
            "on_the_way" => Ok(OrderStatus::OnTheWay),
            "delayed" => Ok(OrderStatus::Delayed(None)),
            "delayed_high_demand" => Ok(OrderStatus::Delayed(Some(DelayReason::HighDemand))),
            "delayed_weather" => Ok(OrderStatus::Delayed(Some(DelayReason::Weather))),
            "delayed_rider_assigned_late" => {
                Ok(OrderStatus::Delayed(Some(DelayReason::RiderAssignedLate)))
            }
            "delayed_rider_unavailable" => {
                Ok(OrderStatus::Delayed(Some(DelayReason::RiderUnavailable)))
            }
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled(None)),
            "cancelled_by_customer" => Ok(OrderStatus::Cancelled(Some(CancelReason::ByCustomer))),
            "cancelled_by_admin" => Ok(OrderStatus::Cancelled(Some(CancelReason::ByAdmin))),
            "cancelled_payment_failed" => {
                Ok(OrderStatus::Cancelled(Some(CancelReason::PaymentFailed)))
            }
            "delivery_failed_wrong_address" => Ok(OrderStatus::DeliveryFailed(
                DeliveryFailureReason::WrongAddress,
            )),
            "delivery_failed_no_response" => {
                Ok(OrderStatus::DeliveryFailed(DeliveryFailureReason::NoResponse))
            }
            "on_hold" => Ok(OrderStatus::OnHold),
            "refund_issued" => Ok(OrderStatus::RefundIssued),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Pickup/Drop Status
// ============================================================================

/// 跑腿任务状态 - 比餐饮订单小的状态集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupStatus {
    Placed,
    Assigned,
    Picked,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl PickupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::Placed => "placed",
            PickupStatus::Assigned => "assigned",
            PickupStatus::Picked => "picked",
            PickupStatus::OnTheWay => "on_the_way",
            PickupStatus::Delivered => "delivered",
            PickupStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PickupStatus::Delivered | PickupStatus::Cancelled)
    }
}

impl fmt::Display for PickupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Timeline
// ============================================================================

/// 状态时间线条目 - 只追加，不修改不截断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: OrderStatus,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimelineEntry {
    pub fn new(status: OrderStatus, timestamp: i64, note: Option<String>) -> Self {
        Self {
            status,
            timestamp,
            note,
        }
    }
}

/// 跑腿任务时间线条目 - 与订单时间线同样的只追加纪律
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupTimelineEntry {
    pub status: PickupStatus,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============================================================================
// Geo
// ============================================================================

/// 经纬度坐标 - last-write-wins，不保留历史
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}
