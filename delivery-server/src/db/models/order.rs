//! Order Model
//!
//! 订单是工作单元：条目快照、金额拆分、状态 + 只追加时间线。
//! 下单后条目/金额/地址快照不可变，状态只能通过状态机流转。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use shared::order::{OrderStatus, Role, TimelineEntry};

/// 订单行条目 - 下单时的商品快照
///
/// 商品目录后续改价不得影响历史订单。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// 商品引用（目录 ID，仅作引用）
    pub product_id: String,
    /// 名称快照
    pub name: String,
    /// 单价快照
    pub price: f64,
    /// 数量 (≥ 1)
    pub quantity: i32,
    /// 行小计 = price × quantity
    pub line_total: f64,
}

/// 已应用优惠快照 - 捕获后不随优惠本身变动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedOffer {
    pub offer_id: String,
    pub title: String,
    pub discount: f64,
}

/// 配送地址快照 - 下单时拷贝，独立于用户的地址簿
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

/// 取消元数据 - 仅进入 cancelled 家族状态时填充
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationInfo {
    pub reason: String,
    pub timestamp: i64,
    pub actor_id: String,
    pub actor_role: Role,
}

/// 订单评价 - delivered 之后仅可设置一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRating {
    /// 餐品评分 (1-5)
    pub food: i32,
    /// 配送评分 (1-5)
    pub delivery: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    pub rated_at: i64,
}

/// Order entity
///
/// 不变量：
/// - `final_amount = subtotal + delivery_fee + tax_amount - discount`，下单时冻结
/// - `timeline` 只追加，末项 status 恒等于当前 status
/// - `delivered_at` 首次进入 delivered 时设置，之后不覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, with = "serde_helpers::option_record_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// 人类可读订单号 (ORD-YYMMDD-NNNN)，创建时生成一次
    pub order_number: String,
    /// 顾客用户 ID（必填，不可变）
    pub customer: String,
    /// 餐厅用户 ID（非餐饮订单为空）
    pub restaurant: Option<String>,
    /// 骑手用户 ID（分配前为空）
    pub delivery_partner: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub tax_amount: f64,
    pub final_amount: f64,
    pub applied_offer: Option<AppliedOffer>,
    pub status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
    pub cancellation: Option<CancellationInfo>,
    pub delivery_address: AddressSnapshot,
    pub rating: Option<OrderRating>,
    /// Unix millis，创建后不可变
    pub created_at: i64,
    /// 首次 delivered 的时刻
    pub delivered_at: Option<i64>,
}

impl Order {
    /// 订单 ID 的字符串形式 ("order:xxx")
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}
