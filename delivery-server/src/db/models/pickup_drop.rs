//! PickupDrop Model
//!
//! 纯跑腿（非餐饮）任务：取送地址 + 物品类别 + 较小的状态集。
//! 时间线纪律与订单一致。

use super::order::{AddressSnapshot, CancellationInfo};
use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use shared::order::{PickupStatus, PickupTimelineEntry};

/// Courier-only task entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupDrop {
    #[serde(default, with = "serde_helpers::option_record_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// 人类可读任务号 (PKP-YYMMDD-NNNN)
    pub pickup_number: String,
    pub customer: String,
    pub pickup_address: AddressSnapshot,
    pub drop_address: AddressSnapshot,
    /// 物品类别（documents / food / parcel ...）
    pub item_category: String,
    pub status: PickupStatus,
    /// 骑手用户 ID（认领后填充）
    pub delivery_partner: Option<String>,
    pub timeline: Vec<PickupTimelineEntry>,
    pub cancellation: Option<CancellationInfo>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}

impl PickupDrop {
    pub fn id_string(&self) -> String {
        self.id.as_ref().map(|id| id.to_string()).unwrap_or_default()
    }
}
