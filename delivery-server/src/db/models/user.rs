//! User Model
//!
//! 核心只把用户当作 (id, role, 账号状态) 的能力持有者；
//! 骑手额外持有一个可变的当前位置字段（last-write-wins）。
//! 注册/审核/密码属于外部身份网关。

use super::serde_helpers;
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use shared::order::{AccountStatus, GeoPoint, Role};

/// User entity (referenced by orders via plain user id strings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default, with = "serde_helpers::option_record_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    /// 审核标记（餐厅/骑手入驻审核由外部流程维护）
    #[serde(default)]
    pub approved: bool,
    /// 骑手当前位置，仅由骑手自己的通道写入
    pub current_location: Option<GeoPoint>,
    pub location_updated_at: Option<i64>,
}
