//! PickupDrop Repository
//!
//! 跑腿任务读写，与订单同样的 CAS 流转纪律。

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{CancellationInfo, PickupDrop};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use shared::order::{PickupStatus, PickupTimelineEntry};

const TABLE: &str = "pickup_drop";

/// 一次跑腿状态流转要落盘的全部字段
#[derive(Debug, Clone)]
pub struct PickupStatusWrite {
    pub status: PickupStatus,
    pub entry: PickupTimelineEntry,
    pub delivered_at: Option<i64>,
    pub cancellation: Option<CancellationInfo>,
}

#[derive(Clone)]
pub struct PickupRepository {
    base: BaseRepository,
}

impl PickupRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn create(&self, pickup: PickupDrop) -> RepoResult<PickupDrop> {
        let created: Option<PickupDrop> = self.base.db().create(TABLE).content(pickup).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create pickup task".into()))
    }

    pub fn parse_id(&self, id: &str) -> RepoResult<RecordId> {
        parse_record_id(id, TABLE)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<PickupDrop>> {
        let record_id = self.parse_id(id)?;
        let pickup: Option<PickupDrop> = self.base.db().select(record_id).await?;
        Ok(pickup)
    }

    pub async fn list_for_customer(&self, customer: &str) -> RepoResult<Vec<PickupDrop>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE customer = $customer ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("customer", customer.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn list_for_partner(&self, partner: &str) -> RepoResult<Vec<PickupDrop>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE delivery_partner = $partner ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("partner", partner.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    pub async fn list_all(&self, status: Option<PickupStatus>) -> RepoResult<Vec<PickupDrop>> {
        let mut result = match status {
            Some(status) => {
                self.base
                    .db()
                    .query("SELECT * FROM type::table($table) WHERE status = $status ORDER BY created_at DESC")
                    .bind(("table", TABLE))
                    .bind(("status", status))
                    .await?
            }
            None => {
                self.base
                    .db()
                    .query("SELECT * FROM type::table($table) ORDER BY created_at DESC")
                    .bind(("table", TABLE))
                    .await?
            }
        };
        Ok(result.take(0)?)
    }

    /// 状态流转（原子 CAS，语义同订单）
    pub async fn apply_status(
        &self,
        id: &RecordId,
        expected: PickupStatus,
        write: PickupStatusWrite,
    ) -> RepoResult<Option<PickupDrop>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $pickup SET
                       status = $status,
                       timeline += $entry,
                       delivered_at = $delivered_at,
                       cancellation = $cancellation
                   WHERE status = $expected
                   RETURN AFTER"#,
            )
            .bind(("pickup", id.clone()))
            .bind(("status", write.status))
            .bind(("entry", write.entry))
            .bind(("delivered_at", write.delivered_at))
            .bind(("cancellation", write.cancellation))
            .bind(("expected", expected))
            .await?;
        let updated: Vec<PickupDrop> = result.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// 骑手认领：placed → assigned，设置骑手（原子 CAS）
    pub async fn claim(
        &self,
        id: &RecordId,
        partner: &str,
        entry: PickupTimelineEntry,
    ) -> RepoResult<Option<PickupDrop>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $pickup SET
                       delivery_partner = $partner,
                       status = $assigned,
                       timeline += $entry
                   WHERE (delivery_partner = NONE OR delivery_partner = NULL)
                     AND status = $expected
                   RETURN AFTER"#,
            )
            .bind(("pickup", id.clone()))
            .bind(("partner", partner.to_string()))
            .bind(("assigned", PickupStatus::Assigned))
            .bind(("entry", entry))
            .bind(("expected", PickupStatus::Placed))
            .await?;
        let updated: Vec<PickupDrop> = result.take(0)?;
        Ok(updated.into_iter().next())
    }
}
