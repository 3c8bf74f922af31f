//! Order Repository
//!
//! 订单读写。状态流转用单条条件 UPDATE 实现 CAS：
//! `WHERE status = $expected` 失败时返回 None，由上层区分
//! 并发冲突和不存在。

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{CancellationInfo, Order, OrderRating};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use shared::order::{OrderStatus, TimelineEntry};

const TABLE: &str = "order";

/// 一次状态流转要落盘的全部字段
///
/// `delivered_at` / `cancellation` 传入的是计算后的终值
/// （未变化时等于现值）；CAS 保证它们只随 status 一起变。
#[derive(Debug, Clone)]
pub struct StatusWrite {
    pub status: OrderStatus,
    pub entry: TimelineEntry,
    pub delivered_at: Option<i64>,
    pub cancellation: Option<CancellationInfo>,
}

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Persist a new order
    pub async fn create(&self, order: Order) -> RepoResult<Order> {
        let created: Option<Order> = self.base.db().create(TABLE).content(order).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create order".into()))
    }

    /// Parse an "order:xxx" id string
    pub fn parse_id(&self, id: &str) -> RepoResult<RecordId> {
        parse_record_id(id, TABLE)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let record_id = self.parse_id(id)?;
        let order: Option<Order> = self.base.db().select(record_id).await?;
        Ok(order)
    }

    /// 顾客自己的订单
    pub async fn list_for_customer(&self, customer: &str) -> RepoResult<Vec<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE customer = $customer ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("customer", customer.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// 餐厅自己的订单
    pub async fn list_for_restaurant(&self, restaurant: &str) -> RepoResult<Vec<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE restaurant = $restaurant ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("restaurant", restaurant.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// 骑手被分配的订单
    pub async fn list_for_partner(&self, partner: &str) -> RepoResult<Vec<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE delivery_partner = $partner ORDER BY created_at DESC")
            .bind(("table", TABLE))
            .bind(("partner", partner.to_string()))
            .await?;
        Ok(result.take(0)?)
    }

    /// 全部订单（管理端），可按状态过滤
    pub async fn list_all(&self, status: Option<OrderStatus>) -> RepoResult<Vec<Order>> {
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

    /// 骑手当前配送中 (picked / on_the_way) 的订单
    pub async fn in_flight_for_partner(&self, partner: &str) -> RepoResult<Vec<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM type::table($table) WHERE delivery_partner = $partner AND status IN $statuses")
            .bind(("table", TABLE))
            .bind(("partner", partner.to_string()))
            .bind(("statuses", vec![OrderStatus::Picked, OrderStatus::OnTheWay]))
            .await?;
        Ok(result.take(0)?)
    }

    /// 状态流转（原子 CAS）
    ///
    /// 返回 None 表示 `status != expected`（被并发流转抢先），
    /// 订单本身不存在的情况由调用方先行 find 排除。
    pub async fn apply_status(
        &self,
        id: &RecordId,
        expected: OrderStatus,
        write: StatusWrite,
    ) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET
                       status = $status,
                       timeline += $entry,
                       delivered_at = $delivered_at,
                       cancellation = $cancellation
                   WHERE status = $expected
                   RETURN AFTER"#,
            )
            .bind(("order", id.clone()))
            .bind(("status", write.status))
            .bind(("entry", write.entry))
            .bind(("delivered_at", write.delivered_at))
            .bind(("cancellation", write.cancellation))
            .bind(("expected", expected))
            .await?;
        let updated: Vec<Order> = result.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// 骑手认领（原子 CAS：仅 ready 且未分配时成功）
    pub async fn claim(&self, id: &RecordId, partner: &str) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET delivery_partner = $partner
                   WHERE (delivery_partner = NONE OR delivery_partner = NULL)
                     AND status = $expected
                   RETURN AFTER"#,
            )
            .bind(("order", id.clone()))
            .bind(("partner", partner.to_string()))
            .bind(("expected", OrderStatus::Ready))
            .await?;
        let updated: Vec<Order> = result.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// 评价（原子 CAS：仅 delivered 且未评价时成功）
    pub async fn set_rating(
        &self,
        id: &RecordId,
        rating: OrderRating,
    ) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $order SET rating = $rating
                   WHERE (rating = NONE OR rating = NULL) AND status = $expected
                   RETURN AFTER"#,
            )
            .bind(("order", id.clone()))
            .bind(("rating", rating))
            .bind(("expected", OrderStatus::Delivered))
            .await?;
        let updated: Vec<Order> = result.take(0)?;
        Ok(updated.into_iter().next())
    }
}
