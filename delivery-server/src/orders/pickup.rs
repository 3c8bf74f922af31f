//! PickupService - 跑腿任务编排
//!
//! 订单状态机的轻量同胞：更小的状态集（placed → assigned → picked →
//! on_the_way → delivered / cancelled），同样的只追加时间线、
//! CAS 落盘和提交后扇出纪律。

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::db::models::{AddressSnapshot, CancellationInfo, PickupDrop};
use crate::db::repository::{PickupRepository, PickupStatusWrite};
use crate::orders::number;
use crate::realtime::Publisher;
use crate::utils::{AppError, AppResult};
use shared::message::{ChannelEvent, ChannelMessage, OrderAlertPayload, PickupUpdatePayload, Topic};
use shared::order::{PickupStatus, PickupTimelineEntry, Role};
use shared::util::now_millis;

/// 顾客可取消窗口：骑手取件后不可再取消
const CUSTOMER_CANCELLABLE: &[PickupStatus] = &[PickupStatus::Placed, PickupStatus::Assigned];

/// 跑腿任务流转拒绝原因
#[derive(Debug, Clone, PartialEq, Error)]
enum PickupDenied {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),
}

/// 创建跑腿任务请求
#[derive(Debug, Deserialize, Validate)]
pub struct PlacePickupRequest {
    pub pickup_address: AddressSnapshot,
    pub drop_address: AddressSnapshot,
    #[validate(length(min = 1, message = "item category must not be empty"))]
    pub item_category: String,
}

fn role_permits(role: Role, target: PickupStatus) -> bool {
    match role {
        Role::Admin => true,
        Role::Delivery => matches!(
            target,
            PickupStatus::Picked | PickupStatus::OnTheWay | PickupStatus::Delivered
        ),
        Role::Customer => target == PickupStatus::Cancelled,
        Role::Restaurant => false,
    }
}

fn owns(role: Role, actor_id: &str, pickup: &PickupDrop) -> bool {
    match role {
        Role::Admin => true,
        Role::Customer => pickup.customer == actor_id,
        Role::Delivery => pickup.delivery_partner.as_deref() == Some(actor_id),
        Role::Restaurant => false,
    }
}

fn is_party(role: Role, actor_id: &str, pickup: &PickupDrop) -> bool {
    role == Role::Admin
        || pickup.customer == actor_id
        || pickup.delivery_partner.as_deref() == Some(actor_id)
}

/// 判定流转；Ok(false) 表示同值无操作
fn check_transition(
    role: Role,
    actor_id: &str,
    pickup: &PickupDrop,
    target: PickupStatus,
) -> Result<bool, PickupDenied> {
    if !owns(role, actor_id, pickup) {
        return Err(PickupDenied::Forbidden(format!(
            "Pickup task {} does not belong to this {}",
            pickup.pickup_number, role
        )));
    }

    if !role_permits(role, target) {
        return Err(PickupDenied::Forbidden(format!(
            "Role '{}' may not set pickup status '{}'",
            role, target
        )));
    }

    if pickup.status == target {
        return Ok(false);
    }

    if pickup.status.is_terminal() && role != Role::Admin {
        return Err(PickupDenied::InvalidState(format!(
            "No transition allowed out of terminal status '{}'",
            pickup.status
        )));
    }

    if role == Role::Customer && !CUSTOMER_CANCELLABLE.contains(&pickup.status) {
        return Err(PickupDenied::InvalidState(format!(
            "Pickup task can no longer be cancelled (status '{}')",
            pickup.status
        )));
    }

    Ok(true)
}

/// Pickup/drop orchestration service
#[derive(Clone)]
pub struct PickupService {
    repo: PickupRepository,
    publisher: Arc<dyn Publisher>,
}

impl PickupService {
    pub fn new(repo: PickupRepository, publisher: Arc<dyn Publisher>) -> Self {
        Self { repo, publisher }
    }

    /// 顾客创建跑腿任务
    pub async fn place(
        &self,
        actor: &CurrentUser,
        request: PlacePickupRequest,
    ) -> AppResult<PickupDrop> {
        if actor.role != Role::Customer {
            return Err(AppError::forbidden("Only customers may create pickup tasks"));
        }
        request.validate()?;

        let now = now_millis();
        let pickup = PickupDrop {
            id: None,
            pickup_number: number::generate(number::PICKUP_PREFIX),
            customer: actor.id.clone(),
            pickup_address: request.pickup_address,
            drop_address: request.drop_address,
            item_category: request.item_category,
            status: PickupStatus::Placed,
            delivery_partner: None,
            timeline: vec![PickupTimelineEntry {
                status: PickupStatus::Placed,
                timestamp: now,
                note: None,
            }],
            cancellation: None,
            created_at: now,
            delivered_at: None,
        };

        let created = self.repo.create(pickup).await?;
        tracing::info!(
            pickup_number = %created.pickup_number,
            customer = %created.customer,
            "Pickup task created"
        );

        self.publish_status_events(&created).await;

        // 新任务对全骑手池广播
        let alert = OrderAlertPayload {
            order_id: created.id_string(),
            order_number: created.pickup_number.clone(),
            restaurant: None,
        };
        self.publisher
            .publish(
                ChannelMessage::event(ChannelEvent::PickupAvailable, &alert)
                    .with_topics(vec![Topic::Role(Role::Delivery)]),
            )
            .await;

        Ok(created)
    }

    /// 统一状态流转入口
    pub async fn apply_transition(
        &self,
        actor: &CurrentUser,
        pickup_id: &str,
        target: PickupStatus,
        note: Option<String>,
    ) -> AppResult<PickupDrop> {
        let pickup = self
            .repo
            .find_by_id(pickup_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pickup task {} not found", pickup_id)))?;

        match check_transition(actor.role, &actor.id, &pickup, target) {
            Ok(true) => {}
            Ok(false) => return Ok(pickup),
            Err(PickupDenied::Forbidden(msg)) => return Err(AppError::forbidden(msg)),
            Err(PickupDenied::InvalidState(msg)) => return Err(AppError::business_rule(msg)),
        }

        let now = now_millis();
        let entry = PickupTimelineEntry {
            status: target,
            timestamp: now,
            note: note.clone(),
        };

        let delivered_at = if target == PickupStatus::Delivered {
            pickup.delivered_at.or(Some(now))
        } else {
            pickup.delivered_at
        };

        let cancellation = if target == PickupStatus::Cancelled && pickup.cancellation.is_none() {
            Some(CancellationInfo {
                reason: note.unwrap_or_else(|| target.as_str().to_string()),
                timestamp: now,
                actor_id: actor.id.clone(),
                actor_role: actor.role,
            })
        } else {
            pickup.cancellation.clone()
        };

        let record_id = self.repo.parse_id(pickup_id)?;
        let updated = self
            .repo
            .apply_status(
                &record_id,
                pickup.status,
                PickupStatusWrite {
                    status: target,
                    entry,
                    delivered_at,
                    cancellation,
                },
            )
            .await?
            .ok_or_else(|| {
                AppError::business_rule(format!(
                    "Pickup task {} was updated concurrently, transition to '{}' not applied",
                    pickup.pickup_number, target
                ))
            })?;

        tracing::info!(
            pickup_number = %updated.pickup_number,
            status = %updated.status,
            actor = %actor.id,
            "Pickup status updated"
        );

        self.publish_status_events(&updated).await;
        Ok(updated)
    }

    /// 顾客取消
    pub async fn cancel(
        &self,
        actor: &CurrentUser,
        pickup_id: &str,
        reason: String,
    ) -> AppResult<PickupDrop> {
        self.apply_transition(actor, pickup_id, PickupStatus::Cancelled, Some(reason))
            .await
    }

    /// 骑手认领：placed → assigned（CAS，先到先得）
    pub async fn claim(&self, actor: &CurrentUser, pickup_id: &str) -> AppResult<PickupDrop> {
        if actor.role != Role::Delivery {
            return Err(AppError::forbidden(
                "Only delivery partners may claim pickup tasks",
            ));
        }

        let pickup = self
            .repo
            .find_by_id(pickup_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pickup task {} not found", pickup_id)))?;

        let entry = PickupTimelineEntry {
            status: PickupStatus::Assigned,
            timestamp: now_millis(),
            note: None,
        };

        let record_id = self.repo.parse_id(pickup_id)?;
        match self.repo.claim(&record_id, &actor.id, entry).await? {
            Some(claimed) => {
                tracing::info!(
                    pickup_number = %claimed.pickup_number,
                    partner = %actor.id,
                    "Pickup task claimed"
                );
                self.publish_status_events(&claimed).await;
                Ok(claimed)
            }
            None => {
                // CAS 失败：重读拿到准确的拒绝原因
                let fresh = self.repo.find_by_id(pickup_id).await?.unwrap_or(pickup);
                if fresh.delivery_partner.is_some() {
                    Err(AppError::conflict(format!(
                        "Pickup task {} is already assigned",
                        fresh.pickup_number
                    )))
                } else {
                    Err(AppError::business_rule(format!(
                        "Pickup task {} cannot be claimed (status '{}')",
                        fresh.pickup_number, fresh.status
                    )))
                }
            }
        }
    }

    /// 读取单个任务（相关方可见）
    pub async fn get(&self, actor: &CurrentUser, pickup_id: &str) -> AppResult<PickupDrop> {
        let pickup = self
            .repo
            .find_by_id(pickup_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pickup task {} not found", pickup_id)))?;

        if !is_party(actor.role, &actor.id, &pickup) {
            return Err(AppError::forbidden(format!(
                "Pickup task {} does not belong to this {}",
                pickup.pickup_number, actor.role
            )));
        }
        Ok(pickup)
    }

    /// 角色作用域列表
    pub async fn list(
        &self,
        actor: &CurrentUser,
        status: Option<PickupStatus>,
    ) -> AppResult<Vec<PickupDrop>> {
        let pickups = match actor.role {
            Role::Customer => self.repo.list_for_customer(&actor.id).await?,
            Role::Delivery => self.repo.list_for_partner(&actor.id).await?,
            Role::Admin => return Ok(self.repo.list_all(status).await?),
            Role::Restaurant => {
                return Err(AppError::forbidden(
                    "Restaurants have no access to pickup tasks",
                ));
            }
        };
        Ok(pickups)
    }

    /// 提交后扇出：顾客 + 骑手（若已分配）+ 管理端
    async fn publish_status_events(&self, pickup: &PickupDrop) {
        let entry_ts = pickup
            .timeline
            .last()
            .map(|entry| entry.timestamp)
            .unwrap_or_else(now_millis);
        let note = pickup.timeline.last().and_then(|entry| entry.note.clone());

        let mut topics = vec![Topic::User(pickup.customer.clone())];
        if let Some(partner) = &pickup.delivery_partner {
            topics.push(Topic::Delivery(partner.clone()));
        }
        topics.push(Topic::Role(Role::Admin));

        let payload = PickupUpdatePayload {
            pickup_id: pickup.id_string(),
            pickup_number: pickup.pickup_number.clone(),
            status: pickup.status,
            timestamp: entry_ts,
            note,
        };
        self.publisher
            .publish(
                ChannelMessage::event(ChannelEvent::PickupStatusUpdate, &payload)
                    .with_topics(topics),
            )
            .await;
    }
}
