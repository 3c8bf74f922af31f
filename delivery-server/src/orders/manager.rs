//! OrderService - 订单编排
//!
//! HTTP 控制器和实时通道共用的唯一入口，权限矩阵与原子性纪律
//! 只在这里执行一次。
//!
//! # Transition Flow
//!
//! ```text
//! apply_transition(actor, order_id, target, note)
//!     ├─ 1. 读取订单（不存在 → NotFound）
//!     ├─ 2. 状态机判定（lifecycle::can_transition）
//!     ├─ 3. NoOp：同值重复请求，直接返回，不追加时间线
//!     ├─ 4. 条件 UPDATE 落盘（CAS on current status）
//!     ├─ 5. CAS 失败：并发流转抢先 → InvalidState，不重试
//!     └─ 6. 提交后扇出（status_update + 状态专属事件），尽力而为
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::core::ChargeConfig;
use crate::db::models::{
    AddressSnapshot, AppliedOffer, CancellationInfo, Order, OrderItem, OrderRating,
};
use crate::db::repository::{OrderRepository, StatusWrite};
use crate::orders::lifecycle::{self, TransitionCheck, TransitionError};
use crate::orders::{money, number};
use crate::realtime::Publisher;
use crate::utils::{AppError, AppResult};
use shared::message::{
    ChannelEvent, ChannelMessage, OrderAlertPayload, RateRequestPayload, StatusUpdatePayload, Topic,
};
use shared::order::{OrderStatus, Role, TimelineEntry};
use shared::util::now_millis;

// ============================================================================
// Request DTOs
// ============================================================================

/// 下单条目输入
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemInput {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

/// 下单请求
#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "order must contain at least one item"))]
    pub items: Vec<ItemInput>,
    /// 餐厅用户 ID（非餐饮订单可空）
    pub restaurant: Option<String>,
    pub delivery_address: AddressSnapshot,
    /// 优惠快照由购物车/优惠协作方计算后传入，此后不再变化
    pub applied_offer: Option<AppliedOffer>,
}

/// 评价请求 - delivered 之后仅可提交一次
#[derive(Debug, Deserialize, Validate)]
pub struct RatingRequest {
    #[validate(range(min = 1, max = 5))]
    pub food: i32,
    #[validate(range(min = 1, max = 5))]
    pub delivery: i32,
    pub review: Option<String>,
}

/// 跟踪响应：当前状态 + 完整时间线
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
}

// ============================================================================
// Service
// ============================================================================

/// Order orchestration service
#[derive(Clone)]
pub struct OrderService {
    repo: OrderRepository,
    publisher: Arc<dyn Publisher>,
    charges: ChargeConfig,
}

impl OrderService {
    pub fn new(
        repo: OrderRepository,
        publisher: Arc<dyn Publisher>,
        charges: ChargeConfig,
    ) -> Self {
        Self {
            repo,
            publisher,
            charges,
        }
    }

    /// 顾客下单
    ///
    /// 金额拆分在此一次性冻结；状态置为 placed 并播种时间线。
    pub async fn place_order(
        &self,
        actor: &CurrentUser,
        request: PlaceOrderRequest,
    ) -> AppResult<Order> {
        if actor.role != Role::Customer {
            return Err(AppError::forbidden("Only customers may place orders"));
        }
        request.validate()?;

        let mut items = Vec::with_capacity(request.items.len());
        for input in &request.items {
            money::validate_item(&input.name, input.price, input.quantity)?;
            items.push(OrderItem {
                product_id: input.product_id.clone(),
                name: input.name.clone(),
                price: input.price,
                quantity: input.quantity,
                line_total: money::line_total(input.price, input.quantity)?,
            });
        }

        let discount = request
            .applied_offer
            .as_ref()
            .map(|offer| offer.discount)
            .unwrap_or(0.0);
        let totals = money::compute_totals(&items, &self.charges, discount)?;

        let now = now_millis();
        let order = Order {
            id: None,
            order_number: number::generate(number::ORDER_PREFIX),
            customer: actor.id.clone(),
            restaurant: request.restaurant,
            delivery_partner: None,
            items,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            discount: totals.discount,
            tax_amount: totals.tax_amount,
            final_amount: totals.final_amount,
            applied_offer: request.applied_offer,
            status: OrderStatus::Placed,
            timeline: vec![TimelineEntry::new(OrderStatus::Placed, now, None)],
            cancellation: None,
            delivery_address: request.delivery_address,
            rating: None,
            created_at: now,
            delivered_at: None,
        };

        let created = self.repo.create(order).await?;
        tracing::info!(
            order_number = %created.order_number,
            customer = %created.customer,
            final_amount = created.final_amount,
            "Order placed"
        );

        self.publish_status_events(&created).await;
        Ok(created)
    }

    /// 统一状态流转入口（HTTP 与实时通道共用）
    pub async fn apply_transition(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        target: OrderStatus,
        note: Option<String>,
    ) -> AppResult<Order> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        match lifecycle::can_transition(actor.role, &actor.id, &order, target) {
            Ok(TransitionCheck::Apply) => {}
            // 同值重复请求：接受但不追加时间线、不扇出
            Ok(TransitionCheck::NoOp) => return Ok(order),
            Err(TransitionError::Forbidden(msg)) => return Err(AppError::forbidden(msg)),
            Err(TransitionError::InvalidState(msg)) => return Err(AppError::business_rule(msg)),
        }

        let now = now_millis();
        let entry = TimelineEntry::new(target, now, note.clone());

        // delivered_at 只在首次进入 delivered 时设置，之后不覆盖
        let delivered_at = if target == OrderStatus::Delivered {
            order.delivered_at.or(Some(now))
        } else {
            order.delivered_at
        };

        // 进入 cancelled 家族时填充取消元数据（已有则保留首次记录）
        let cancellation = if target.is_cancelled() && order.cancellation.is_none() {
            Some(CancellationInfo {
                reason: note.unwrap_or_else(|| target.as_str().to_string()),
                timestamp: now,
                actor_id: actor.id.clone(),
                actor_role: actor.role,
            })
        } else {
            order.cancellation.clone()
        };

        let record_id = self.repo.parse_id(order_id)?;
        let updated = self
            .repo
            .apply_status(
                &record_id,
                order.status,
                StatusWrite {
                    status: target,
                    entry,
                    delivered_at,
                    cancellation,
                },
            )
            .await?;

        let updated = match updated {
            Some(order) => order,
            // CAS 失败：另一个流转在读写之间抢先落盘。按设计不重试，
            // 失败方必须拿到明确错误而不是静默成功。
            None => {
                return Err(AppError::business_rule(format!(
                    "Order {} was updated concurrently, transition to '{}' not applied",
                    order.order_number, target
                )));
            }
        };

        tracing::info!(
            order_number = %updated.order_number,
            status = %updated.status,
            actor = %actor.id,
            role = %actor.role,
            "Order status updated"
        );

        self.publish_status_events(&updated).await;
        Ok(updated)
    }

    /// 顾客取消（PATCH 入口的受限变体，目标固定为 cancelled）
    pub async fn cancel(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        reason: String,
    ) -> AppResult<Order> {
        self.apply_transition(actor, order_id, OrderStatus::Cancelled(None), Some(reason))
            .await
    }

    /// 骑手认领 ready 状态的订单（CAS，先到先得）
    pub async fn claim(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        if actor.role != Role::Delivery {
            return Err(AppError::forbidden("Only delivery partners may claim orders"));
        }

        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        let record_id = self.repo.parse_id(order_id)?;
        match self.repo.claim(&record_id, &actor.id).await? {
            Some(claimed) => {
                tracing::info!(
                    order_number = %claimed.order_number,
                    partner = %actor.id,
                    "Order claimed by delivery partner"
                );
                Ok(claimed)
            }
            None => {
                // CAS 失败：重读拿到准确的拒绝原因（可能刚被别的骑手抢走）
                let fresh = self.repo.find_by_id(order_id).await?.unwrap_or(order);
                if fresh.delivery_partner.is_some() {
                    Err(AppError::conflict(format!(
                        "Order {} is already assigned",
                        fresh.order_number
                    )))
                } else {
                    Err(AppError::business_rule(format!(
                        "Order {} is not ready for pickup (status '{}')",
                        fresh.order_number, fresh.status
                    )))
                }
            }
        }
    }

    /// 评价 - 仅限订单顾客，delivered 之后恰好一次
    pub async fn rate(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        request: RatingRequest,
    ) -> AppResult<Order> {
        request.validate()?;

        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        if order.customer != actor.id {
            return Err(AppError::forbidden(format!(
                "Order {} does not belong to this customer",
                order.order_number
            )));
        }

        let rating = OrderRating {
            food: request.food,
            delivery: request.delivery,
            review: request.review,
            rated_at: now_millis(),
        };

        let record_id = self.repo.parse_id(order_id)?;
        match self.repo.set_rating(&record_id, rating).await? {
            Some(rated) => Ok(rated),
            None if order.rating.is_some() => Err(AppError::business_rule(format!(
                "Order {} has already been rated",
                order.order_number
            ))),
            None => Err(AppError::business_rule(format!(
                "Order {} can only be rated after delivery (status '{}')",
                order.order_number, order.status
            ))),
        }
    }

    /// 跟踪：当前状态 + 完整时间线（相关方可见）
    pub async fn track(&self, actor: &CurrentUser, order_id: &str) -> AppResult<TrackResponse> {
        let order = self.get(actor, order_id).await?;
        Ok(TrackResponse {
            order_id: order.id_string(),
            order_number: order.order_number,
            status: order.status,
            timeline: order.timeline,
        })
    }

    /// 读取单个订单（相关方可见）
    pub async fn get(&self, actor: &CurrentUser, order_id: &str) -> AppResult<Order> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        if !lifecycle::is_party(actor.role, &actor.id, &order) {
            return Err(AppError::forbidden(format!(
                "Order {} does not belong to this {}",
                order.order_number, actor.role
            )));
        }
        Ok(order)
    }

    /// 角色作用域的订单列表；管理端可按状态过滤
    pub async fn list(
        &self,
        actor: &CurrentUser,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<Order>> {
        let orders = match actor.role {
            Role::Customer => self.repo.list_for_customer(&actor.id).await?,
            Role::Restaurant => self.repo.list_for_restaurant(&actor.id).await?,
            Role::Delivery => self.repo.list_for_partner(&actor.id).await?,
            Role::Admin => return Ok(self.repo.list_all(status).await?),
        };
        Ok(orders)
    }

    /// 提交后扇出
    ///
    /// 通用 status_update 发往：顾客个人主题、餐厅主题（若有）、
    /// 骑手主题（若已分配）、管理端角色主题。特定状态追加一条
    /// 定向事件。发布失败不回滚——持久化成功才是真相。
    async fn publish_status_events(&self, order: &Order) {
        let entry_ts = order
            .timeline
            .last()
            .map(|entry| entry.timestamp)
            .unwrap_or_else(now_millis);
        let note = order.timeline.last().and_then(|entry| entry.note.clone());

        let mut topics = vec![Topic::User(order.customer.clone())];
        if let Some(restaurant) = &order.restaurant {
            topics.push(Topic::Restaurant(restaurant.clone()));
        }
        if let Some(partner) = &order.delivery_partner {
            topics.push(Topic::Delivery(partner.clone()));
        }
        topics.push(Topic::Role(Role::Admin));

        let payload = StatusUpdatePayload {
            order_id: order.id_string(),
            order_number: order.order_number.clone(),
            status: order.status,
            timestamp: entry_ts,
            note,
        };
        self.publisher
            .publish(
                ChannelMessage::event(ChannelEvent::OrderStatusUpdate, &payload)
                    .with_topics(topics),
            )
            .await;

        // 状态专属的定向事件
        match order.status {
            OrderStatus::Placed => {
                if let Some(restaurant) = &order.restaurant {
                    let alert = OrderAlertPayload {
                        order_id: order.id_string(),
                        order_number: order.order_number.clone(),
                        restaurant: Some(restaurant.clone()),
                    };
                    self.publisher
                        .publish(
                            ChannelMessage::event(ChannelEvent::OrderPlaced, &alert)
                                .with_topics(vec![Topic::Restaurant(restaurant.clone())]),
                        )
                        .await;
                }
            }
            OrderStatus::Ready => {
                // 全骑手池广播：任何空闲骑手都可以认领
                let alert = OrderAlertPayload {
                    order_id: order.id_string(),
                    order_number: order.order_number.clone(),
                    restaurant: order.restaurant.clone(),
                };
                self.publisher
                    .publish(
                        ChannelMessage::event(ChannelEvent::OrderReadyForPickup, &alert)
                            .with_topics(vec![Topic::Role(Role::Delivery)]),
                    )
                    .await;
            }
            OrderStatus::Delivered => {
                let prompt = RateRequestPayload {
                    order_id: order.id_string(),
                    order_number: order.order_number.clone(),
                };
                self.publisher
                    .publish(
                        ChannelMessage::event(ChannelEvent::OrderRateRequest, &prompt)
                            .with_topics(vec![Topic::User(order.customer.clone())]),
                    )
                    .await;
            }
            _ => {}
        }
    }
}
