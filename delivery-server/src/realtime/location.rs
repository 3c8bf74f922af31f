//! Location Relay
//!
//! 骑手位置上报：last-write-wins 落到用户记录，再只推送给
//! 有「活跃关注」的相关方——即该骑手名下状态 ∈ {picked, on_the_way}
//! 的订单的顾客个人主题。空闲/未取件骑手的位置不广播。

use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::repository::{OrderRepository, UserRepository};
use crate::realtime::Publisher;
use crate::utils::{AppError, AppResult};
use shared::message::{
    ChannelEvent, ChannelMessage, LocationReportPayload, LocationResponsePayload,
    LocationUpdatePayload, Topic,
};
use shared::order::{GeoPoint, Role};

/// Relay for delivery-partner position updates
#[derive(Clone)]
pub struct LocationRelay {
    orders: OrderRepository,
    users: UserRepository,
    publisher: Arc<dyn Publisher>,
}

impl LocationRelay {
    pub fn new(
        orders: OrderRepository,
        users: UserRepository,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            orders,
            users,
            publisher,
        }
    }

    /// 处理一次位置上报，返回被通知的订单数
    ///
    /// 位置字段只由骑手自己的通道写入，单一写者无并发冲突。
    pub async fn report(
        &self,
        partner_id: &str,
        report: LocationReportPayload,
    ) -> AppResult<usize> {
        if !report.latitude.is_finite() || !report.longitude.is_finite() {
            return Err(AppError::validation("coordinates must be finite numbers"));
        }

        let location = GeoPoint {
            latitude: report.latitude,
            longitude: report.longitude,
        };
        self.users.set_location(partner_id, location).await?;

        let in_flight = self.orders.in_flight_for_partner(partner_id).await?;
        for order in &in_flight {
            let payload = LocationUpdatePayload {
                order_id: order.id_string(),
                location,
            };
            self.publisher
                .publish(
                    ChannelMessage::event(ChannelEvent::LocationUpdate, &payload)
                        .with_topics(vec![Topic::User(order.customer.clone())]),
                )
                .await;
        }

        tracing::debug!(
            partner_id = %partner_id,
            notified_orders = in_flight.len(),
            "Location update relayed"
        );

        Ok(in_flight.len())
    }

    /// 拉取式查询：「我的骑手在哪」
    ///
    /// 仅订单的顾客/餐厅（及管理端）可查；未分配骑手或骑手从未
    /// 上报过位置时返回 `location: None`。
    pub async fn lookup(
        &self,
        actor: &CurrentUser,
        order_id: &str,
    ) -> AppResult<LocationResponsePayload> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {} not found", order_id)))?;

        let authorized = actor.role == Role::Admin
            || order.customer == actor.id
            || order.restaurant.as_deref() == Some(actor.id.as_str());
        if !authorized {
            return Err(AppError::forbidden(format!(
                "Order {} does not belong to this {}",
                order.order_number, actor.role
            )));
        }

        let location = match &order.delivery_partner {
            Some(partner) => self.users.location_of(partner).await?,
            None => None,
        };

        Ok(LocationResponsePayload {
            order_id: order.id_string(),
            location,
        })
    }
}
