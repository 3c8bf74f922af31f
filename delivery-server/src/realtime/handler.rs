//! 入站意图处理
//!
//! 订阅通道入站消息，把实时通道上的状态变更/位置意图分发到与
//! HTTP 相同的服务入口，再把 success / error / location:response
//! 回执单播给来源连接。

use tokio_util::sync::CancellationToken;

use super::location::LocationRelay;
use super::notifier::Notifier;
use crate::auth::CurrentUser;
use crate::orders::OrderService;
use crate::utils::{AppError, AppResult};
use shared::message::{
    ChannelEvent, ChannelMessage, LocationReportPayload, LocationRequestPayload, ResultPayload,
    StatusIntentPayload,
};
use shared::order::{OrderStatus, Role};

/// Server-side intent dispatcher
///
/// This handler runs in the background and processes all inbound
/// channel messages for business logic purposes.
pub struct IntentHandler {
    notifier: Notifier,
    orders: OrderService,
    relay: LocationRelay,
    receiver: tokio::sync::broadcast::Receiver<ChannelMessage>,
    shutdown_token: CancellationToken,
}

impl IntentHandler {
    /// 构造时即订阅入站通道，spawn 之前的消息也不会丢
    pub fn new(notifier: Notifier, orders: OrderService, relay: LocationRelay) -> Self {
        let shutdown_token = notifier.shutdown_token().clone();
        let receiver = notifier.subscribe_inbound();
        Self {
            notifier,
            orders,
            relay,
            receiver,
            shutdown_token,
        }
    }

    /// Start processing inbound messages
    ///
    /// This is a long-running task that should be spawned in the background.
    pub async fn run(mut self) {
        tracing::info!("Intent handler started");

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Intent handler shutting down");
                    break;
                }

                msg_result = self.receiver.recv() => {
                    match msg_result {
                        Ok(msg) => self.handle_message(msg).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "Intent handler lagged, inbound messages dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            tracing::info!("Inbound channel closed, intent handler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn handle_message(&self, msg: ChannelMessage) {
        // source 由连接读取任务注入；缺失说明消息不是从连接进来的
        let Some(source) = msg.source.clone() else {
            tracing::debug!(event = %msg.event, "Inbound message without source, ignored");
            return;
        };

        match self.dispatch(&source, &msg).await {
            Ok(reply) => {
                self.notifier
                    .unicast(&source, reply.with_correlation_id(msg.request_id))
                    .await;
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %source,
                    event = %msg.event,
                    error = %e,
                    "Intent rejected"
                );
                self.notifier
                    .unicast_error(&source, msg.request_id, e.to_string())
                    .await;
            }
        }
    }

    /// 分发一条入站意图，返回要单播的回执
    async fn dispatch(&self, source: &str, msg: &ChannelMessage) -> AppResult<ChannelMessage> {
        let info = self
            .notifier
            .identity(source)
            .ok_or_else(AppError::unauthorized)?;
        let actor = CurrentUser {
            id: info.user_id,
            name: info.name,
            role: info.role,
        };

        match msg.event {
            ChannelEvent::OrderStatusUpdate => {
                let payload: StatusIntentPayload = msg
                    .parse_payload()
                    .map_err(|e| AppError::validation(format!("Invalid payload: {}", e)))?;
                let target: OrderStatus = payload
                    .status
                    .parse()
                    .map_err(|e: String| AppError::validation(e))?;

                let order = self
                    .orders
                    .apply_transition(&actor, &payload.order_id, target, payload.note)
                    .await?;

                Ok(ChannelMessage::event(
                    ChannelEvent::Success,
                    &ResultPayload::ok(format!(
                        "Order {} updated to '{}'",
                        order.order_number, order.status
                    )),
                ))
            }

            ChannelEvent::LocationUpdate => {
                if actor.role != Role::Delivery {
                    return Err(AppError::forbidden(
                        "Only delivery partners may report location",
                    ));
                }
                let payload: LocationReportPayload = msg
                    .parse_payload()
                    .map_err(|e| AppError::validation(format!("Invalid payload: {}", e)))?;

                let notified = self.relay.report(&actor.id, payload).await?;
                Ok(ChannelMessage::event(
                    ChannelEvent::Success,
                    &ResultPayload::ok(format!("Location received ({} orders notified)", notified)),
                ))
            }

            ChannelEvent::LocationRequest => {
                let payload: LocationRequestPayload = msg
                    .parse_payload()
                    .map_err(|e| AppError::validation(format!("Invalid payload: {}", e)))?;

                let response = self.relay.lookup(&actor, &payload.order_id).await?;
                Ok(ChannelMessage::event(
                    ChannelEvent::LocationResponse,
                    &response,
                ))
            }

            ChannelEvent::Auth => Err(AppError::validation("Connection already authenticated")),

            other => Err(AppError::validation(format!(
                "Unsupported channel event: {}",
                other
            ))),
        }
    }
}
