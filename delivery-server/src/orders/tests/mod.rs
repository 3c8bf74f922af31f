//! 订单编排测试
//!
//! 内存数据库 + 记录型 Publisher，不需要真实连接。

mod test_fanout;
mod test_pickups;
mod test_transitions;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::auth::CurrentUser;
use crate::core::ChargeConfig;
use crate::db::DbService;
use crate::db::models::AddressSnapshot;
use crate::db::repository::{OrderRepository, PickupRepository, UserRepository};
use crate::orders::manager::{ItemInput, PlaceOrderRequest};
use crate::orders::pickup::PlacePickupRequest;
use crate::orders::{OrderService, PickupService};
use crate::realtime::{LocationRelay, Publisher};
use shared::message::{ChannelEvent, ChannelMessage};
use shared::order::Role;

/// 记录所有发布消息的测试替身
pub(crate) struct RecordingPublisher {
    messages: Mutex<Vec<ChannelMessage>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    pub async fn messages(&self) -> Vec<ChannelMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.messages.lock().await.clear();
    }

    pub async fn of_event(&self, event: ChannelEvent) -> Vec<ChannelMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|m| m.event == event)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, message: ChannelMessage) {
        self.messages.lock().await.push(message);
    }
}

/// 全套服务跑在一个内存数据库上
pub(crate) struct TestContext {
    pub orders: OrderService,
    pub pickups: PickupService,
    pub relay: LocationRelay,
    pub users: UserRepository,
    pub publisher: Arc<RecordingPublisher>,
}

pub(crate) async fn test_context() -> TestContext {
    let db = DbService::memory().await.unwrap().db;
    let publisher = Arc::new(RecordingPublisher::new());
    let dyn_publisher: Arc<dyn Publisher> = publisher.clone();

    let orders = OrderService::new(
        OrderRepository::new(db.clone()),
        dyn_publisher.clone(),
        ChargeConfig::default(),
    );
    let pickups = PickupService::new(PickupRepository::new(db.clone()), dyn_publisher.clone());
    let relay = LocationRelay::new(
        OrderRepository::new(db.clone()),
        UserRepository::new(db.clone()),
        dyn_publisher,
    );

    TestContext {
        orders,
        pickups,
        relay,
        users: UserRepository::new(db),
        publisher,
    }
}

pub(crate) fn actor(id: &str, role: Role) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        name: format!("Test {}", id),
        role,
    }
}

pub(crate) fn test_address(label: &str) -> AddressSnapshot {
    AddressSnapshot {
        address: format!("{}, 12 MG Road, Bengaluru", label),
        latitude: Some(12.97),
        longitude: Some(77.59),
        contact_name: None,
        contact_phone: None,
    }
}

pub(crate) fn sample_order_request(restaurant: Option<&str>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: vec![
            ItemInput {
                product_id: "prod:dosa".to_string(),
                name: "Masala Dosa".to_string(),
                price: 120.0,
                quantity: 2,
            },
            ItemInput {
                product_id: "prod:chai".to_string(),
                name: "Cutting Chai".to_string(),
                price: 15.0,
                quantity: 1,
            },
        ],
        restaurant: restaurant.map(|r| r.to_string()),
        delivery_address: test_address("Home"),
        applied_offer: None,
    }
}

pub(crate) fn sample_pickup_request() -> PlacePickupRequest {
    PlacePickupRequest {
        pickup_address: test_address("Office"),
        drop_address: test_address("Home"),
        item_category: "documents".to_string(),
    }
}
