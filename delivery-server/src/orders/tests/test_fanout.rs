use super::*;
use shared::message::Topic;
use shared::message::{OrderAlertPayload, RateRequestPayload, StatusUpdatePayload};
use shared::order::OrderStatus;

#[tokio::test]
async fn placement_fans_out_and_alerts_the_restaurant() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();

    let updates = ctx.publisher.of_event(ChannelEvent::OrderStatusUpdate).await;
    assert_eq!(updates.len(), 1);
    let payload: StatusUpdatePayload = updates[0].parse_payload().unwrap();
    assert_eq!(payload.status, OrderStatus::Placed);
    assert_eq!(payload.order_number, order.order_number);

    let alerts = ctx.publisher.of_event(ChannelEvent::OrderPlaced).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].topics, vec![Topic::Restaurant("r1".to_string())]);
    let alert: OrderAlertPayload = alerts[0].parse_payload().unwrap();
    assert_eq!(alert.order_id, order.id_string());
}

#[tokio::test]
async fn confirmation_reaches_customer_restaurant_and_admin_only() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    ctx.publisher.clear().await;

    ctx.orders
        .apply_transition(&restaurant, &order.id_string(), OrderStatus::Confirmed, None)
        .await
        .unwrap();

    let messages = ctx.publisher.messages().await;
    assert_eq!(messages.len(), 1, "confirmed has no extra targeted event");

    let update = &messages[0];
    assert_eq!(update.event, ChannelEvent::OrderStatusUpdate);
    assert!(update.topics.contains(&Topic::User("c1".to_string())));
    assert!(update.topics.contains(&Topic::Restaurant("r1".to_string())));
    assert!(update.topics.contains(&Topic::Role(Role::Admin)));
    // 未分配骑手：不发往任何 delivery:* 主题
    assert!(
        !update
            .topics
            .iter()
            .any(|t| matches!(t, Topic::Delivery(_))),
        "no delivery topic before assignment"
    );
}

#[tokio::test]
async fn ready_broadcasts_to_the_whole_delivery_pool() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();
    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    ctx.publisher.clear().await;

    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Ready, None)
        .await
        .unwrap();

    let updates = ctx.publisher.of_event(ChannelEvent::OrderStatusUpdate).await;
    assert_eq!(updates.len(), 1);

    // 恰好一条池级广播，目标是整个 role:delivery 主题
    let pool = ctx
        .publisher
        .of_event(ChannelEvent::OrderReadyForPickup)
        .await;
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].topics, vec![Topic::Role(Role::Delivery)]);
}

#[tokio::test]
async fn delivery_prompts_the_customer_to_rate() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let admin = actor("a1", Role::Admin);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    ctx.publisher.clear().await;

    ctx.orders
        .apply_transition(&admin, &order.id_string(), OrderStatus::Delivered, None)
        .await
        .unwrap();

    let prompts = ctx.publisher.of_event(ChannelEvent::OrderRateRequest).await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].topics, vec![Topic::User("c1".to_string())]);
    let prompt: RateRequestPayload = prompts[0].parse_payload().unwrap();
    assert_eq!(prompt.order_number, order.order_number);
}

#[tokio::test]
async fn noop_resubmission_publishes_nothing() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();
    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    ctx.publisher.clear().await;

    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();

    assert!(ctx.publisher.messages().await.is_empty());
}
