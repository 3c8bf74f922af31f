use super::*;
use crate::utils::AppError;
use shared::message::Topic;
use shared::order::PickupStatus;

#[tokio::test]
async fn creation_seeds_timeline_and_broadcasts_to_the_pool() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);

    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();

    assert!(pickup.pickup_number.starts_with("PKP-"));
    assert_eq!(pickup.status, PickupStatus::Placed);
    assert_eq!(pickup.timeline.len(), 1);

    let available = ctx.publisher.of_event(ChannelEvent::PickupAvailable).await;
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].topics, vec![Topic::Role(Role::Delivery)]);

    let updates = ctx
        .publisher
        .of_event(ChannelEvent::PickupStatusUpdate)
        .await;
    assert_eq!(updates.len(), 1);
    assert!(updates[0].topics.contains(&Topic::User("c1".to_string())));
    assert!(updates[0].topics.contains(&Topic::Role(Role::Admin)));
}

#[tokio::test]
async fn claim_then_full_delivery_flow() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let rider = actor("d1", Role::Delivery);

    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();
    let id = pickup.id_string();

    let claimed = ctx.pickups.claim(&rider, &id).await.unwrap();
    assert_eq!(claimed.status, PickupStatus::Assigned);
    assert_eq!(claimed.delivery_partner.as_deref(), Some("d1"));
    assert_eq!(claimed.timeline.len(), 2);

    // 认领后骑手主题开始收到更新
    ctx.publisher.clear().await;
    let picked = ctx
        .pickups
        .apply_transition(&rider, &id, PickupStatus::Picked, None)
        .await
        .unwrap();
    assert_eq!(picked.timeline.len(), 3);
    let updates = ctx
        .publisher
        .of_event(ChannelEvent::PickupStatusUpdate)
        .await;
    assert!(updates[0].topics.contains(&Topic::Delivery("d1".to_string())));

    ctx.pickups
        .apply_transition(&rider, &id, PickupStatus::OnTheWay, None)
        .await
        .unwrap();
    let delivered = ctx
        .pickups
        .apply_transition(&rider, &id, PickupStatus::Delivered, None)
        .await
        .unwrap();
    assert!(delivered.delivered_at.is_some());
    assert_eq!(delivered.timeline.last().unwrap().status, PickupStatus::Delivered);
}

#[tokio::test]
async fn unassigned_rider_may_not_advance_the_task() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let rider_one = actor("d1", Role::Delivery);
    let rider_two = actor("d2", Role::Delivery);

    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();
    let id = pickup.id_string();
    ctx.pickups.claim(&rider_one, &id).await.unwrap();

    let denied = ctx
        .pickups
        .apply_transition(&rider_two, &id, PickupStatus::Picked, None)
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    // 二次认领冲突
    let conflict = ctx.pickups.claim(&rider_two, &id).await;
    assert!(matches!(conflict, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn customer_cancel_window_closes_at_pickup() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let rider = actor("d1", Role::Delivery);

    // assigned 仍可取消
    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();
    let id = pickup.id_string();
    ctx.pickups.claim(&rider, &id).await.unwrap();
    let cancelled = ctx
        .pickups
        .cancel(&customer, &id, "no longer needed".to_string())
        .await
        .unwrap();
    assert_eq!(cancelled.status, PickupStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation.as_ref().map(|c| c.actor_id.as_str()),
        Some("c1")
    );

    // picked 之后不可取消
    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();
    let id = pickup.id_string();
    ctx.pickups.claim(&rider, &id).await.unwrap();
    ctx.pickups
        .apply_transition(&rider, &id, PickupStatus::Picked, None)
        .await
        .unwrap();

    let too_late = ctx.pickups.cancel(&customer, &id, "oops".to_string()).await;
    assert!(matches!(too_late, Err(AppError::BusinessRule(_))));
}

#[tokio::test]
async fn restaurants_have_no_pickup_access() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let pickup = ctx
        .pickups
        .place(&customer, sample_pickup_request())
        .await
        .unwrap();

    let listing = ctx.pickups.list(&restaurant, None).await;
    assert!(matches!(listing, Err(AppError::Forbidden(_))));

    let get = ctx.pickups.get(&restaurant, &pickup.id_string()).await;
    assert!(matches!(get, Err(AppError::Forbidden(_))));
}
