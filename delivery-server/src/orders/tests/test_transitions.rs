use super::*;
use crate::utils::AppError;
use shared::order::OrderStatus;

#[tokio::test]
async fn placement_seeds_timeline_and_freezes_financials() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();

    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.timeline.len(), 1);
    assert_eq!(order.timeline[0].status, OrderStatus::Placed);

    // subtotal 255, fee 30+5, tax 5% = 12.75
    assert_eq!(order.subtotal, 255.0);
    assert_eq!(order.delivery_fee, 35.0);
    assert_eq!(order.tax_amount, 12.75);
    assert_eq!(
        order.final_amount,
        order.subtotal + order.delivery_fee + order.tax_amount - order.discount
    );
}

#[tokio::test]
async fn only_customers_place_orders() {
    let ctx = test_context().await;
    let restaurant = actor("r1", Role::Restaurant);
    let denied = ctx
        .orders
        .place_order(&restaurant, sample_order_request(Some("r1")))
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn transition_appends_to_timeline() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();

    let updated = ctx
        .orders
        .apply_transition(
            &restaurant,
            &order.id_string(),
            OrderStatus::Confirmed,
            Some("on it".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(updated.timeline.len(), 2);
    assert_eq!(updated.timeline.last().unwrap().status, OrderStatus::Confirmed);
    assert_eq!(
        updated.timeline.last().unwrap().note.as_deref(),
        Some("on it")
    );
}

#[tokio::test]
async fn unknown_order_is_not_found_but_foreign_actor_is_forbidden() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();

    // 不存在的订单 → NotFound
    let missing = ctx
        .orders
        .apply_transition(
            &actor("r1", Role::Restaurant),
            "order:doesnotexist",
            OrderStatus::Confirmed,
            None,
        )
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    // ID 格式非法也按 NotFound 处理
    let bad_id = ctx
        .orders
        .apply_transition(
            &actor("r1", Role::Restaurant),
            "garbage",
            OrderStatus::Confirmed,
            None,
        )
        .await;
    assert!(matches!(bad_id, Err(AppError::NotFound(_))));

    // 存在但不属于该餐厅 → Forbidden
    let foreign = ctx
        .orders
        .apply_transition(
            &actor("r2", Role::Restaurant),
            &order.id_string(),
            OrderStatus::Confirmed,
            None,
        )
        .await;
    assert!(matches!(foreign, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn resubmitting_same_status_does_not_grow_timeline() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();

    let first = ctx
        .orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(first.timeline.len(), 2);

    let second = ctx
        .orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(second.timeline.len(), 2);
    assert_eq!(second.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn customer_cancellation_window_is_enforced() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);

    // placed 可取消，取消元数据要记录操作者
    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let cancelled = ctx
        .orders
        .cancel(&customer, &order.id_string(), "changed my mind".to_string())
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled(None));
    let info = cancelled.cancellation.expect("cancellation metadata");
    assert_eq!(info.reason, "changed my mind");
    assert_eq!(info.actor_id, "c1");
    assert_eq!(info.actor_role, Role::Customer);

    // preparing 之后不可取消
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
    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Preparing, None)
        .await
        .unwrap();

    let too_late = ctx
        .orders
        .cancel(&customer, &id, "too slow".to_string())
        .await;
    assert!(matches!(too_late, Err(AppError::BusinessRule(_))));
}

#[tokio::test]
async fn delivered_at_is_set_once_and_never_overwritten() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let admin = actor("a1", Role::Admin);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();

    let delivered = ctx
        .orders
        .apply_transition(&admin, &id, OrderStatus::Delivered, None)
        .await
        .unwrap();
    let first_delivered_at = delivered.delivered_at.expect("delivered_at set");

    // 管理端把订单拉出终态再送达一次
    ctx.orders
        .apply_transition(&admin, &id, OrderStatus::OnHold, None)
        .await
        .unwrap();
    let redelivered = ctx
        .orders
        .apply_transition(&admin, &id, OrderStatus::Delivered, None)
        .await
        .unwrap();

    assert_eq!(redelivered.delivered_at, Some(first_delivered_at));
    assert_eq!(redelivered.timeline.len(), 4);
}

#[tokio::test]
async fn admin_override_reaches_any_status() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let admin = actor("a1", Role::Admin);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();

    let cancelled = ctx
        .orders
        .apply_transition(
            &admin,
            &id,
            "cancelled_payment_failed".parse().unwrap(),
            None,
        )
        .await
        .unwrap();
    assert!(cancelled.status.is_cancelled());
    assert_eq!(
        cancelled.cancellation.as_ref().map(|c| c.actor_role),
        Some(Role::Admin)
    );

    // 终态之后管理端仍可强制 refund_issued
    let refunded = ctx
        .orders
        .apply_transition(&admin, &id, OrderStatus::RefundIssued, None)
        .await
        .unwrap();
    assert_eq!(refunded.status, OrderStatus::RefundIssued);
}

#[tokio::test]
async fn claim_requires_ready_and_is_first_come_first_served() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let restaurant = actor("r1", Role::Restaurant);
    let rider_one = actor("d1", Role::Delivery);
    let rider_two = actor("d2", Role::Delivery);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();

    // 还没 ready，不能认领
    let early = ctx.orders.claim(&rider_one, &id).await;
    assert!(matches!(early, Err(AppError::BusinessRule(_))));

    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Confirmed, None)
        .await
        .unwrap();
    ctx.orders
        .apply_transition(&restaurant, &id, OrderStatus::Ready, None)
        .await
        .unwrap();

    let claimed = ctx.orders.claim(&rider_one, &id).await.unwrap();
    assert_eq!(claimed.delivery_partner.as_deref(), Some("d1"));

    let lost = ctx.orders.claim(&rider_two, &id).await;
    assert!(matches!(lost, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn rating_is_one_shot_and_delivered_only() {
    let ctx = test_context().await;
    let customer = actor("c1", Role::Customer);
    let admin = actor("a1", Role::Admin);

    let order = ctx
        .orders
        .place_order(&customer, sample_order_request(Some("r1")))
        .await
        .unwrap();
    let id = order.id_string();

    let rating = crate::orders::RatingRequest {
        food: 5,
        delivery: 4,
        review: Some("great dosa".to_string()),
    };

    // delivered 之前不可评价
    let early = ctx.orders.rate(&customer, &id, rating).await;
    assert!(matches!(early, Err(AppError::BusinessRule(_))));

    ctx.orders
        .apply_transition(&admin, &id, OrderStatus::Delivered, None)
        .await
        .unwrap();

    let rated = ctx
        .orders
        .rate(
            &customer,
            &id,
            crate::orders::RatingRequest {
                food: 5,
                delivery: 4,
                review: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(rated.rating.as_ref().map(|r| r.food), Some(5));

    // 恰好一次
    let again = ctx
        .orders
        .rate(
            &customer,
            &id,
            crate::orders::RatingRequest {
                food: 1,
                delivery: 1,
                review: None,
            },
        )
        .await;
    assert!(matches!(again, Err(AppError::BusinessRule(_))));

    // 其他顾客不可评价
    let stranger = ctx
        .orders
        .rate(
            &actor("c2", Role::Customer),
            &id,
            crate::orders::RatingRequest {
                food: 3,
                delivery: 3,
                review: None,
            },
        )
        .await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn listings_are_role_scoped() {
    let ctx = test_context().await;
    let customer_one = actor("c1", Role::Customer);
    let customer_two = actor("c2", Role::Customer);

    ctx.orders
        .place_order(&customer_one, sample_order_request(Some("r1")))
        .await
        .unwrap();
    ctx.orders
        .place_order(&customer_two, sample_order_request(Some("r2")))
        .await
        .unwrap();

    let own = ctx.orders.list(&customer_one, None).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].customer, "c1");

    let r1_orders = ctx
        .orders
        .list(&actor("r1", Role::Restaurant), None)
        .await
        .unwrap();
    assert_eq!(r1_orders.len(), 1);

    let all = ctx.orders.list(&actor("a1", Role::Admin), None).await.unwrap();
    assert_eq!(all.len(), 2);

    let placed_only = ctx
        .orders
        .list(&actor("a1", Role::Admin), Some(OrderStatus::Placed))
        .await
        .unwrap();
    assert_eq!(placed_only.len(), 2);
}

#[tokio::test]
async fn track_returns_full_timeline_for_parties_only() {
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

    let track = ctx.orders.track(&customer, &id).await.unwrap();
    assert_eq!(track.status, OrderStatus::Confirmed);
    assert_eq!(track.timeline.len(), 2);

    let stranger = ctx.orders.track(&actor("c2", Role::Customer), &id).await;
    assert!(matches!(stranger, Err(AppError::Forbidden(_))));
}
