//! Order State Machine
//!
//! 纯逻辑：判定 (当前状态, 角色, 目标状态, 归属) → 允许/拒绝。
//! 不做任何 I/O，不碰存储——持久化与通知由 [`super::manager`] 编排。
//!
//! 权限矩阵（与当前状态无关）：
//!
//! | 角色 | 可请求的目标状态 |
//! |------|------------------|
//! | admin | 任意（含原因限定变体） |
//! | restaurant | confirmed / preparing / ready，仅限自家订单 |
//! | delivery | picked / on_the_way / delayed / delivered，仅限分配给自己的订单 |
//! | customer | cancelled，仅限自己的订单，且当前状态 ∈ {placed, confirmed} |

use thiserror::Error;

use crate::db::models::Order;
use shared::order::{OrderStatus, Role};

/// 顾客可取消窗口：食物开始制作后不可再取消
const CUSTOMER_CANCELLABLE: &[OrderStatus] = &[OrderStatus::Placed, OrderStatus::Confirmed];

/// 流转被拒绝的原因
///
/// Forbidden（归属/角色）与 InvalidState（状态机规则）必须可区分，
/// 客户端据此渲染不同的 UI。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),
}

/// 检查通过后的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// 追加时间线并落盘
    Apply,
    /// 目标与当前状态相同：接受但不产生任何变更
    NoOp,
}

/// 管理端是否可以把订单从终态再拉出来（误点送达、强制退款等场景）。
/// 当前保持宽松；要收紧终态锁只改这一处。
const fn admin_may_override_terminal() -> bool {
    true
}

/// 角色是否被授权请求该目标状态（与归属、当前状态无关）
fn role_permits(role: Role, target: OrderStatus) -> bool {
    match role {
        Role::Admin => true,
        Role::Restaurant => matches!(
            target,
            OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready
        ),
        Role::Delivery => matches!(
            target,
            OrderStatus::Picked
                | OrderStatus::OnTheWay
                | OrderStatus::Delayed(None)
                | OrderStatus::Delivered
        ),
        Role::Customer => matches!(target, OrderStatus::Cancelled(None)),
    }
}

/// 归属检查：角色对应的外键必须等于操作者 ID（admin 豁免）
fn owns(role: Role, actor_id: &str, order: &Order) -> bool {
    match role {
        Role::Admin => true,
        Role::Customer => order.customer == actor_id,
        Role::Restaurant => order.restaurant.as_deref() == Some(actor_id),
        Role::Delivery => order.delivery_partner.as_deref() == Some(actor_id),
    }
}

/// 操作者是否是订单的相关方（读路径可见性）
pub fn is_party(role: Role, actor_id: &str, order: &Order) -> bool {
    role == Role::Admin
        || order.customer == actor_id
        || order.restaurant.as_deref() == Some(actor_id)
        || order.delivery_partner.as_deref() == Some(actor_id)
}

/// 判定一次状态流转请求
///
/// 检查顺序刻意固定：归属 → 角色授权 → 同值无操作 → 终态锁 → 取消窗口。
/// 同值请求在授权通过后即接受为 NoOp（设置相同值不算修改，
/// 不追加时间线条目）。
pub fn can_transition(
    role: Role,
    actor_id: &str,
    order: &Order,
    target: OrderStatus,
) -> Result<TransitionCheck, TransitionError> {
    if !owns(role, actor_id, order) {
        return Err(TransitionError::Forbidden(format!(
            "Order {} does not belong to this {}",
            order.order_number, role
        )));
    }

    if !role_permits(role, target) {
        return Err(TransitionError::Forbidden(format!(
            "Role '{}' may not set status '{}'",
            role, target
        )));
    }

    if order.status == target {
        return Ok(TransitionCheck::NoOp);
    }

    if order.status.is_terminal() && !(role == Role::Admin && admin_may_override_terminal()) {
        return Err(TransitionError::InvalidState(format!(
            "No transition allowed out of terminal status '{}'",
            order.status
        )));
    }

    if role == Role::Customer && !CUSTOMER_CANCELLABLE.contains(&order.status) {
        return Err(TransitionError::InvalidState(format!(
            "Order can no longer be cancelled (status '{}')",
            order.status
        )));
    }

    Ok(TransitionCheck::Apply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AddressSnapshot;
    use shared::order::{CancelReason, DelayReason};

    fn test_order(status: OrderStatus) -> Order {
        Order {
            id: None,
            order_number: "ORD-250807-0042".to_string(),
            customer: "c1".to_string(),
            restaurant: Some("r1".to_string()),
            delivery_partner: Some("d1".to_string()),
            items: vec![],
            subtotal: 100.0,
            delivery_fee: 20.0,
            discount: 0.0,
            tax_amount: 5.0,
            final_amount: 125.0,
            applied_offer: None,
            status,
            timeline: vec![],
            cancellation: None,
            delivery_address: AddressSnapshot {
                address: "12 MG Road".to_string(),
                latitude: None,
                longitude: None,
                contact_name: None,
                contact_phone: None,
            },
            rating: None,
            created_at: 0,
            delivered_at: None,
        }
    }

    #[test]
    fn restaurant_must_own_the_order() {
        let order = test_order(OrderStatus::Placed);
        let denied = can_transition(Role::Restaurant, "r2", &order, OrderStatus::Confirmed);
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));

        let allowed = can_transition(Role::Restaurant, "r1", &order, OrderStatus::Confirmed);
        assert_eq!(allowed, Ok(TransitionCheck::Apply));
    }

    #[test]
    fn delivery_partner_must_be_assigned() {
        let mut order = test_order(OrderStatus::Ready);
        let ok = can_transition(Role::Delivery, "d1", &order, OrderStatus::Picked);
        assert_eq!(ok, Ok(TransitionCheck::Apply));

        order.delivery_partner = None;
        let denied = can_transition(Role::Delivery, "d1", &order, OrderStatus::Picked);
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn restaurant_may_not_use_delivery_vocabulary() {
        let order = test_order(OrderStatus::Ready);
        let denied = can_transition(Role::Restaurant, "r1", &order, OrderStatus::Picked);
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn delivery_may_report_plain_delay_but_not_qualified() {
        let order = test_order(OrderStatus::OnTheWay);
        let plain = can_transition(Role::Delivery, "d1", &order, OrderStatus::Delayed(None));
        assert_eq!(plain, Ok(TransitionCheck::Apply));

        let qualified = can_transition(
            Role::Delivery,
            "d1",
            &order,
            OrderStatus::Delayed(Some(DelayReason::Weather)),
        );
        assert!(matches!(qualified, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn customer_can_cancel_only_in_window() {
        for status in [OrderStatus::Placed, OrderStatus::Confirmed] {
            let order = test_order(status);
            let ok = can_transition(Role::Customer, "c1", &order, OrderStatus::Cancelled(None));
            assert_eq!(ok, Ok(TransitionCheck::Apply), "status {status}");
        }

        for status in [
            OrderStatus::Preparing,
            OrderStatus::Packing,
            OrderStatus::Packed,
            OrderStatus::Ready,
            OrderStatus::Picked,
            OrderStatus::OnTheWay,
            OrderStatus::Delayed(None),
            OrderStatus::OnHold,
        ] {
            let order = test_order(status);
            let denied = can_transition(Role::Customer, "c1", &order, OrderStatus::Cancelled(None));
            assert!(
                matches!(denied, Err(TransitionError::InvalidState(_))),
                "status {status} should be outside the cancellation window"
            );
        }
    }

    #[test]
    fn customer_cannot_cancel_someone_elses_order() {
        let order = test_order(OrderStatus::Placed);
        let denied = can_transition(Role::Customer, "c2", &order, OrderStatus::Cancelled(None));
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn customer_may_not_request_admin_cancel_vocabulary() {
        let order = test_order(OrderStatus::Placed);
        let denied = can_transition(
            Role::Customer,
            "c1",
            &order,
            OrderStatus::Cancelled(Some(CancelReason::ByCustomer)),
        );
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn terminal_states_lock_out_non_admin_actors() {
        for terminal in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled(None),
            OrderStatus::Cancelled(Some(CancelReason::PaymentFailed)),
            OrderStatus::RefundIssued,
        ] {
            let order = test_order(terminal);
            let denied = can_transition(Role::Restaurant, "r1", &order, OrderStatus::Confirmed);
            assert!(
                matches!(denied, Err(TransitionError::InvalidState(_))),
                "terminal {terminal} must reject restaurant transitions"
            );
        }
    }

    #[test]
    fn admin_may_move_any_order_anywhere() {
        // 含终态复活与原因限定词汇
        let order = test_order(OrderStatus::Delivered);
        let revive = can_transition(
            Role::Admin,
            "a1",
            &order,
            OrderStatus::Delayed(Some(DelayReason::RiderUnavailable)),
        );
        assert_eq!(revive, Ok(TransitionCheck::Apply));

        let order = test_order(OrderStatus::Cancelled(None));
        let refund = can_transition(Role::Admin, "a1", &order, OrderStatus::RefundIssued);
        assert_eq!(refund, Ok(TransitionCheck::Apply));
    }

    #[test]
    fn resubmitting_the_current_status_is_a_noop() {
        let order = test_order(OrderStatus::Confirmed);
        let check = can_transition(Role::Restaurant, "r1", &order, OrderStatus::Confirmed);
        assert_eq!(check, Ok(TransitionCheck::NoOp));

        // 同值但角色无授权依然是 Forbidden
        let order = test_order(OrderStatus::Picked);
        let denied = can_transition(Role::Restaurant, "r1", &order, OrderStatus::Picked);
        assert!(matches!(denied, Err(TransitionError::Forbidden(_))));
    }

    #[test]
    fn party_visibility() {
        let order = test_order(OrderStatus::Placed);
        assert!(is_party(Role::Customer, "c1", &order));
        assert!(is_party(Role::Restaurant, "r1", &order));
        assert!(is_party(Role::Delivery, "d1", &order));
        assert!(is_party(Role::Admin, "whoever", &order));
        assert!(!is_party(Role::Customer, "c2", &order));
    }
}
