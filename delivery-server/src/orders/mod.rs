//! 订单生命周期核心
//!
//! - [`lifecycle`] - 纯状态机：权限矩阵 + 流转合法性
//! - [`manager`] - 编排：校验 → CAS 落盘 → 提交后扇出
//! - [`pickup`] - 跑腿任务的轻量同胞状态机
//! - [`money`] - 金额计算（rust_decimal，2 位小数）
//! - [`number`] - 人类可读单号生成

pub mod lifecycle;
pub mod manager;
pub mod money;
pub mod number;
pub mod pickup;

pub use manager::{ItemInput, OrderService, PlaceOrderRequest, RatingRequest, TrackResponse};
pub use pickup::{PickupService, PlacePickupRequest};

#[cfg(test)]
mod tests;
