//! Order domain vocabulary shared between server and clients

pub mod types;

pub use types::{
    AccountStatus, CancelReason, DelayReason, DeliveryFailureReason, GeoPoint, OrderStatus,
    PickupStatus, PickupTimelineEntry, Role, TimelineEntry,
};
