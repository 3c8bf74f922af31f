//! Database models

pub mod order;
pub mod pickup_drop;
pub mod serde_helpers;
pub mod user;

pub use order::{
    AddressSnapshot, AppliedOffer, CancellationInfo, Order, OrderItem, OrderRating,
};
pub use pickup_drop::PickupDrop;
pub use user::User;
