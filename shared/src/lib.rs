//! Shared types for the delivery marketplace
//!
//! Common types used by the server and its clients: the order status
//! vocabulary, realtime channel protocol frames and payloads, and small
//! utility helpers.

pub mod message;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Channel protocol re-exports (for convenient access)
pub use message::{ChannelEvent, ChannelMessage, Topic};
pub use order::{OrderStatus, PickupStatus, Role};
