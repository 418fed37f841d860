//! Outbound transport implementations for broadcast messages.
//!
//! The in-memory bus lives in `larder-events`; this module holds the
//! deployable transports.

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBroadcastBus, RedisBusError};
