//! `larder-broadcast` — channel-addressed state-change notifications.
//!
//! Domain mutations commit first; the resulting [`BroadcastEvent`]s fan out
//! to named channels afterwards, best-effort. Subscribers treat these as
//! hints to refresh, never as a source of truth.

pub mod dispatcher;
pub mod event;

pub use dispatcher::BroadcastDispatcher;
pub use event::{BroadcastEvent, ChannelMessage, StockChange};
