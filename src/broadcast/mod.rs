//! Progress Broadcast Module
//!
//! Fans stage events out to every subscribed observer.
//!
//! ## Architecture
//!
//! - **BroadcastRegistry**: live set of observer connections (register, deregister, fan-out)
//! - **ObserverSink**: write side of one connection; `ChannelSink` feeds an SSE stream
//! - **StageReporter**: builds stage events and hands them to the registry
//! - **RequestReporter**: per-request handle that stops emitting after a terminal event
//!
//! Delivery is best-effort. A failed write never reaches the pipeline that
//! produced the event.

mod registry;
mod reporter;
mod sink;

pub use registry::{BroadcastRegistry, ConnectionId, ObserverGuard};
pub use reporter::{RequestReporter, StageReporter};
pub use sink::{ChannelSink, DeliveryError, ObserverSink};
