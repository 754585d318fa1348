//! Typed publish/subscribe messaging.
//!
//! - `EventBus`: per-message-type subscription table and synchronous fan-out
//! - `Listener`: shared callback handle, compared by identity
//! - `DispatchReport`: per-listener outcome of one publish

mod bus;
mod listener;
mod report;
mod scratch;
mod topic;

pub use bus::{EventBus, EventBusStats};
pub use listener::Listener;
pub use report::{DispatchReport, ListenerFailure};
