//! Wordsort Backbone - Typed event bus and service registry
//!
//! The communication backbone of the word-sorting game. Subsystems talk to
//! each other in two ways, both keyed by a Rust type named at the call site:
//!
//! - [`EventBus`]: publish a message value, and every listener subscribed to
//!   that message type receives it synchronously
//! - [`ServiceRegistry`]: register one shared implementation per capability
//!   (usually a `dyn Trait`) and look it up from anywhere
//!
//! [`Backbone`] bundles one of each and is shared as `Arc<Backbone>`.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use wordsort_backbone::Backbone;
//!
//! struct ScoreChanged {
//!     value: i32,
//! }
//!
//! let backbone = Backbone::default();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let seen_clone = Arc::clone(&seen);
//! let listener = backbone.events().subscribe_fn(move |evt: &ScoreChanged| {
//!     seen_clone.lock().unwrap().push(evt.value);
//! });
//!
//! backbone.events().publish(&ScoreChanged { value: 42 });
//! backbone.events().unsubscribe(&listener);
//! backbone.events().publish(&ScoreChanged { value: 7 });
//!
//! assert_eq!(*seen.lock().unwrap(), vec![42]);
//! ```
//!
//! # Failure model
//!
//! Absence is never an error: publishing without listeners and looking up an
//! unregistered capability are normal. Registry conflicts come back as
//! [`RegistryError`]. Listener errors and panics are isolated per listener and
//! collected in a [`DispatchReport`].

mod backbone;
pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod services;

pub use backbone::Backbone;
pub use capability::CapabilityKey;
pub use config::BackboneConfig;
pub use error::{BoxError, ConfigError, DispatchError, RegistryError};
pub use events::{DispatchReport, EventBus, EventBusStats, Listener, ListenerFailure};
pub use services::ServiceRegistry;
