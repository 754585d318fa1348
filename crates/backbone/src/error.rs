//! Error types for backbone operations.
//!
//! Absence (no listeners, no registered service) is never an error and has
//! no variant here.

use crate::capability::CapabilityKey;

/// Boxed error returned by fallible listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Service registry conflicts. The table is left unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A service already occupies the capability slot.
    #[error("service {capability} is already registered")]
    AlreadyRegistered { capability: CapabilityKey },

    /// Unregister was called for an empty capability slot.
    #[error("service {capability} is not registered")]
    NotRegistered { capability: CapabilityKey },

    /// Unregister was called with an instance other than the registered one.
    #[error("a different instance of service {capability} is registered")]
    InstanceMismatch { capability: CapabilityKey },
}

impl RegistryError {
    /// The capability slot the conflict occurred on.
    pub fn capability(&self) -> CapabilityKey {
        match self {
            Self::AlreadyRegistered { capability }
            | Self::NotRegistered { capability }
            | Self::InstanceMismatch { capability } => *capability,
        }
    }
}

/// Failure of a single listener invocation during dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The listener returned an error.
    #[error("listener returned an error: {0}")]
    Failed(#[source] BoxError),

    /// The listener panicked. Holds the panic message when one was available.
    #[error("listener panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A setting is out of its allowed range.
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
