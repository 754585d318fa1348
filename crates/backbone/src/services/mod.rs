//! Service location by capability type.

mod registry;

pub use registry::ServiceRegistry;
