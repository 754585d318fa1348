//! Capability-keyed service registry.
//!
//! Holds at most one shared instance per capability type. A capability is
//! usually a trait object (`dyn ScoreSystem`), but any `Send + Sync` type can
//! be registered. Lookup is by static type; there are no string keys.

use std::any::Any;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::capability::CapabilityKey;
use crate::error::RegistryError;

/// Stored value: an `Arc<T>` erased to `Any`, downcast back on lookup.
type Slot = Box<dyn Any + Send + Sync>;

/// Thread-safe table of capability slots.
#[derive(Default)]
pub struct ServiceRegistry {
    slots: DashMap<CapabilityKey, Slot>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` as the provider of capability `T`.
    ///
    /// Check-and-insert is atomic: of two racing registrations exactly one
    /// succeeds. On conflict the registered instance stays in place and the
    /// rejected `instance` is dropped.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use wordsort_backbone::{RegistryError, ServiceRegistry};
    ///
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    /// struct Fixed(u64);
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 {
    ///         self.0
    ///     }
    /// }
    ///
    /// let registry = ServiceRegistry::new();
    /// registry.register::<dyn Clock>(Arc::new(Fixed(7))).unwrap();
    ///
    /// let err = registry.register::<dyn Clock>(Arc::new(Fixed(8))).unwrap_err();
    /// assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
    /// assert_eq!(registry.try_get::<dyn Clock>().map(|c| c.now()), Some(7));
    /// ```
    pub fn register<T>(&self, instance: Arc<T>) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let capability = CapabilityKey::of::<T>();
        let inserted = match self.slots.entry(capability) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Box::new(instance));
                true
            }
        };

        if inserted {
            tracing::debug!(capability = %capability, "Service registered");
            Ok(())
        } else {
            tracing::error!(
                capability = %capability,
                "Service already registered; keeping the existing instance"
            );
            Err(RegistryError::AlreadyRegistered { capability })
        }
    }

    /// Remove capability `T`, provided `instance` is the registered one.
    ///
    /// Identity is pointer equality of the `Arc`s. Anything else leaves the
    /// table unchanged.
    pub fn unregister<T>(&self, instance: &Arc<T>) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let capability = CapabilityKey::of::<T>();
        let removed = self.slots.remove_if(&capability, |_, slot| {
            slot.downcast_ref::<Arc<T>>()
                .is_some_and(|registered| Arc::ptr_eq(registered, instance))
        });

        if removed.is_some() {
            tracing::debug!(capability = %capability, "Service unregistered");
            return Ok(());
        }

        if self.slots.contains_key(&capability) {
            tracing::warn!(
                capability = %capability,
                "Unregister ignored: a different instance is registered"
            );
            Err(RegistryError::InstanceMismatch { capability })
        } else {
            tracing::warn!(
                capability = %capability,
                "Unregister ignored: service is not registered"
            );
            Err(RegistryError::NotRegistered { capability })
        }
    }

    /// The provider of capability `T`, if any.
    pub fn try_get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let slot = self.slots.get(&CapabilityKey::of::<T>())?;
        slot.value().downcast_ref::<Arc<T>>().cloned()
    }

    /// Like [`try_get`](Self::try_get), but logs a warning when `T` has no
    /// provider.
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let service = self.try_get::<T>();
        if service.is_none() {
            tracing::warn!(
                capability = %CapabilityKey::of::<T>(),
                "Service not registered"
            );
        }
        service
    }

    pub fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.slots.contains_key(&CapabilityKey::of::<T>())
    }

    /// Remove every registration. Returns the number removed.
    pub fn clear(&self) -> usize {
        // Removed one at a time so instances drop outside the shard locks.
        let removed = self
            .registered_capabilities()
            .into_iter()
            .filter(|capability| self.slots.remove(capability).is_some())
            .count();

        tracing::debug!(removed, "Service registry cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Capabilities currently registered, in no particular order.
    pub fn registered_capabilities(&self) -> Vec<CapabilityKey> {
        self.slots.iter().map(|slot| *slot.key()).collect()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("capabilities", &self.registered_capabilities())
            .finish()
    }
}
