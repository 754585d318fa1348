//! Per-message-type subscriber storage.
//!
//! A topic is the bus's entry for one capability key: the ordered listener
//! sequence and its scratch pool, guarded by the key's own mutex. Topics are
//! type-erased behind [`Subscribers`] so the bus can count and retire them
//! without knowing the message type.

use std::any::Any;
use std::sync::{Mutex, MutexGuard};

use super::listener::Listener;
use super::scratch::ScratchPool;
use crate::capability::CapabilityKey;

pub(crate) trait Subscribers: Send {
    fn len(&self) -> usize;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct TypedSubscribers<T: 'static> {
    pub(crate) listeners: Vec<Listener<T>>,
    pub(crate) scratch: ScratchPool<Listener<T>>,
}

impl<T: 'static> Subscribers for TypedSubscribers<T> {
    fn len(&self) -> usize {
        self.listeners.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Placeholder left behind when a topic is retired.
struct Vacant;

impl Subscribers for Vacant {
    fn len(&self) -> usize {
        0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) struct Topic {
    key: CapabilityKey,
    state: Mutex<TopicState>,
}

pub(crate) struct TopicState {
    /// Set once the topic has been pruned or cleared. A retired topic is no
    /// longer reachable from the bus and must not accept listeners.
    retired: bool,
    subscribers: Box<dyn Subscribers>,
}

impl Topic {
    pub(crate) fn new<T: 'static>(scratch_limit: usize, scratch_max_capacity: usize) -> Self {
        Self {
            key: CapabilityKey::of::<T>(),
            state: Mutex::new(TopicState {
                retired: false,
                subscribers: Box::new(TypedSubscribers::<T> {
                    listeners: Vec::new(),
                    scratch: ScratchPool::new(scratch_limit, scratch_max_capacity),
                }),
            }),
        }
    }

    pub(crate) fn key(&self) -> CapabilityKey {
        self.key
    }

    /// Lock the topic. Listeners never run under this lock, so a poisoned
    /// mutex still guards a consistent sequence and is recovered.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TopicState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl TopicState {
    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Typed access to the subscribers. `None` once retired.
    pub(crate) fn typed<T: 'static>(&mut self) -> Option<&mut TypedSubscribers<T>> {
        self.subscribers.as_any_mut().downcast_mut()
    }

    /// Mark the topic retired and hand back its subscribers.
    ///
    /// The returned box owns the listeners; drop it after releasing the lock,
    /// since dropping the last handle of a listener runs its captures' drop
    /// code.
    #[must_use]
    pub(crate) fn retire(&mut self) -> Box<dyn Subscribers> {
        self.retired = true;
        std::mem::replace(&mut self.subscribers, Box::new(Vacant))
    }
}
