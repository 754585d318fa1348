//! Typed publish/subscribe event bus.
//!
//! Listeners subscribe to a message type; publishing a value of that type
//! fans it out synchronously to every listener subscribed at that moment.
//!
//! # Locking
//!
//! Each message type (capability key) owns one topic behind its own mutex,
//! so traffic for unrelated message types never contends. Publish copies the
//! listener sequence into a pooled scratch buffer under the topic lock and
//! invokes listeners after releasing it; a listener may therefore subscribe,
//! unsubscribe or publish, for its own type or any other, without
//! deadlocking. `clear_all` is the one operation that holds every topic lock
//! at once.
//!
//! A topic whose last listener is removed is *retired* and dropped from the
//! table while its lock is held. Operations that lock a retired topic look
//! the key up again, so a concurrent subscribe is never lost to pruning.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;

use super::listener::Listener;
use super::report::DispatchReport;
use super::topic::{Subscribers, Topic, TopicState};
use crate::capability::CapabilityKey;
use crate::config::BackboneConfig;

/// Process-local, thread-safe event bus keyed by message type.
pub struct EventBus {
    topics: DashMap<CapabilityKey, Arc<Topic>>,
    /// Serializes `clear_all`, the only operation holding several topic locks.
    clear_gate: Mutex<()>,
    scratch_limit: usize,
    scratch_max_capacity: usize,
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Event bus statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventBusStats {
    /// Message types with at least one listener
    pub topics: usize,
    /// Listeners across all message types
    pub listeners: usize,
    /// Publish calls, including those that found no listener
    pub published: u64,
    /// Listener invocations that completed
    pub delivered: u64,
    /// Listener invocations that returned an error or panicked
    pub failed: u64,
}

impl EventBus {
    /// Create a bus with default scratch pooling.
    pub fn new() -> Self {
        Self::with_config(&BackboneConfig::default())
    }

    pub fn with_config(config: &BackboneConfig) -> Self {
        let (scratch_limit, scratch_max_capacity) = if config.pooling_enabled() {
            (config.scratch_pool_limit, config.max_retained_capacity)
        } else {
            (0, 0)
        };

        Self {
            topics: DashMap::new(),
            clear_gate: Mutex::new(()),
            scratch_limit,
            scratch_max_capacity,
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Subscribe `listener` to messages of type `T`.
    ///
    /// Always succeeds. Subscribing the same handle twice yields two
    /// deliveries per publish.
    pub fn subscribe<T: 'static>(&self, listener: Listener<T>) {
        let listeners = self
            .with_live_topic::<T, _>(true, move |_, state| {
                state.typed::<T>().map(|subs| {
                    subs.listeners.push(listener);
                    subs.listeners.len()
                })
            })
            .flatten();

        match listeners {
            Some(listeners) => tracing::debug!(
                capability = %CapabilityKey::of::<T>(),
                listeners,
                "Listener subscribed"
            ),
            None => tracing::error!(
                capability = %CapabilityKey::of::<T>(),
                "Topic holds listeners of another message type; subscription dropped"
            ),
        }
    }

    /// Wrap `callback` in a listener, subscribe it, and return the handle
    /// for a later [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe_fn<T, F>(&self, callback: F) -> Listener<T>
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener = Listener::new(callback);
        self.subscribe(listener.clone());
        listener
    }

    /// Remove the first occurrence of `listener` from `T`'s subscribers.
    ///
    /// Returns whether a subscription was removed. Removing the last
    /// listener prunes the topic.
    pub fn unsubscribe<T: 'static>(&self, listener: &Listener<T>) -> bool {
        let removed = self
            .with_live_topic::<T, _>(false, |topic, state| {
                let subs = state.typed::<T>()?;
                let position = subs.listeners.iter().position(|l| l.same_as(listener))?;
                let removed = subs.listeners.remove(position);
                let remaining = subs.listeners.len();
                let evicted = (remaining == 0).then(|| self.prune(topic, state));
                Some((removed, evicted, remaining))
            })
            .flatten();

        match removed {
            Some((_removed, _evicted, remaining)) => {
                tracing::debug!(
                    capability = %CapabilityKey::of::<T>(),
                    listeners = remaining,
                    "Listener unsubscribed"
                );
                true
            }
            None => false,
        }
    }

    /// Remove every listener of `T` and prune its topic.
    ///
    /// Returns the number of listeners removed.
    pub fn unsubscribe_all<T: 'static>(&self) -> usize {
        let Some(evicted) =
            self.with_live_topic::<T, _>(false, |topic, state| self.prune(topic, state))
        else {
            return 0;
        };

        let removed = evicted.len();
        drop(evicted);
        tracing::debug!(
            capability = %CapabilityKey::of::<T>(),
            removed,
            "Unsubscribed all listeners"
        );
        removed
    }

    /// Remove every subscription for every message type.
    ///
    /// Waits for each topic's lock, so no publish is mid-snapshot when the
    /// tables are dropped. Topics created while the reset runs survive it.
    pub fn clear_all(&self) {
        let _gate = self.clear_gate.lock().unwrap_or_else(|p| p.into_inner());

        let topics = self.live_topics();
        let mut guards: Vec<MutexGuard<'_, TopicState>> =
            topics.iter().map(|topic| topic.lock()).collect();

        let mut evicted = Vec::with_capacity(guards.len());
        for (topic, state) in topics.iter().zip(guards.iter_mut()) {
            if !state.is_retired() {
                evicted.push(state.retire());
                self.topics
                    .remove_if(&topic.key(), |_, current| Arc::ptr_eq(current, topic));
            }
        }
        drop(guards);

        let listeners: usize = evicted.iter().map(|subs| subs.len()).sum();
        let cleared = evicted.len();
        drop(evicted);
        tracing::debug!(topics = cleared, listeners, "Cleared all subscriptions");
    }

    /// Deliver `message` to every listener of `T` and log listener failures.
    ///
    /// Publishing with no listeners is a no-op. Failures never reach the
    /// publisher; use [`dispatch`](Self::dispatch) to inspect them.
    pub fn publish<T: 'static>(&self, message: &T) {
        self.dispatch(message).log_failures();
    }

    /// Deliver `message` to every listener of `T` and report the outcome of
    /// each invocation.
    ///
    /// Listeners run in subscription order on the calling thread, outside any
    /// lock. A listener that fails or panics does not stop delivery to the
    /// ones after it.
    pub fn dispatch<T: 'static>(&self, message: &T) -> DispatchReport {
        let key = CapabilityKey::of::<T>();
        self.published.fetch_add(1, Ordering::Relaxed);

        let Some(snapshot) = self.snapshot::<T>() else {
            return DispatchReport::empty(key);
        };

        let mut report = DispatchReport::new(key, snapshot.len());
        for (position, listener) in snapshot.iter().enumerate() {
            report.record(position, listener.invoke(message));
        }
        drop(snapshot);

        self.delivered
            .fetch_add(report.delivered() as u64, Ordering::Relaxed);
        self.failed
            .fetch_add(report.failures().len() as u64, Ordering::Relaxed);
        report
    }

    /// Listeners currently subscribed to `T`.
    pub fn listener_count<T: 'static>(&self) -> usize {
        self.with_live_topic::<T, _>(false, |_, state| state.len())
            .unwrap_or(0)
    }

    /// Listeners across all message types.
    pub fn total_listener_count(&self) -> usize {
        self.live_topics()
            .iter()
            .map(|topic| topic.lock().len())
            .sum()
    }

    pub fn has_listeners<T: 'static>(&self) -> bool {
        self.listener_count::<T>() > 0
    }

    /// Message types that currently have a topic.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            topics: self.topic_count(),
            listeners: self.total_listener_count(),
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Run `f` on `T`'s topic while holding its lock.
    ///
    /// With `create`, a missing topic is created; otherwise a missing topic
    /// yields `None`. Retired topics are skipped by looking the key up again.
    fn with_live_topic<T, R>(
        &self,
        create: bool,
        f: impl FnOnce(&Arc<Topic>, &mut TopicState) -> R,
    ) -> Option<R>
    where
        T: 'static,
    {
        let key = CapabilityKey::of::<T>();
        loop {
            let topic = if create {
                Arc::clone(
                    self.topics
                        .entry(key)
                        .or_insert_with(|| {
                            Arc::new(Topic::new::<T>(
                                self.scratch_limit,
                                self.scratch_max_capacity,
                            ))
                        })
                        .value(),
                )
            } else {
                Arc::clone(self.topics.get(&key)?.value())
            };

            let mut state = topic.lock();
            if state.is_retired() {
                continue;
            }
            return Some(f(&topic, &mut *state));
        }
    }

    /// Retire `topic` and drop it from the table. Caller holds its lock.
    fn prune(&self, topic: &Arc<Topic>, state: &mut TopicState) -> Box<dyn Subscribers> {
        let evicted = state.retire();
        self.topics
            .remove_if(&topic.key(), |_, current| Arc::ptr_eq(current, topic));
        evicted
    }

    fn snapshot<T: 'static>(&self) -> Option<Snapshot<T>> {
        self.with_live_topic::<T, _>(false, |topic, state| {
            let subs = state.typed::<T>()?;
            if subs.listeners.is_empty() {
                return None;
            }
            let mut listeners = subs.scratch.checkout(subs.listeners.len());
            listeners.extend(subs.listeners.iter().cloned());
            Some(Snapshot {
                topic: Arc::clone(topic),
                listeners,
            })
        })
        .flatten()
    }

    fn live_topics(&self) -> Vec<Arc<Topic>> {
        self.topics
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn idle_scratch_buffers<T: 'static>(&self) -> usize {
        self.with_live_topic::<T, _>(false, |_, state| {
            state.typed::<T>().map(|subs| subs.scratch.idle())
        })
        .flatten()
        .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics.len())
            .field("scratch_limit", &self.scratch_limit)
            .finish_non_exhaustive()
    }
}

/// Listener sequence of one publish, held in a buffer checked out of the
/// topic's scratch pool. Dropping it returns the buffer.
struct Snapshot<T: 'static> {
    topic: Arc<Topic>,
    listeners: Vec<Listener<T>>,
}

impl<T: 'static> Deref for Snapshot<T> {
    type Target = [Listener<T>];

    fn deref(&self) -> &Self::Target {
        &self.listeners
    }
}

impl<T: 'static> Drop for Snapshot<T> {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.listeners);
        // Handles are released before locking: the last handle of a listener
        // unsubscribed mid-dispatch drops its captures here.
        buffer.clear();

        let mut state = self.topic.lock();
        if let Some(subs) = state.typed::<T>() {
            subs.scratch.give_back(buffer);
        }
    }
}
