//! Per-topic pool of reusable snapshot buffers.
//!
//! Publish copies the listener sequence into a buffer checked out of the
//! topic's pool, so sustained publishing of one message type reuses a small
//! set of allocations instead of allocating a fresh `Vec` per call.

pub(crate) struct ScratchPool<E> {
    free: Vec<Vec<E>>,
    limit: usize,
    max_capacity: usize,
}

impl<E> ScratchPool<E> {
    pub(crate) fn new(limit: usize, max_capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            limit,
            max_capacity,
        }
    }

    /// Take an empty buffer able to hold at least `len` elements.
    pub(crate) fn checkout(&mut self, len: usize) -> Vec<E> {
        match self.free.pop() {
            Some(mut buffer) => {
                buffer.reserve(len);
                buffer
            }
            None => Vec::with_capacity(len),
        }
    }

    /// Return a buffer to the pool.
    ///
    /// The buffer must already be empty; its elements may run arbitrary drop
    /// code and are cleared by the caller before the topic lock is taken.
    pub(crate) fn give_back(&mut self, buffer: Vec<E>) {
        debug_assert!(buffer.is_empty());
        if self.free.len() < self.limit && buffer.capacity() <= self.max_capacity {
            self.free.push(buffer);
        }
    }

    /// Buffers currently idle in the pool.
    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }
}
