//! Scoped reuse of short-lived byte buffers
//!
//! Serialization on the delivery path produces one message per event. The
//! pool lends out cleared `Vec<u8>` scratch buffers so their capacity
//! survives across events. Buffers never leave the pool's ownership: callers
//! copy what they need out of the guard before it drops.

use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

/// Default capacity of a freshly allocated buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 512;

/// Buffers larger than this are not returned to the pool
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// A bounded pool of byte buffers
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_idle: usize,
    initial_capacity: usize,
}

impl BufferPool {
    /// Create a pool keeping at most `max_idle` idle buffers
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            initial_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Borrow an empty buffer
    pub fn get(&self) -> PooledBuffer<'_> {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.initial_capacity));
        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn put(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(8)
    }
}

/// A buffer on loan from a [`BufferPool`]; returned (cleared) on drop
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
}

impl PooledBuffer<'_> {
    /// Copy the contents out into an exact-size vector
    pub fn to_message(&self) -> Vec<u8> {
        self.deref().to_vec()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        // Only taken in Drop.
        self.buf.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}
