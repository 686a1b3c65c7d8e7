//! Scratch buffer pool for allocation-free encode/decode paths.
//!
//! Provides two free-lists of reusable byte storage:
//! - `BytesMut` buffers, handed out empty with their previous capacity kept
//! - `Vec<u8>` byte slices, manufactured with a 32 KiB default capacity
//!
//! # Design
//!
//! Each free-list is a bounded lock-free queue (`crossbeam::queue::ArrayQueue`):
//! - Acquire never blocks; an empty free-list manufactures a fresh value
//! - Every acquired value is cleared, so no borrower sees a previous borrower's bytes
//! - Release drops the value when the free-list is full or the value grew past
//!   `max_retained_capacity`, so idle memory stays bounded
//!
//! # Usage
//!
//! ```
//! use payload_codec::pool::BufferPool;
//!
//! let pool = BufferPool::global();
//!
//! // Scoped: returned to the pool when the guard drops.
//! let mut scratch = pool.bytes();
//! scratch.extend_from_slice(b"hello");
//! assert_eq!(&scratch[..], b"hello");
//! drop(scratch);
//!
//! // Explicit acquire/release.
//! let buf = pool.acquire_buffer();
//! assert!(buf.is_empty());
//! pool.release_buffer(buf);
//! ```

mod config;

pub use config::{
    PoolConfig, DEFAULT_BYTES_CAPACITY, DEFAULT_MAX_IDLE, DEFAULT_MAX_RETAINED_CAPACITY,
};

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

/// Storage that can live in a [`BufferPool`] free-list.
pub trait Reusable: Default + Send + 'static {
    /// Create a new value for an empty free-list.
    fn manufacture(initial_capacity: usize) -> Self;

    /// Make the value logically empty, keeping its allocation.
    fn reset(&mut self);

    /// Bytes currently allocated by the value.
    fn retained_capacity(&self) -> usize;
}

impl Reusable for BytesMut {
    fn manufacture(initial_capacity: usize) -> Self {
        BytesMut::with_capacity(initial_capacity)
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn retained_capacity(&self) -> usize {
        self.capacity()
    }
}

impl Reusable for Vec<u8> {
    fn manufacture(initial_capacity: usize) -> Self {
        Vec::with_capacity(initial_capacity)
    }

    fn reset(&mut self) {
        self.clear();
    }

    fn retained_capacity(&self) -> usize {
        self.capacity()
    }
}

/// One bounded free-list plus its counters.
struct FreeList<T> {
    idle: ArrayQueue<T>,
    retain: bool,
    initial_capacity: usize,
    max_retained_capacity: usize,
    created: AtomicUsize,
    reused: AtomicUsize,
    discarded: AtomicUsize,
}

impl<T: Reusable> FreeList<T> {
    fn new(max_idle: usize, initial_capacity: usize, max_retained_capacity: usize) -> Self {
        Self {
            // ArrayQueue rejects a zero capacity; `retain` handles max_idle == 0.
            idle: ArrayQueue::new(max_idle.max(1)),
            retain: max_idle > 0,
            initial_capacity,
            max_retained_capacity,
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) -> T {
        match self.idle.pop() {
            Some(mut value) => {
                value.reset();
                self.reused.fetch_add(1, Ordering::Relaxed);
                value
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(capacity = self.initial_capacity, "pool manufactured value");
                T::manufacture(self.initial_capacity)
            }
        }
    }

    fn release(&self, value: T) {
        if !self.retain || value.retained_capacity() > self.max_retained_capacity {
            self.discard(value.retained_capacity());
            return;
        }
        if let Err(value) = self.idle.push(value) {
            self.discard(value.retained_capacity());
        }
    }

    fn discard(&self, capacity: usize) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(capacity, "pool discarded value");
    }
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle `BytesMut` buffers.
    pub idle_buffers: usize,
    /// Idle `Vec<u8>` byte slices.
    pub idle_bytes: usize,
    /// Values manufactured because a free-list was empty.
    pub created: usize,
    /// Values handed out from a free-list.
    pub reused: usize,
    /// Values dropped on release instead of being retained.
    pub discarded: usize,
}

/// Pool of reusable byte buffers and byte slices.
///
/// Safe for concurrent acquire/release from any number of threads.
pub struct BufferPool {
    config: PoolConfig,
    buffers: FreeList<BytesMut>,
    bytes: FreeList<Vec<u8>>,
}

static GLOBAL: OnceLock<BufferPool> = OnceLock::new();

impl BufferPool {
    /// Create a pool with the given configuration.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            buffers: FreeList::new(config.max_idle, 0, config.max_retained_capacity),
            bytes: FreeList::new(
                config.max_idle,
                config.bytes_capacity,
                config.max_retained_capacity,
            ),
            config,
        }
    }

    /// Process-wide pool, created with [`PoolConfig::default`] on first use.
    pub fn global() -> &'static BufferPool {
        GLOBAL.get_or_init(|| BufferPool::new(PoolConfig::default()))
    }

    /// Pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Take an empty buffer out of the pool.
    #[inline]
    pub fn acquire_buffer(&self) -> BytesMut {
        self.buffers.acquire()
    }

    /// Return a buffer to the pool.
    #[inline]
    pub fn release_buffer(&self, buf: BytesMut) {
        self.buffers.release(buf);
    }

    /// Take an empty byte slice out of the pool.
    #[inline]
    pub fn acquire_bytes(&self) -> Vec<u8> {
        self.bytes.acquire()
    }

    /// Return a byte slice to the pool.
    #[inline]
    pub fn release_bytes(&self, bytes: Vec<u8>) {
        self.bytes.release(bytes);
    }

    /// Acquire a buffer that goes back to the pool when dropped.
    pub fn buffer(&self) -> Pooled<'_, BytesMut> {
        Pooled::new(self.acquire_buffer(), &self.buffers)
    }

    /// Acquire a byte slice that goes back to the pool when dropped.
    pub fn bytes(&self) -> Pooled<'_, Vec<u8>> {
        Pooled::new(self.acquire_bytes(), &self.bytes)
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle_buffers: self.buffers.idle.len(),
            idle_bytes: self.bytes.idle.len(),
            created: self.buffers.created.load(Ordering::Relaxed)
                + self.bytes.created.load(Ordering::Relaxed),
            reused: self.buffers.reused.load(Ordering::Relaxed)
                + self.bytes.reused.load(Ordering::Relaxed),
            discarded: self.buffers.discarded.load(Ordering::Relaxed)
                + self.bytes.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// A pooled value checked out of a [`BufferPool`].
///
/// Dereferences to the value; returns it to its free-list on drop.
pub struct Pooled<'p, T: Reusable> {
    value: T,
    home: Option<&'p FreeList<T>>,
}

impl<'p, T: Reusable> Pooled<'p, T> {
    fn new(value: T, home: &'p FreeList<T>) -> Self {
        Self {
            value,
            home: Some(home),
        }
    }

    /// Keep the value; it will not be returned to the pool.
    pub fn detach(mut self) -> T {
        self.home = None;
        std::mem::take(&mut self.value)
    }
}

impl<T: Reusable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Reusable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(home) = self.home.take() {
            home.release(std::mem::take(&mut self.value));
        }
    }
}

impl<T: Reusable + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    #[test]
    fn test_acquire_bytes_default_capacity() {
        let pool = BufferPool::default();
        let bytes = pool.acquire_bytes();
        assert!(bytes.is_empty());
        assert!(bytes.capacity() >= DEFAULT_BYTES_CAPACITY);
    }

    #[test]
    fn test_acquire_manufactures_when_empty() {
        let pool = BufferPool::default();
        let _a = pool.acquire_buffer();
        let _b = pool.acquire_buffer();
        assert_eq!(pool.stats().created, 2);
        assert_eq!(pool.stats().reused, 0);
    }

    #[test]
    fn test_release_then_acquire_reuses() {
        let pool = BufferPool::default();

        let mut buf = pool.acquire_buffer();
        buf.put_slice(b"previous borrower");
        let ptr = buf.as_ptr();
        pool.release_buffer(buf);
        assert_eq!(pool.stats().idle_buffers, 1);

        let buf = pool.acquire_buffer();
        assert_eq!(buf.as_ptr(), ptr);
        assert!(buf.is_empty(), "acquired buffer must not expose stale data");
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_bytes_never_stale() {
        let pool = BufferPool::default();

        for round in 0..10u8 {
            let mut bytes = pool.acquire_bytes();
            assert!(bytes.is_empty());
            bytes.extend_from_slice(&[round; 64]);
            pool.release_bytes(bytes);
        }

        assert_eq!(pool.stats().created, 1);
        assert_eq!(pool.stats().reused, 9);
    }

    #[test]
    fn test_guard_returns_on_drop() {
        let pool = BufferPool::default();
        {
            let mut guard = pool.bytes();
            guard.extend_from_slice(b"scoped");
            assert_eq!(&guard[..], b"scoped");
        }
        assert_eq!(pool.stats().idle_bytes, 1);

        let guard = pool.bytes();
        assert!(guard.is_empty());
    }

    #[test]
    fn test_guard_detach_keeps_value() {
        let pool = BufferPool::default();
        let mut guard = pool.buffer();
        guard.put_slice(b"kept");
        let owned = guard.detach();

        assert_eq!(&owned[..], b"kept");
        assert_eq!(pool.stats().idle_buffers, 0);
    }

    #[test]
    fn test_idle_list_is_bounded() {
        let pool = BufferPool::new(PoolConfig::default().max_idle(2));
        let values: Vec<_> = (0..5).map(|_| pool.acquire_bytes()).collect();
        for v in values {
            pool.release_bytes(v);
        }

        let stats = pool.stats();
        assert_eq!(stats.idle_bytes, 2);
        assert_eq!(stats.discarded, 3);
    }

    #[test]
    fn test_oversized_values_are_dropped() {
        let pool = BufferPool::new(PoolConfig::default().max_retained_capacity(1024));
        let mut bytes = pool.acquire_bytes();
        bytes.reserve(4096);
        pool.release_bytes(bytes);

        assert_eq!(pool.stats().idle_bytes, 0);
        assert_eq!(pool.stats().discarded, 1);
    }

    #[test]
    fn test_zero_max_idle_disables_reuse() {
        let pool = BufferPool::new(PoolConfig::default().max_idle(0));
        let buf = pool.acquire_buffer();
        pool.release_buffer(buf);
        let _buf = pool.acquire_buffer();

        assert_eq!(pool.stats().created, 2);
        assert_eq!(pool.stats().reused, 0);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = BufferPool::new(PoolConfig::default().bytes_capacity(64));

        std::thread::scope(|s| {
            for t in 0..8u8 {
                let pool = &pool;
                s.spawn(move || {
                    for _ in 0..200 {
                        let mut guard = pool.bytes();
                        assert!(guard.is_empty());
                        guard.extend_from_slice(&[t; 32]);
                        assert!(guard.iter().all(|&b| b == t));
                    }
                });
            }
        });

        let stats = pool.stats();
        assert_eq!(stats.created + stats.reused, 8 * 200);
        assert!(stats.idle_bytes <= DEFAULT_MAX_IDLE);
    }

    #[test]
    fn test_global_is_singleton() {
        let a = BufferPool::global() as *const BufferPool;
        let b = BufferPool::global() as *const BufferPool;
        assert_eq!(a, b);
        assert_eq!(BufferPool::global().config(), &PoolConfig::default());
    }
}
