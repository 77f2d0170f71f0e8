//! Shared buffer pool for scratch memory reuse across sessions.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};

use crossbeam::queue::ArrayQueue;
use log::trace;

use crate::config::{
    CARRY_OVER_BUFFER_SIZE, COMPRESSION_INPUT_BUFFER_SIZE, DECOMPRESSION_BUFFER_SIZE,
};

/// Maximum number of buffers the global pool keeps per class.
pub const MAX_RETAINED_PER_CLASS: usize = 8;

/// Size classes handed out by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferClass {
    /// Holds compressed bytes pulled from a source.
    CompressionInput,
    /// Receives one engine output chunk on the buffered read path.
    DecompressionOutput,
    /// Holds decompressed bytes not yet delivered to the caller.
    CarryOver,
}

impl BufferClass {
    const ALL: [BufferClass; 3] = [
        BufferClass::CompressionInput,
        BufferClass::DecompressionOutput,
        BufferClass::CarryOver,
    ];

    /// Length of a freshly acquired buffer of this class.
    pub const fn nominal_size(self) -> usize {
        match self {
            BufferClass::CompressionInput => COMPRESSION_INPUT_BUFFER_SIZE,
            BufferClass::DecompressionOutput => DECOMPRESSION_BUFFER_SIZE,
            BufferClass::CarryOver => CARRY_OVER_BUFFER_SIZE,
        }
    }

    const fn index(self) -> usize {
        match self {
            BufferClass::CompressionInput => 0,
            BufferClass::DecompressionOutput => 1,
            BufferClass::CarryOver => 2,
        }
    }
}

/// Number of idle buffers retained per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Idle compression-input buffers.
    pub compression_input: usize,
    /// Idle decompression-output buffers.
    pub decompression_output: usize,
    /// Idle carry-over buffers.
    pub carry_over: usize,
}

/// A thread-safe pool of scratch buffers, one bounded queue per class.
///
/// Every [`acquire`](BufferPool::acquire) hands out a buffer no other holder
/// can reach. The buffer comes back when its [`PooledBuffer`] is released or
/// dropped. Reuse is opportunistic and unordered.
pub struct BufferPool {
    queues: [ArrayQueue<Vec<u8>>; 3],
}

impl BufferPool {
    /// Creates a pool that retains up to `max_retained` idle buffers per class
    /// (at least one).
    pub fn new(max_retained: usize) -> Arc<Self> {
        let cap = max_retained.max(1);
        Arc::new(Self {
            queues: [
                ArrayQueue::new(cap),
                ArrayQueue::new(cap),
                ArrayQueue::new(cap),
            ],
        })
    }

    /// Returns the process-wide pool used by default.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<BufferPool>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| BufferPool::new(MAX_RETAINED_PER_CLASS))
            .clone()
    }

    /// Takes a buffer of `class` from the pool, allocating when none is idle.
    ///
    /// The buffer's length is the class's nominal size. Reused buffers are not
    /// zeroed: holders only read back bytes they wrote.
    pub fn acquire(self: &Arc<Self>, class: BufferClass) -> PooledBuffer {
        let data = match self.queues[class.index()].pop() {
            Some(data) => {
                trace!("pool: reusing {:?} buffer ({} bytes)", class, data.len());
                data
            }
            None => {
                trace!("pool: allocating {:?} buffer", class);
                vec![0u8; class.nominal_size()]
            }
        };

        PooledBuffer {
            data,
            class,
            pool: Arc::clone(self),
        }
    }

    /// Returns idle buffer counts per class.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            compression_input: self.queues[BufferClass::CompressionInput.index()].len(),
            decompression_output: self.queues[BufferClass::DecompressionOutput.index()].len(),
            carry_over: self.queues[BufferClass::CarryOver.index()].len(),
        }
    }

    /// Drops every idle buffer.
    pub fn clear(&self) {
        for class in BufferClass::ALL {
            while self.queues[class.index()].pop().is_some() {}
        }
    }

    fn put(&self, class: BufferClass, mut data: Vec<u8>) {
        let nominal = class.nominal_size();
        if data.capacity() > nominal * 2 {
            trace!(
                "pool: freeing oversized {:?} buffer ({} bytes)",
                class,
                data.capacity()
            );
            return;
        }

        data.truncate(nominal);
        if self.queues[class.index()].push(data).is_err() {
            trace!("pool: {:?} queue full, freeing buffer", class);
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Exclusively owned by one session. Dereferences to its bytes and goes back
/// to the pool on [`release`](PooledBuffer::release) or drop.
pub struct PooledBuffer {
    data: Vec<u8>,
    class: BufferClass,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Returns the buffer's size class.
    pub fn class(&self) -> BufferClass {
        self.class
    }

    /// Returns the allocated capacity.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Ensures the buffer is at least `new_len` bytes long.
    ///
    /// Keeps the current allocation when its capacity already suffices and
    /// only reallocates, preserving existing contents, when it does not.
    pub fn grow(&mut self, new_len: usize) {
        if new_len <= self.data.len() {
            return;
        }
        if new_len > self.data.capacity() {
            trace!(
                "pool: growing {:?} buffer {} -> {} bytes",
                self.class,
                self.data.len(),
                new_len
            );
            self.data.reserve_exact(new_len - self.data.len());
        }
        self.data.resize(new_len, 0);
    }

    /// Hands the buffer back to its pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.put(self.class, data);
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("class", &self.class)
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_nominal_size() {
        let pool = BufferPool::new(2);
        for class in BufferClass::ALL {
            let buf = pool.acquire(class);
            assert_eq!(buf.len(), class.nominal_size());
            assert_eq!(buf.class(), class);
        }
        assert!(BufferClass::CarryOver.nominal_size() >= 12 * DECOMPRESSION_BUFFER_SIZE);
    }

    #[test]
    fn test_buffer_reuse() {
        let pool = BufferPool::new(2);
        let buf = pool.acquire(BufferClass::DecompressionOutput);
        let ptr = buf.as_ptr();
        buf.release();
        assert_eq!(pool.stats().decompression_output, 1);

        // The same allocation comes back
        let buf2 = pool.acquire(BufferClass::DecompressionOutput);
        assert_eq!(buf2.as_ptr(), ptr);
        assert_eq!(pool.stats().decompression_output, 0);
    }

    #[test]
    fn test_drop_returns_to_pool() {
        let pool = BufferPool::new(2);
        {
            let _buf = pool.acquire(BufferClass::CompressionInput);
        }
        assert_eq!(pool.stats().compression_input, 1);
    }

    #[test]
    fn test_distinct_buffers_per_acquire() {
        let pool = BufferPool::new(2);
        let a = pool.acquire(BufferClass::CompressionInput);
        let b = pool.acquire(BufferClass::CompressionInput);
        assert_ne!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_grow_keeps_contents() {
        let pool = BufferPool::new(2);
        let mut buf = pool.acquire(BufferClass::DecompressionOutput);
        buf[..5].copy_from_slice(b"hello");
        let nominal = buf.len();

        buf.grow(nominal + 10);
        assert_eq!(buf.len(), nominal + 10);
        assert_eq!(&buf[..5], b"hello");

        // Shrinking requests are ignored
        buf.grow(1);
        assert_eq!(buf.len(), nominal + 10);
    }

    #[test]
    fn test_grow_within_capacity_reuses_allocation() {
        let pool = BufferPool::new(2);
        let mut buf = pool.acquire(BufferClass::DecompressionOutput);
        let nominal = buf.len();
        buf.grow(nominal + nominal / 2);
        buf.release();

        // Retained with its capacity and truncated back to nominal
        let mut buf = pool.acquire(BufferClass::DecompressionOutput);
        assert_eq!(buf.len(), nominal);
        let ptr = buf.as_ptr();
        buf.grow(nominal + nominal / 4);
        assert_eq!(buf.as_ptr(), ptr);
    }

    #[test]
    fn test_oversized_buffer_not_retained() {
        let pool = BufferPool::new(2);
        let mut buf = pool.acquire(BufferClass::DecompressionOutput);
        let nominal = buf.len();
        buf.grow(nominal * 3);
        buf.release();
        assert_eq!(pool.stats().decompression_output, 0);
    }

    #[test]
    fn test_retention_is_bounded() {
        let pool = BufferPool::new(1);
        let a = pool.acquire(BufferClass::CompressionInput);
        let b = pool.acquire(BufferClass::CompressionInput);
        a.release();
        b.release();
        assert_eq!(pool.stats().compression_input, 1);

        pool.clear();
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = BufferPool::new(4);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..16 {
                        let mut buf = pool.acquire(BufferClass::CompressionInput);
                        buf[0] = i as u8;
                        buf[1] = i as u8;
                        assert_eq!(buf[0], buf[1]);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.stats().compression_input <= 4);
    }
}
