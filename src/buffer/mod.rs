//! Scratch buffer management.
//!
//! Sessions borrow their scratch buffers from a shared [`BufferPool`] instead
//! of allocating per call. A [`PooledBuffer`] is owned by exactly one session
//! and returns to the pool when released or dropped.

mod pool;

pub use pool::{BufferClass, BufferPool, MAX_RETAINED_PER_CLASS, PoolStats, PooledBuffer};
