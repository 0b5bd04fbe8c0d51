//! Buffer pool for packet encryption and decryption
//!
//! Every send and receive needs a scratch buffer as large as the biggest
//! datagram. Buffers are leased from a [`BufferPool`] and go back to it when
//! the [`BufferLease`] is dropped, so the steady state allocates nothing.
//!
//! ```rust
//! use shadowsocks_udp::BufferPool;
//!
//! let pool = BufferPool::new();
//!
//! let mut buf = pool.lease();
//! buf[..5].copy_from_slice(b"hello");
//! drop(buf);
//!
//! // this one reuses the memory of the previous lease
//! let _buf = pool.lease();
//! assert_eq!(pool.idle(), 0);
//! ```

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use parking_lot::Mutex;

use crate::MAX_PACKET_SIZE;

/// Idle buffers kept by default, more are freed on release
const DEFAULT_MAX_IDLE: usize = 64;

pub struct BufferPool {
    buffers: Mutex<Vec<Box<[u8]>>>,
    buffer_size: usize,
    max_idle: usize,
}

impl BufferPool {
    /// A pool of [`MAX_PACKET_SIZE`] buffers
    pub fn new() -> Self {
        Self::with_capacity(MAX_PACKET_SIZE, DEFAULT_MAX_IDLE)
    }

    /// A pool of `buffer_size` buffers, keeping at most `max_idle` of them
    /// when they are not leased.
    pub fn with_capacity(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(max_idle)),
            buffer_size,
            max_idle,
        }
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Take a buffer out of the pool, allocating one if the pool is empty.
    ///
    /// The content of the buffer is whatever the previous lease left.
    pub fn lease(&self) -> BufferLease<'_> {
        let buf = match self.buffers.lock().pop() {
            Some(buf) => buf,
            None => vec![0u8; self.buffer_size].into_boxed_slice(),
        };

        BufferLease { pool: self, buf }
    }

    /// Number of buffers waiting in the pool
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    fn put(&self, buf: Box<[u8]>) {
        let mut buffers = self.buffers.lock();
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_size", &self.buffer_size)
            .field("max_idle", &self.max_idle)
            .field("idle", &self.idle())
            .finish()
    }
}

/// Exclusive loan of a pooled buffer, returned to the pool on drop.
pub struct BufferLease<'a> {
    pool: &'a BufferPool,
    buf: Box<[u8]>,
}

impl BufferLease<'_> {
    /// Give the buffer back, same as dropping the lease
    #[inline]
    pub fn release(self) {}
}

impl Deref for BufferLease<'_> {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for BufferLease<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for BufferLease<'_> {
    fn drop(&mut self) {
        let buf = mem::take(&mut self.buf);
        self.pool.put(buf);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn lease_and_release() {
        let pool = BufferPool::new();
        assert_eq!(pool.idle(), 0);

        let buf = pool.lease();
        assert_eq!(buf.len(), MAX_PACKET_SIZE);
        let ptr = buf.as_ptr();
        buf.release();
        assert_eq!(pool.idle(), 1);

        // reused
        let buf = pool.lease();
        assert_eq!(buf.as_ptr(), ptr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn outstanding_leases_do_not_alias() {
        let pool = BufferPool::with_capacity(64, 8);

        let leases = (0..8).map(|_| pool.lease()).collect::<Vec<_>>();
        let ptrs = leases.iter().map(|l| l.as_ptr()).collect::<HashSet<_>>();
        assert_eq!(ptrs.len(), 8);

        drop(leases);
        assert_eq!(pool.idle(), 8);
    }

    #[test]
    fn max_idle() {
        let pool = BufferPool::with_capacity(16, 2);

        let leases = (0..5).map(|_| pool.lease()).collect::<Vec<_>>();
        drop(leases);

        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn concurrent_canary() {
        let threads = 8;
        let iterations = 1000;
        let pool = Arc::new(BufferPool::with_capacity(256, 4));
        let barrier = Arc::new(Barrier::new(threads));

        let handles = (0..threads)
            .map(|id| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);

                thread::spawn(move || {
                    barrier.wait();

                    for i in 0..iterations {
                        let canary = (id * iterations + i) as u32;

                        let mut buf = pool.lease();
                        for chunk in buf.chunks_exact_mut(4) {
                            chunk.copy_from_slice(&canary.to_le_bytes());
                        }

                        thread::yield_now();

                        // another lease writing the same memory would break the canary
                        for chunk in buf.chunks_exact(4) {
                            assert_eq!(chunk, &canary.to_le_bytes()[..]);
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.idle() <= 4);
    }
}
