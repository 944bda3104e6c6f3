//! Reusable receive buffers.
//!
//! The dispatcher reads every datagram into a [`PacketBuffer`] drawn from a
//! shared [`BufferPool`], so a busy server does not allocate per packet.
//! A buffer is exclusively owned by whoever holds it (the pool while idle,
//! the dispatcher during the read, a worker during processing) and moves
//! between owners by value.
//!
//! Every receive cycle releases its buffer exactly once, on every path:
//! validation drop, queue-full drop, handler failure, or a sent reply.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Largest datagram the engine will receive.
///
/// 1500 bytes covers a full Ethernet frame payload; DHCP packets are
/// required to fit in 576 bytes but some clients send more.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// A fixed-capacity receive buffer with an explicit valid length.
///
/// Reuse does not zero the contents; only the first [`len`](Self::len)
/// bytes are ever meaningful.
pub struct PacketBuffer {
    data: Box<[u8; MAX_DATAGRAM_SIZE]>,
    len: usize,
}

impl PacketBuffer {
    fn new() -> Self {
        Self {
            data: Box::new([0u8; MAX_DATAGRAM_SIZE]),
            len: 0,
        }
    }

    /// The valid bytes of the most recent datagram.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The full capacity, for the socket to read into.
    pub fn recv_slice(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }

    /// Records how many bytes the last read produced.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(MAX_DATAGRAM_SIZE);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A concurrency-safe pool of [`PacketBuffer`]s.
///
/// [`acquire`](Self::acquire) never blocks and never fails: if the pool is
/// empty it allocates a fresh buffer. The pool is an explicit value passed
/// to the components that need it, so tests can inject a tiny pool to force
/// reuse.
pub struct BufferPool {
    idle: Mutex<Vec<PacketBuffer>>,
    outstanding: AtomicUsize,
}

impl BufferPool {
    /// Creates a pool with `prewarm` buffers allocated up front.
    pub fn new(prewarm: usize) -> Self {
        let idle = (0..prewarm).map(|_| PacketBuffer::new()).collect();
        Self {
            idle: Mutex::new(idle),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Takes a buffer from the pool, allocating if none is idle.
    pub fn acquire(&self) -> PacketBuffer {
        self.outstanding.fetch_add(1, Ordering::Relaxed);
        let recycled = self
            .idle
            .lock()
            .expect("buffer pool lock poisoned")
            .pop();
        recycled.unwrap_or_else(PacketBuffer::new)
    }

    /// Returns a buffer for reuse. Must be called exactly once per
    /// [`acquire`](Self::acquire).
    pub fn release(&self, mut buffer: PacketBuffer) {
        buffer.len = 0;
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        self.idle
            .lock()
            .expect("buffer pool lock poisoned")
            .push(buffer);
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().expect("buffer pool lock poisoned").len()
    }

    /// Number of buffers acquired but not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }
}
