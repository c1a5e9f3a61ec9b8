//! # Intake Buffer
//!
//! Bounded byte buffer between the serial receive path (producer) and the
//! periodic control loop (consumer).
//!
//! The handoff is double-buffered: the producer appends to the live buffer,
//! the consumer swaps an empty spare in for it once per tick and parses the
//! snapshot it got back. Both sides touch the live buffer only inside a short
//! critical section, so the write cursor is never read mid-update.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

/// Fixed-capacity byte buffer with a write cursor
///
/// Storage is allocated once at construction. When a byte arrives while the
/// buffer is full, everything collected so far is dropped (cursor back to 0)
/// and the new byte is kept, favouring fresh data over a stale backlog.
#[derive(Debug, Clone)]
pub struct IntakeBuffer {
    bytes: Box<[u8]>,
    len: usize,
    overflows: u64,
}

impl IntakeBuffer {
    /// Create a buffer holding up to `capacity` bytes (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity.max(1)].into_boxed_slice(),
            len: 0,
            overflows: 0,
        }
    }

    /// Append one byte, resetting first if the buffer is full
    ///
    /// Returns `false` when the append overflowed and earlier bytes were dropped.
    pub fn push(&mut self, byte: u8) -> bool {
        let mut kept = true;
        if self.len == self.bytes.len() {
            self.len = 0;
            self.overflows += 1;
            kept = false;
        }

        self.bytes[self.len] = byte;
        self.len += 1;
        kept
    }

    /// Append a run of bytes
    ///
    /// Returns the number of overflow resets this caused.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&byte| !self.push(byte)).count()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Logical truncation: the cursor goes back to 0, contents are not erased
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Overflow resets since construction
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

/// Create a connected producer/consumer pair over buffers of `capacity` bytes
///
/// # Examples
///
/// ```
/// use crsf_rx::intake::intake_channel;
///
/// let (producer, mut consumer) = intake_channel(64);
/// producer.extend(&[0xC8, 0x18]);
///
/// assert_eq!(consumer.take().bytes, &[0xC8, 0x18]);
/// assert!(consumer.take().bytes.is_empty());
/// ```
pub fn intake_channel(capacity: usize) -> (IntakeProducer, IntakeConsumer) {
    let shared = Arc::new(Mutex::new(IntakeBuffer::with_capacity(capacity)));

    let producer = IntakeProducer {
        shared: Arc::clone(&shared),
    };
    let consumer = IntakeConsumer {
        shared,
        spare: IntakeBuffer::with_capacity(capacity),
        overflows_seen: 0,
    };

    (producer, consumer)
}

fn lock(shared: &Mutex<IntakeBuffer>) -> MutexGuard<'_, IntakeBuffer> {
    // Neither side can leave the buffer inconsistent mid-update, so a
    // poisoned lock still guards valid data
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Receive-side handle: appends bytes as they arrive
#[derive(Debug, Clone)]
pub struct IntakeProducer {
    shared: Arc<Mutex<IntakeBuffer>>,
}

impl IntakeProducer {
    /// Append everything the serial peripheral just delivered
    ///
    /// Non-blocking apart from the brief critical section, never allocates.
    pub fn extend(&self, bytes: &[u8]) -> usize {
        lock(&self.shared).extend(bytes)
    }
}

/// One tick's worth of received bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeSnapshot<'a> {
    pub bytes: &'a [u8],

    /// Overflow resets since the previous snapshot. When non-zero the
    /// stream is discontinuous: `bytes` does not follow on from what the
    /// last snapshot ended with.
    pub dropped: u64,
}

/// Tick-side handle: takes a snapshot of everything received since the last tick
#[derive(Debug)]
pub struct IntakeConsumer {
    shared: Arc<Mutex<IntakeBuffer>>,
    spare: IntakeBuffer,
    overflows_seen: u64,
}

impl IntakeConsumer {
    /// Swap the live buffer out and return its contents
    ///
    /// The producer continues into the emptied spare straight away; bytes
    /// returned here are never handed out again.
    pub fn take(&mut self) -> IntakeSnapshot<'_> {
        self.spare.clear();
        {
            let mut live = lock(&self.shared);
            std::mem::swap(&mut *live, &mut self.spare);
        }

        // Overflow counts travel with each buffer, so track the sum of both
        let overflows = self.spare.overflows() + lock(&self.shared).overflows();
        let dropped = overflows - self.overflows_seen;
        if dropped > 0 {
            warn!(
                "Intake buffer overflowed {} time(s), partial frames dropped",
                dropped
            );
            self.overflows_seen = overflows;
        }

        IntakeSnapshot {
            bytes: self.spare.as_slice(),
            dropped,
        }
    }

    pub fn capacity(&self) -> usize {
        self.spare.capacity()
    }

    /// Total overflow resets seen so far
    pub fn overflows(&self) -> u64 {
        self.overflows_seen
    }
}
