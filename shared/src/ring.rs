//! # Record Ring
//!
//! Fixed-capacity FIFO of [`SampleRecord`]s. Storage is an inline array sized
//! at compile time, so the ring never allocates and never grows.
//!
//! ## Memory Layout
//!
//! ```text
//! ┌──────────┬────────────────────────┬────────────────────┐
//! │  free    │   occupied (FIFO)      │       free         │
//! └──────────┴────────────────────────┴────────────────────┘
//!            ▲                        ▲
//!          head                  head + len
//! ```
//!
//! `head` is the slot of the oldest record and always stays below the
//! capacity; the next free slot is `(head + len) % C`. Keeping an explicit
//! length means no slot is sacrificed to tell full from empty, and any
//! capacity works, not only powers of two.
//!
//! The ring itself is not synchronised. The host service wraps it in a mutex
//! and adds the blocking push/pop discipline on top.

use crate::record::SampleRecord;

/// Errors specific to ring operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingError {
    /// Every slot is occupied
    Full,
    /// No record is available
    Empty,
}

/// Fixed-capacity ring of sample records
///
/// # Example
///
/// ```rust
/// use sensor_link_shared::{RecordRing, SampleRecord};
///
/// let mut ring: RecordRing<4> = RecordRing::new();
/// let record = SampleRecord::new([1u8; 100]);
///
/// ring.try_push(record).unwrap();
/// assert_eq!(ring.try_pop(), Ok(record));
/// assert!(ring.is_empty());
/// ```
pub struct RecordRing<const C: usize> {
    /// Slot storage
    slots: [SampleRecord; C],

    /// Slot of the oldest record, always below `C`
    head: usize,

    /// Number of occupied slots
    len: usize,
}

impl<const C: usize> RecordRing<C> {
    const NON_ZERO: () = assert!(C > 0, "ring capacity must be non-zero");

    /// Create an empty ring
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            slots: [SampleRecord::EMPTY; C],
            head: 0,
            len: 0,
        }
    }

    /// Total number of slots
    #[inline]
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Number of occupied slots
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the ring is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the ring is full
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == C
    }

    /// Insert a record at the tail
    ///
    /// The record is copied into its slot. Fails without touching the ring
    /// when every slot is occupied.
    pub fn try_push(&mut self, record: SampleRecord) -> Result<(), RingError> {
        if self.is_full() {
            return Err(RingError::Full);
        }

        self.slots[(self.head + self.len) % C] = record;
        self.len += 1;
        Ok(())
    }

    /// Remove and return the record at the head
    pub fn try_pop(&mut self) -> Result<SampleRecord, RingError> {
        if self.is_empty() {
            return Err(RingError::Empty);
        }

        let record = self.slots[self.head];
        self.head = (self.head + 1) % C;
        self.len -= 1;
        Ok(record)
    }
}

impl<const C: usize> Default for RecordRing<C> {
    fn default() -> Self {
        Self::new()
    }
}
