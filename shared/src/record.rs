//! # Sample Records
//!
//! A record is one window of [`SAMPLE_WINDOW`] sensor samples, one byte each.
//! Records are `Copy` so the queue holds its own copy and the producer keeps
//! no alias into a slot after pushing.
//!
//! ## Record Layout
//!
//! ```text
//! ┌───────────┬──────┬──────┬─────┬──────────┐
//! │  counter  │  1   │  2   │ ... │    99    │
//! │  1 byte   │      │      │     │          │
//! └───────────┴──────┴──────┴─────┴──────────┘
//! ```
//!
//! The layout above is the one produced by [`CounterSource`], a placeholder
//! for a real sensor driver. Anything implementing [`SampleSource`] can take
//! its place.

use crate::SAMPLE_WINDOW;

/// One fixed-size window of sensor samples
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRecord {
    data: [u8; SAMPLE_WINDOW],
}

impl SampleRecord {
    /// All-zero record, used to initialise ring storage
    pub const EMPTY: Self = Self {
        data: [0u8; SAMPLE_WINDOW],
    };

    /// Create a record from a full window of samples
    pub const fn new(data: [u8; SAMPLE_WINDOW]) -> Self {
        Self { data }
    }

    /// Raw bytes as sent to the peer
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Record length in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        SAMPLE_WINDOW
    }

    /// Always false, a record is never empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl core::fmt::Debug for SampleRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SampleRecord")
            .field("head", &self.data[0])
            .field("len", &SAMPLE_WINDOW)
            .finish()
    }
}

/// Capability to produce the next record
///
/// Called once per sampling window by the sampler task. Implementations may
/// take as long as the hardware needs; the caller paces the cadence.
pub trait SampleSource {
    /// Produce the next window of samples
    fn produce(&mut self) -> SampleRecord;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn produce(&mut self) -> SampleRecord {
        (**self).produce()
    }
}

/// Synthetic generator standing in for a sensor driver
///
/// The first byte of every record is a wrapping session counter, the rest
/// hold their own index.
#[derive(Debug, Default, Clone)]
pub struct CounterSource {
    counter: u8,
}

impl CounterSource {
    /// Create a generator starting at counter 0
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Counter value the next record will carry
    pub const fn next_counter(&self) -> u8 {
        self.counter
    }
}

impl SampleSource for CounterSource {
    fn produce(&mut self) -> SampleRecord {
        let mut data = [0u8; SAMPLE_WINDOW];
        data[0] = self.counter;
        for (i, byte) in data.iter_mut().enumerate().skip(1) {
            *byte = i as u8;
        }
        self.counter = self.counter.wrapping_add(1);
        SampleRecord::new(data)
    }
}
