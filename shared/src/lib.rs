//! # Shared Link Core
//!
//! This crate provides the core abstractions for the sensor link peripheral:
//!
//! - **Sample Records**: Fixed-size windows of sensor samples and the
//!   `SampleSource` capability that produces them
//! - **Record Ring**: Fixed-capacity FIFO storage for records in flight
//! - **Link Types**: PHY, data length, connection parameters, subscription
//! - **Link Session**: Synchronous state machine for connection lifecycle and
//!   post-connect parameter negotiation
//!
//! ## Architecture
//!
//! ```text
//! SampleSource ─────► RecordRing ─────► Notifier ─────► peer
//!                                          │
//!                                    LinkSession ◄───── transport events
//! ```
//!
//! Nothing in this crate blocks, allocates or logs. Transitions return a
//! [`session::Reaction`] and the caller performs the side effect.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod config_write;
pub mod link;
pub mod record;
pub mod ring;
pub mod session;

// Re-export main types for convenience
pub use config_write::{ConfigWriteError, ConfigurationMessage};
pub use link::{
    AdvertisingParams, ConnHandle, ConnParams, DataLength, LinkParams, Phy, PhyUpdate, StatusCode,
    Subscription,
};
pub use record::{CounterSource, SampleRecord, SampleSource};
pub use ring::{RecordRing, RingError};
pub use session::{
    LinkEvent, LinkSession, LinkState, NegotiationFailure, NegotiationStep, NegotiationTicket,
    Reaction, SessionError, SessionSnapshot, Violation,
};

/// Library version for peer compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of samples collected into one record
pub const SAMPLE_WINDOW: usize = 100;

/// Interval between two samples of a window, in milliseconds
pub const SAMPLE_INTERVAL_MS: u64 = 10;

/// Records buffered between the sampler and the notifier
pub const QUEUE_CAPACITY: usize = 8;

/// Pause after every delivery attempt, in milliseconds
pub const NOTIFY_COOLDOWN_MS: u64 = 5000;

/// Delay between the PHY request and the data length request, in milliseconds.
/// Issuing both back to back collides link layer control procedures.
pub const SETTLE_DELAY_MS: u64 = 1000;

/// ATT header bytes taken from every MTU-sized PDU
pub const ATT_HEADER_OVERHEAD: u16 = 3;

/// Largest configuration write accepted from the peer
pub const CONFIG_WRITE_MAX: usize = 512;
