//! # Link Parameter Types
//!
//! Value types describing the wireless link: connection handle, PHY, data
//! length, connection parameters, descriptor subscription and the advertising
//! set. Encodings follow the HCI and ATT wire values so transports can
//! convert without lookup tables.
//!
//! ## GATT Layout
//!
//! ```text
//! Sensor Link Service (SERVICE_UUID)
//! ├── Sensor Data (SENSOR_DATA_UUID)   [Notify]  + client configuration descriptor
//! └── Configuration (CONFIG_RX_UUID)   [Write, Write Without Response]
//! ```

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::ATT_HEADER_OVERHEAD;

/// Sensor link primary service
pub const SERVICE_UUID: u128 = 0x69e5204b_8445_5fca_b332_c13064b9dea2;

/// Sensor data characteristic, notify only
pub const SENSOR_DATA_UUID: u128 = 0x5e85012d_7ea8_4008_b432_b46096c049ba;

/// Configuration characteristic, written by the peer
pub const CONFIG_RX_UUID: u128 = 0xde70cf61_d8ee_4faf_956b_afb01c17d0be;

/// ATT MTU every connection starts with
pub const DEFAULT_MTU: u16 = 23;

/// Opaque connection identity assigned by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// Failure code reported by the transport for a request or completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusCode(pub u8);

impl core::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Physical layer modulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Phy {
    /// 1 Mbps symbol rate
    #[default]
    OneM = 0x01,
    /// 2 Mbps symbol rate
    TwoM = 0x02,
    /// Coded long range
    Coded = 0x03,
}

impl TryFrom<u8> for Phy {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::OneM),
            0x02 => Ok(Self::TwoM),
            0x03 => Ok(Self::Coded),
            _ => Err(()),
        }
    }
}

impl Phy {
    /// Short label used in diagnostics
    pub const fn label(self) -> &'static str {
        match self {
            Phy::OneM => "1M",
            Phy::TwoM => "2M",
            Phy::Coded => "Long Range",
        }
    }
}

/// PHY pair in use after an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhyUpdate {
    /// Transmit PHY
    pub tx: Phy,
    /// Receive PHY
    pub rx: Phy,
}

impl PhyUpdate {
    /// Highest symbol rate in both directions
    pub const PREFERRED: Self = Self {
        tx: Phy::TwoM,
        rx: Phy::TwoM,
    };
}

/// Link layer data length, lengths in bytes and times in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataLength {
    /// Maximum transmit payload
    pub tx_len: u16,
    /// Maximum transmit time
    pub tx_time: u16,
    /// Maximum receive payload
    pub rx_len: u16,
    /// Maximum receive time
    pub rx_time: u16,
}

impl DataLength {
    /// Values every connection starts with
    pub const MINIMUM: Self = Self {
        tx_len: 27,
        tx_time: 328,
        rx_len: 27,
        rx_time: 328,
    };

    /// Values requested after connecting
    pub const MAXIMUM: Self = Self {
        tx_len: 251,
        tx_time: 2120,
        rx_len: 251,
        rx_time: 2120,
    };
}

impl Default for DataLength {
    fn default() -> Self {
        Self::MINIMUM
    }
}

/// Connection parameters in link layer units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    /// Connection interval, units of 1.25 ms
    pub interval: u16,
    /// Peripheral latency, in connection events
    pub latency: u16,
    /// Supervision timeout, units of 10 ms
    pub timeout: u16,
}

impl ConnParams {
    /// Connection interval in milliseconds
    pub fn interval_ms(&self) -> f32 {
        self.interval as f32 * 1.25
    }

    /// Supervision timeout in milliseconds
    pub fn supervision_timeout_ms(&self) -> u32 {
        self.timeout as u32 * 10
    }
}

/// Parameters negotiated for the current connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkParams {
    /// PHY in use
    pub phy: PhyUpdate,
    /// ATT MTU
    pub mtu: u16,
    /// Link layer data length
    pub data_length: DataLength,
}

impl LinkParams {
    /// Values every connection starts with
    pub const DEFAULT: Self = Self {
        phy: PhyUpdate {
            tx: Phy::OneM,
            rx: Phy::OneM,
        },
        mtu: DEFAULT_MTU,
        data_length: DataLength::MINIMUM,
    };

    /// Application bytes that fit in one notification
    pub fn usable_payload(&self) -> u16 {
        self.mtu.saturating_sub(ATT_HEADER_OVERHEAD)
    }
}

impl Default for LinkParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Client configuration descriptor value written by the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Subscription {
    /// Notifications off
    Disabled = 0x0000,
    /// Notifications on
    Notify = 0x0001,
}

impl TryFrom<u16> for Subscription {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(Self::Disabled),
            0x0001 => Ok(Self::Notify),
            _ => Err(()),
        }
    }
}

/// Longest local name that fits the advertising payload
pub const DEVICE_NAME_MAX: usize = 29;

/// Connectable advertising set
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingParams {
    /// Accept connections
    pub connectable: bool,
    /// Advertise with the identity address
    pub use_identity: bool,
    /// Minimum interval, units of 0.625 ms
    pub interval_min: u16,
    /// Maximum interval, units of 0.625 ms
    pub interval_max: u16,
    /// Complete local name
    pub name: String<DEVICE_NAME_MAX>,
    /// Service listed in the scan response
    pub service_uuid: u128,
}

impl AdvertisingParams {
    /// Connectable, identity address, roughly 500 ms interval
    ///
    /// Names longer than [`DEVICE_NAME_MAX`] bytes are cut at the last
    /// character that fits.
    pub fn new(name: &str) -> Self {
        let mut short = String::new();
        for c in name.chars() {
            if short.push(c).is_err() {
                break;
            }
        }
        Self {
            connectable: true,
            use_identity: true,
            interval_min: 800,
            interval_max: 801,
            name: short,
            service_uuid: SERVICE_UUID,
        }
    }

    /// Minimum interval in milliseconds
    pub fn interval_min_ms(&self) -> f32 {
        self.interval_min as f32 * 0.625
    }
}
