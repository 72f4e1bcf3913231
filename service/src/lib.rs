//! # Sensor Link Host Service
//!
//! Runs the sensor link peripheral on a tokio runtime:
//!
//! - **Sampler**: one record per window, pushed into the transfer queue
//! - **Transfer Queue**: bounded FIFO with backpressure between the tasks
//! - **Notifier**: drains the queue into the link, paced by a cooldown
//! - **Control Path**: applies transport events to the link session,
//!   restarts advertising and drives post-connect negotiation
//! - **Configuration Endpoint**: accepts raw configuration writes
//!
//! The radio stack sits behind the [`Transport`] trait. [`LoopbackTransport`]
//! plays both stack and peer in-process for tests and the simulator.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sensor_link::{LinkService, LogInterpreter, LoopbackTransport, PipelineConfig};
//! use sensor_link::shared::CounterSource;
//!
//! # async fn run() -> Result<(), sensor_link::StartupError> {
//! let transport = Arc::new(LoopbackTransport::new());
//! let service = LinkService::start(
//!     transport,
//!     CounterSource::new(),
//!     LogInterpreter,
//!     PipelineConfig::default(),
//! )?;
//! println!("{}", service.stats().to_json());
//! # Ok(())
//! # }
//! ```

pub mod advertising;
pub mod config;
pub mod config_rx;
pub mod control;
pub mod error;
pub mod loopback;
pub mod negotiation;
pub mod notifier;
pub mod queue;
pub mod sampler;
pub mod session;
pub mod service;
pub mod stats;
pub mod transport;

pub use shared;

pub use advertising::AdvertisingController;
pub use config::PipelineConfig;
pub use config_rx::{ConfigEndpoint, ConfigInterpreter, LogInterpreter};
pub use control::ControlPath;
pub use error::{ConfigError, StartupError, TransportError};
pub use loopback::{Completion, LoopbackTransport, Script, TransportCall};
pub use negotiation::NegotiationPlan;
pub use notifier::{Delivery, Notifier};
pub use queue::TransferQueue;
pub use service::{LinkService, ServiceHandle};
pub use session::SharedSession;
pub use stats::{PipelineStats, StatsSnapshot};
pub use transport::{EventReceiver, EventSink, Transport, TransportResult};
