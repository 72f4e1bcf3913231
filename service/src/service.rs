//! Service assembly
//!
//! Wires transport, session, queue and tasks together:
//!
//! ```text
//!  ┌─────────┐  push   ┌───────────────┐  pop   ┌──────────┐ notify ┌───────────┐
//!  │ Sampler │ ──────► │ TransferQueue │ ─────► │ Notifier │ ─────► │ Transport │
//!  └─────────┘         └───────────────┘        └──────────┘        └───────────┘
//!                                                    │ snapshot          │ events
//!                                               ┌──────────┐  apply ┌─────────────┐
//!                                               │ Session  │ ◄───── │ ControlPath │
//!                                               └──────────┘        └─────────────┘
//! ```

use std::sync::Arc;

use shared::{AdvertisingParams, SampleSource};
use tokio::task::JoinHandle;

use crate::advertising::AdvertisingController;
use crate::config::PipelineConfig;
use crate::config_rx::{ConfigEndpoint, ConfigInterpreter};
use crate::control::ControlPath;
use crate::error::StartupError;
use crate::negotiation::NegotiationPlan;
use crate::notifier::Notifier;
use crate::queue::TransferQueue;
use crate::sampler;
use crate::session::SharedSession;
use crate::stats::{PipelineStats, StatsSnapshot};
use crate::transport::{EventSink, Transport};

/// Entry point of the sensor link
pub struct LinkService;

impl LinkService {
    /// Bring the transport up and spawn the pipeline tasks
    ///
    /// Must be called from within a tokio runtime. Only a failing transport
    /// initialisation or an invalid configuration is fatal; a refused
    /// advertising start is logged and the service keeps running.
    pub fn start<T, S, I>(
        transport: Arc<T>,
        source: S,
        interpreter: I,
        config: PipelineConfig,
    ) -> Result<ServiceHandle<I>, StartupError>
    where
        T: Transport,
        S: SampleSource + Send + 'static,
        I: ConfigInterpreter,
    {
        config.validate()?;
        transport.init().map_err(|e| {
            log::error!("Bluetooth init failed: {}", e);
            StartupError::TransportInit(e)
        })?;
        log::info!("Bluetooth initialized");

        let (events, rx) = EventSink::channel();
        transport.bind(events.clone());

        let stats = Arc::new(PipelineStats::new());
        let session = Arc::new(SharedSession::new());
        let queue: Arc<TransferQueue> = Arc::new(TransferQueue::new());

        let advertiser = Arc::new(AdvertisingController::new(
            transport.clone(),
            AdvertisingParams::new(&config.device_name),
            stats.clone(),
        ));
        // Already logged and counted, the next recycle retries
        let _ = advertiser.start();

        let plan = NegotiationPlan {
            mtu: config.preferred_mtu,
            settle_delay: config.settle_delay(),
            ..NegotiationPlan::default()
        };
        let control = ControlPath::new(
            session.clone(),
            transport.clone(),
            advertiser,
            stats.clone(),
            plan,
        );
        let notifier = Notifier::new(
            queue.clone(),
            session.clone(),
            transport,
            stats.clone(),
            config.notify_cooldown(),
        );

        let tasks = vec![
            tokio::spawn(control.run(rx)),
            tokio::spawn(sampler::run(source, queue, stats.clone(), config.window_period())),
            tokio::spawn(notifier.run()),
        ];

        Ok(ServiceHandle {
            session,
            stats: stats.clone(),
            config_endpoint: ConfigEndpoint::new(interpreter, stats),
            events,
            tasks,
        })
    }
}

/// Running service
pub struct ServiceHandle<I> {
    session: Arc<SharedSession>,
    stats: Arc<PipelineStats>,
    config_endpoint: ConfigEndpoint<I>,
    events: EventSink,
    tasks: Vec<JoinHandle<()>>,
}

impl<I: ConfigInterpreter> ServiceHandle<I> {
    /// Link session shared with the tasks
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Current counter values
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Endpoint for writes to the configuration characteristic
    pub fn config_endpoint(&self) -> &ConfigEndpoint<I> {
        &self.config_endpoint
    }

    /// Sink feeding the control path
    pub fn events(&self) -> EventSink {
        self.events.clone()
    }

    /// Abort every task
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        log::info!("Sensor link stopped");
    }
}
