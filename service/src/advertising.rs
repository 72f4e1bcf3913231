//! Advertising controller
//!
//! Keeps the device discoverable whenever no peer is connected. Starting is
//! idempotent at the transport level, so the controller issues every start
//! it is asked for and keeps no de-duplication state. A refused start is
//! reported and left to the operator; there is no retry loop here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shared::AdvertisingParams;

use crate::error::TransportError;
use crate::stats::PipelineStats;
use crate::transport::Transport;

/// Starts and stops connectable advertising
pub struct AdvertisingController<T> {
    transport: Arc<T>,
    params: AdvertisingParams,
    stats: Arc<PipelineStats>,
    /// Last known advertising state, diagnostics only
    active: AtomicBool,
}

impl<T: Transport> AdvertisingController<T> {
    pub fn new(transport: Arc<T>, params: AdvertisingParams, stats: Arc<PipelineStats>) -> Self {
        Self {
            transport,
            params,
            stats,
            active: AtomicBool::new(false),
        }
    }

    /// Issue an advertising start
    pub fn start(&self) -> Result<(), TransportError> {
        match self.transport.start_advertising(&self.params) {
            Ok(()) => {
                self.active.store(true, Ordering::Relaxed);
                self.stats.advertising_started();
                log::info!("Advertising successfully started as {:?}", self.params.name.as_str());
                Ok(())
            }
            Err(e) => {
                self.stats.advertising_failure();
                log::error!("Advertising failed to start: {}", e);
                Err(e)
            }
        }
    }

    /// A peer connected, advertising is over
    pub fn on_connected(&self) {
        self.active.store(false, Ordering::Relaxed);
        if let Err(e) = self.transport.stop_advertising() {
            log::warn!("Failed to stop advertising: {}", e);
        }
    }

    /// Whether the last start succeeded and no connection arrived since
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}
