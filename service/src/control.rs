//! Control path
//!
//! Consumes lifecycle events from the transport in arrival order, folds
//! them into the session and carries out the side effects the session asks
//! for: advertising restarts, negotiation drivers, failure reports.

use std::sync::Arc;

use shared::{ConnHandle, LinkEvent, Reaction, Violation};
use tokio::task::JoinHandle;

use crate::advertising::AdvertisingController;
use crate::negotiation::{self, NegotiationPlan};
use crate::session::SharedSession;
use crate::stats::PipelineStats;
use crate::transport::{EventReceiver, Transport};

/// Event dispatcher for one link
pub struct ControlPath<T> {
    session: Arc<SharedSession>,
    transport: Arc<T>,
    advertiser: Arc<AdvertisingController<T>>,
    stats: Arc<PipelineStats>,
    plan: NegotiationPlan,
}

impl<T> Clone for ControlPath<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            transport: self.transport.clone(),
            advertiser: self.advertiser.clone(),
            stats: self.stats.clone(),
            plan: self.plan,
        }
    }
}

impl<T: Transport> ControlPath<T> {
    pub fn new(
        session: Arc<SharedSession>,
        transport: Arc<T>,
        advertiser: Arc<AdvertisingController<T>>,
        stats: Arc<PipelineStats>,
        plan: NegotiationPlan,
    ) -> Self {
        Self {
            session,
            transport,
            advertiser,
            stats,
            plan,
        }
    }

    /// Handle one event
    ///
    /// Returns the negotiation driver when the event opened a connection.
    pub fn handle_event(&self, event: LinkEvent) -> Option<JoinHandle<()>> {
        match self.session.apply(event) {
            Reaction::StartNegotiation(handle) => {
                if let LinkEvent::Connected { params, .. } = event {
                    log::info!(
                        "Connected: interval {:.2} ms, latency {}, timeout {} ms",
                        params.interval_ms(),
                        params.latency,
                        params.supervision_timeout_ms()
                    );
                }
                self.advertiser.on_connected();
                return self.spawn_negotiation(handle);
            }
            Reaction::RestartAdvertising => {
                match event {
                    LinkEvent::Disconnected { reason, .. } => {
                        log::info!("Disconnected (reason {:#04x})", reason)
                    }
                    _ => log::info!("Connection object available, restarting advertising"),
                }
                // Failure already logged and counted by the controller
                let _ = self.advertiser.start();
            }
            Reaction::ConnectFailed(status) => {
                log::warn!("Connection failed (status {})", status);
            }
            Reaction::StepFailed(failure) => negotiation::report_failure(failure, &self.stats),
            Reaction::Rejected(violation) => {
                self.stats.protocol_violation();
                match violation {
                    Violation::AlreadyConnected(handle) => {
                        log::error!("Rejected second connection {:?}, one link already active", handle)
                    }
                    Violation::InvalidSubscription(value) => {
                        log::error!("Invalid CCC value: {}", value)
                    }
                }
            }
            Reaction::Ignored => log::debug!("Ignored {:?} in current state", event),
            Reaction::None => self.log_update(event),
        }
        None
    }

    /// Handle events until the transport side of the channel closes
    pub async fn run(self, mut events: EventReceiver) {
        log::info!("Control path started");
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        log::info!("Event channel closed, control path stopped");
    }

    fn spawn_negotiation(&self, handle: ConnHandle) -> Option<JoinHandle<()>> {
        // Taken before spawning so no later event can slip in between
        let ticket = match self.session.begin_negotiation(handle) {
            Ok(ticket) => ticket,
            Err(e) => {
                log::warn!("Cannot negotiate on {:?}: {:?}", handle, e);
                return None;
            }
        };
        let session = self.session.clone();
        let transport = self.transport.clone();
        let stats = self.stats.clone();
        let plan = self.plan;
        Some(tokio::spawn(async move {
            negotiation::negotiate(&*session, &*transport, ticket, &plan, &stats).await;
        }))
    }

    fn log_update(&self, event: LinkEvent) {
        let params = self.session.snapshot().params;
        match event {
            LinkEvent::ParamsUpdated(conn) => log::info!(
                "Connection parameters updated: interval {:.2} ms, latency {}, timeout {} ms",
                conn.interval_ms(),
                conn.latency,
                conn.supervision_timeout_ms()
            ),
            LinkEvent::PhyUpdated(_) => {
                log::info!("PHY updated. New PHY: {}", params.phy.tx.label())
            }
            LinkEvent::DataLengthUpdated(_) => {
                let len = params.data_length;
                log::info!(
                    "Data length updated. Length {}/{} bytes, time {}/{} us",
                    len.tx_len,
                    len.rx_len,
                    len.tx_time,
                    len.rx_time
                );
            }
            LinkEvent::MtuExchanged(_) => {
                log::info!("MTU exchange done. New MTU: {} bytes", params.usable_payload())
            }
            LinkEvent::SubscriptionChanged(_) => {
                if self.session.snapshot().subscribed {
                    log::info!("Notifications enabled");
                } else {
                    log::info!("Notifications disabled");
                }
            }
            other => log::debug!("Applied {:?}", other),
        }
    }
}
