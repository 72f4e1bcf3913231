//! Notifier task
//!
//! Single consumer of the transfer queue. Every record gets exactly one
//! delivery attempt, gated on the session: no connection or no subscription
//! means the record is dropped. After every attempt the notifier rests for
//! the cooldown, which caps the notification rate regardless of how fast
//! records are produced.

use std::sync::Arc;
use std::time::Duration;

use shared::SampleRecord;

use crate::error::TransportError;
use crate::queue::TransferQueue;
use crate::session::SharedSession;
use crate::stats::PipelineStats;
use crate::transport::Transport;

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the transport
    Sent,
    /// Dropped, no peer connected
    NoActiveLink,
    /// Dropped, peer did not subscribe
    NotSubscribed,
    /// Transport refused the notification, not retried
    SendFailed(TransportError),
}

/// Drains the transfer queue into the link
pub struct Notifier<T, const C: usize> {
    queue: Arc<TransferQueue<C>>,
    session: Arc<SharedSession>,
    transport: Arc<T>,
    stats: Arc<PipelineStats>,
    cooldown: Duration,
}

impl<T: Transport, const C: usize> Notifier<T, C> {
    pub fn new(
        queue: Arc<TransferQueue<C>>,
        session: Arc<SharedSession>,
        transport: Arc<T>,
        stats: Arc<PipelineStats>,
        cooldown: Duration,
    ) -> Self {
        Self {
            queue,
            session,
            transport,
            stats,
            cooldown,
        }
    }

    /// Attempt to deliver one record to the connected peer
    pub fn deliver(&self, record: &SampleRecord) -> Delivery {
        let snapshot = self.session.snapshot();
        let Some(handle) = snapshot.handle else {
            self.stats.discarded_no_link();
            log::info!("No active link, dropping record {}", record.as_bytes()[0]);
            return Delivery::NoActiveLink;
        };
        if !snapshot.subscribed {
            self.stats.discarded_unsubscribed();
            log::warn!("Notifications not enabled for sensor data, dropping record");
            return Delivery::NotSubscribed;
        }

        match self.transport.notify(handle, record.as_bytes()) {
            Ok(()) => {
                self.stats.record_sent();
                log::debug!("Notified {} bytes on {:?}", record.len(), handle);
                Delivery::Sent
            }
            Err(e) => {
                self.stats.send_failure();
                log::error!("Unable to send notification: {}", e);
                Delivery::SendFailed(e)
            }
        }
    }

    /// Pop one record, deliver it, then rest for the cooldown
    pub async fn deliver_once(&self) -> Delivery {
        let record = self.queue.pop().await;
        let delivery = self.deliver(&record);
        tokio::time::sleep(self.cooldown).await;
        delivery
    }

    /// Deliver records forever
    pub async fn run(self) {
        log::info!("Notifier started, cooldown {:?}", self.cooldown);
        loop {
            self.deliver_once().await;
        }
    }
}
