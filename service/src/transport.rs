//! # Transport Abstraction
//!
//! The radio stack the service runs on. Every call is fire-and-forget: it
//! either refuses the request immediately or accepts it and later reports
//! the outcome as a [`LinkEvent`] through the [`EventSink`] handed over in
//! [`Transport::bind`].
//!
//! ## Design Rationale
//!
//! 1. **Testability**: the loopback transport records every request
//! 2. **Flexibility**: a real stack is wired in without touching the pipeline
//! 3. **Non-blocking**: callbacks from the stack only enqueue events

use shared::{AdvertisingParams, ConnHandle, DataLength, LinkEvent, PhyUpdate};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Result type alias for transport requests
pub type TransportResult<T> = Result<T, TransportError>;

/// Receiving end of the lifecycle event channel
pub type EventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

/// Handle through which the transport reports lifecycle events
///
/// Emitting never blocks, so it is safe to call from stack callbacks.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the control path reads from
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report an event, dropped silently once the control path stopped
    pub fn emit(&self, event: LinkEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("Control path gone, dropping {:?}", event);
        }
    }
}

/// Radio stack operations used by the sensor link
pub trait Transport: Send + Sync + 'static {
    /// Bring up the stack
    ///
    /// Failure here aborts service startup.
    fn init(&self) -> TransportResult<()>;

    /// Register the sink for lifecycle events
    fn bind(&self, events: EventSink);

    /// Start connectable advertising
    ///
    /// Must tolerate being called while already advertising.
    fn start_advertising(&self, params: &AdvertisingParams) -> TransportResult<()>;

    /// Stop advertising
    fn stop_advertising(&self) -> TransportResult<()>;

    /// Request a PHY update, completion reported as `LinkEvent::PhyUpdated`
    fn request_phy(&self, conn: ConnHandle, preferred: PhyUpdate) -> TransportResult<()>;

    /// Request a data length update, completion reported as
    /// `LinkEvent::DataLengthUpdated`
    fn request_data_length(&self, conn: ConnHandle, requested: DataLength) -> TransportResult<()>;

    /// Start an MTU exchange, completion reported as `LinkEvent::MtuExchanged`
    fn exchange_mtu(&self, conn: ConnHandle, preferred: u16) -> TransportResult<()>;

    /// Send one notification on the sensor data characteristic
    fn notify(&self, conn: ConnHandle, payload: &[u8]) -> TransportResult<()>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn init(&self) -> TransportResult<()> {
        (**self).init()
    }

    fn bind(&self, events: EventSink) {
        (**self).bind(events)
    }

    fn start_advertising(&self, params: &AdvertisingParams) -> TransportResult<()> {
        (**self).start_advertising(params)
    }

    fn stop_advertising(&self) -> TransportResult<()> {
        (**self).stop_advertising()
    }

    fn request_phy(&self, conn: ConnHandle, preferred: PhyUpdate) -> TransportResult<()> {
        (**self).request_phy(conn, preferred)
    }

    fn request_data_length(&self, conn: ConnHandle, requested: DataLength) -> TransportResult<()> {
        (**self).request_data_length(conn, requested)
    }

    fn exchange_mtu(&self, conn: ConnHandle, preferred: u16) -> TransportResult<()> {
        (**self).exchange_mtu(conn, preferred)
    }

    fn notify(&self, conn: ConnHandle, payload: &[u8]) -> TransportResult<()> {
        (**self).notify(conn, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_sink_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(LinkEvent::SubscriptionChanged(1));
        sink.emit(LinkEvent::SubscriptionChanged(0));

        assert_eq!(rx.recv().await, Some(LinkEvent::SubscriptionChanged(1)));
        assert_eq!(rx.recv().await, Some(LinkEvent::SubscriptionChanged(0)));
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        // Must not panic
        sink.emit(LinkEvent::Recycled {
            handle: ConnHandle(1),
        });
    }
}
