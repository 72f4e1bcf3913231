//! # Loopback Transport
//!
//! In-process [`Transport`] that plays both the radio stack and the peer.
//! Every request is recorded with a timestamp from the tokio clock, and
//! negotiation requests are answered immediately with a scripted
//! [`Completion`] through the bound [`EventSink`].
//!
//! The peer side is driven explicitly with [`LoopbackTransport::connect`],
//! [`LoopbackTransport::subscribe`] and friends, which emit the same events
//! a real stack would.
//!
//! The call log keeps the most recent [`CALL_LOG_LIMIT`] requests, so a
//! long simulator run stays within fixed memory.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::{
    AdvertisingParams, ConnHandle, ConnParams, DataLength, LinkEvent, PhyUpdate, StatusCode,
    Subscription,
};
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{EventSink, Transport, TransportResult};

/// Requests kept in the call log, older ones are dropped first
pub const CALL_LOG_LIMIT: usize = 1024;

/// How the loopback peer answers a negotiation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// Accept and complete with this value
    Succeed(T),
    /// Accept, then report failure with this status
    Fail(StatusCode),
    /// Refuse the request outright
    Refuse(TransportError),
    /// Accept and never complete
    Silent,
}

/// A request seen by the loopback transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Init,
    StartAdvertising,
    StopAdvertising,
    RequestPhy(ConnHandle, PhyUpdate),
    RequestDataLength(ConnHandle, DataLength),
    ExchangeMtu(ConnHandle, u16),
    Notify(ConnHandle, Vec<u8>),
}

/// Scripted answers of the loopback peer
#[derive(Debug, Clone)]
pub struct Script {
    pub init: TransportResult<()>,
    pub advertising: TransportResult<()>,
    pub phy: Completion<PhyUpdate>,
    pub data_length: Completion<DataLength>,
    /// MTU the peer supports, the exchange settles on the smaller of both
    pub mtu: Completion<u16>,
    pub notify: TransportResult<()>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            init: Ok(()),
            advertising: Ok(()),
            phy: Completion::Succeed(PhyUpdate::PREFERRED),
            data_length: Completion::Succeed(DataLength::MAXIMUM),
            mtu: Completion::Succeed(247),
            notify: Ok(()),
        }
    }
}

#[derive(Default)]
struct Inner {
    events: Option<EventSink>,
    script: Script,
    calls: VecDeque<(Instant, TransportCall)>,
}

/// Transport that loops requests back as events
#[derive(Default)]
pub struct LoopbackTransport {
    inner: Mutex<Inner>,
}

impl LoopbackTransport {
    /// Create a transport where every request succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport answering with `script`
    pub fn with_script(script: Script) -> Self {
        let transport = Self::default();
        transport.lock().script = script;
        transport
    }

    /// Change the scripted answer for notifications
    pub fn set_notify_result(&self, result: TransportResult<()>) {
        self.lock().script.notify = result;
    }

    /// Every request seen so far, oldest first
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.iter().map(|(_, call)| call.clone()).collect()
    }

    /// Every request with the time it was issued
    pub fn timed_calls(&self) -> Vec<(Instant, TransportCall)> {
        self.lock().calls.iter().cloned().collect()
    }

    /// Number of advertising start requests
    pub fn advertising_starts(&self) -> usize {
        self.count(|call| matches!(call, TransportCall::StartAdvertising))
    }

    /// Payloads of every notification request
    pub fn notifications(&self) -> Vec<Vec<u8>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|(_, call)| match call {
                TransportCall::Notify(_, payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Peer connects
    pub fn connect(&self, handle: ConnHandle, params: ConnParams) {
        self.emit(LinkEvent::Connected { handle, params });
    }

    /// Peer disconnects
    pub fn disconnect(&self, handle: ConnHandle, reason: u8) {
        self.emit(LinkEvent::Disconnected { handle, reason });
    }

    /// Stack frees the connection object
    pub fn recycle(&self, handle: ConnHandle) {
        self.emit(LinkEvent::Recycled { handle });
    }

    /// Peer writes the client configuration descriptor
    pub fn subscribe(&self, subscription: Subscription) {
        self.emit(LinkEvent::SubscriptionChanged(subscription as u16));
    }

    /// Emit an arbitrary event as if the stack reported it
    pub fn emit(&self, event: LinkEvent) {
        let sink = self.lock().events.clone();
        match sink {
            Some(sink) => sink.emit(event),
            None => log::warn!("Loopback transport not bound, dropping {:?}", event),
        }
    }

    fn count(&self, pred: impl Fn(&TransportCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|(_, call)| pred(call)).count()
    }

    fn record(&self, call: TransportCall) -> MutexGuard<'_, Inner> {
        let mut inner = self.lock();
        if inner.calls.len() == CALL_LOG_LIMIT {
            inner.calls.pop_front();
        }
        inner.calls.push_back((Instant::now(), call));
        inner
    }

    fn complete<T: Clone>(
        &self,
        completion: &Completion<T>,
        event: impl FnOnce(Result<T, StatusCode>) -> LinkEvent,
    ) -> TransportResult<()> {
        let outcome = match completion {
            Completion::Succeed(value) => Ok(value.clone()),
            Completion::Fail(status) => Err(*status),
            Completion::Refuse(err) => return Err(err.clone()),
            Completion::Silent => return Ok(()),
        };
        self.emit(event(outcome));
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for LoopbackTransport {
    fn init(&self) -> TransportResult<()> {
        self.record(TransportCall::Init).script.init.clone()
    }

    fn bind(&self, events: EventSink) {
        self.lock().events = Some(events);
    }

    fn start_advertising(&self, _params: &AdvertisingParams) -> TransportResult<()> {
        self.record(TransportCall::StartAdvertising)
            .script
            .advertising
            .clone()
    }

    fn stop_advertising(&self) -> TransportResult<()> {
        self.record(TransportCall::StopAdvertising);
        Ok(())
    }

    fn request_phy(&self, conn: ConnHandle, preferred: PhyUpdate) -> TransportResult<()> {
        let completion = self
            .record(TransportCall::RequestPhy(conn, preferred))
            .script
            .phy
            .clone();
        self.complete(&completion, LinkEvent::PhyUpdated)
    }

    fn request_data_length(&self, conn: ConnHandle, requested: DataLength) -> TransportResult<()> {
        let completion = self
            .record(TransportCall::RequestDataLength(conn, requested))
            .script
            .data_length
            .clone();
        self.complete(&completion, LinkEvent::DataLengthUpdated)
    }

    fn exchange_mtu(&self, conn: ConnHandle, preferred: u16) -> TransportResult<()> {
        let completion = self
            .record(TransportCall::ExchangeMtu(conn, preferred))
            .script
            .mtu
            .clone();
        self.complete(&completion, |result| {
            LinkEvent::MtuExchanged(result.map(|peer| peer.min(preferred)))
        })
    }

    fn notify(&self, conn: ConnHandle, payload: &[u8]) -> TransportResult<()> {
        self.record(TransportCall::Notify(conn, payload.to_vec()))
            .script
            .notify
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_complete_through_sink() {
        let transport = LoopbackTransport::new();
        let (sink, mut rx) = EventSink::channel();
        transport.bind(sink);

        transport.request_phy(ConnHandle(1), PhyUpdate::PREFERRED).unwrap();
        transport.exchange_mtu(ConnHandle(1), 185).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(LinkEvent::PhyUpdated(Ok(PhyUpdate::PREFERRED)))
        );
        // Peer supports 247, we asked for 185
        assert_eq!(rx.recv().await, Some(LinkEvent::MtuExchanged(Ok(185))));
    }

    #[tokio::test]
    async fn test_refused_request_emits_nothing() {
        let transport = LoopbackTransport::with_script(Script {
            data_length: Completion::Refuse(TransportError::NoBuffers),
            ..Script::default()
        });
        let (sink, mut rx) = EventSink::channel();
        transport.bind(sink);

        let result = transport.request_data_length(ConnHandle(1), DataLength::MAXIMUM);
        assert_eq!(result, Err(TransportError::NoBuffers));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            transport.calls(),
            vec![TransportCall::RequestDataLength(ConnHandle(1), DataLength::MAXIMUM)]
        );
    }

    #[tokio::test]
    async fn test_failed_completion() {
        let transport = LoopbackTransport::with_script(Script {
            phy: Completion::Fail(StatusCode(0x1A)),
            ..Script::default()
        });
        let (sink, mut rx) = EventSink::channel();
        transport.bind(sink);

        transport.request_phy(ConnHandle(1), PhyUpdate::PREFERRED).unwrap();
        assert_eq!(
            rx.recv().await,
            Some(LinkEvent::PhyUpdated(Err(StatusCode(0x1A))))
        );
    }

    #[tokio::test]
    async fn test_records_notifications() {
        let transport = LoopbackTransport::new();
        transport.notify(ConnHandle(3), &[1, 2, 3]).unwrap();
        transport.set_notify_result(Err(TransportError::NoBuffers));
        assert!(transport.notify(ConnHandle(3), &[4]).is_err());

        assert_eq!(transport.notifications(), vec![vec![1, 2, 3], vec![4]]);
    }

    #[tokio::test]
    async fn test_call_log_is_bounded() {
        let transport = LoopbackTransport::new();
        for i in 0..CALL_LOG_LIMIT + 10 {
            transport.notify(ConnHandle(1), &[i as u8]).unwrap();
        }

        let sent = transport.notifications();
        assert_eq!(sent.len(), CALL_LOG_LIMIT);
        // Oldest entries went first
        assert_eq!(sent[0], vec![10u8]);
        assert_eq!(sent[CALL_LOG_LIMIT - 1], vec![(CALL_LOG_LIMIT + 9) as u8]);
    }
}
