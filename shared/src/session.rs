//! # Link Session State Machine
//!
//! Tracks the single peer connection: its handle, the parameters negotiated
//! for it and whether the peer subscribed to sensor notifications.
//!
//! ## States
//!
//! ```text
//!            connected                begin_negotiation        all steps issued
//!   Idle ─────────────────► Connected ─────────────────► Negotiating ─────────────► Ready
//!    ▲                          │                            │                       │
//!    └──────────────────────────┴──────── disconnected ──────┴───────────────────────┘
//! ```
//!
//! The machine is synchronous and performs no I/O. [`LinkSession::apply`]
//! folds a transport event into the session and returns the [`Reaction`] the
//! caller has to carry out (restart advertising, start negotiating, report a
//! failure). Negotiation is driven from outside through
//! [`LinkSession::begin_negotiation`] and [`LinkSession::next_step`], which
//! hand out the requests in their fixed order.
//!
//! Negotiation completions may arrive in any order and at any time while
//! connected. A failed step is reported once and never retried; the link
//! stays usable at whatever was negotiated before.

use crate::link::{ConnHandle, ConnParams, DataLength, LinkParams, PhyUpdate, StatusCode, Subscription};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No connection, advertising
    #[default]
    Idle,
    /// Handle assigned, negotiation not started
    Connected,
    /// Parameter requests being issued
    Negotiating,
    /// Every request issued, notifications permitted if subscribed
    Ready,
}

impl LinkState {
    /// True for every state that owns a connection handle
    pub const fn is_connected(self) -> bool {
        !matches!(self, LinkState::Idle)
    }
}

/// One parameter upgrade request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NegotiationStep {
    /// Preferred PHY update
    Phy,
    /// Maximum link layer data length
    DataLength,
    /// ATT MTU exchange
    Mtu,
}

impl NegotiationStep {
    /// Order in which requests are issued
    pub const ORDER: [NegotiationStep; 3] = [
        NegotiationStep::Phy,
        NegotiationStep::DataLength,
        NegotiationStep::Mtu,
    ];

    /// Short label used in diagnostics
    pub const fn label(self) -> &'static str {
        match self {
            NegotiationStep::Phy => "PHY update",
            NegotiationStep::DataLength => "data length update",
            NegotiationStep::Mtu => "MTU exchange",
        }
    }
}

/// A negotiation step that did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NegotiationFailure {
    /// Step that failed
    pub step: NegotiationStep,
    /// Code reported by the transport
    pub status: StatusCode,
}

/// Negotiation started for one particular connection
///
/// The stack reuses handles, so the ticket also carries the connection
/// generation. A ticket taken on a closed connection never matches a later
/// connection on the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NegotiationTicket {
    /// Connection being negotiated
    pub handle: ConnHandle,
    generation: u32,
}

/// Connection lifecycle events reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A peer connected
    Connected {
        /// Handle of the new connection
        handle: ConnHandle,
        /// Initial connection parameters
        params: ConnParams,
    },
    /// A connection attempt failed before completing
    ConnectFailed {
        /// Code reported by the transport
        status: StatusCode,
    },
    /// The peer disconnected
    Disconnected {
        /// Handle of the closed connection
        handle: ConnHandle,
        /// HCI disconnect reason
        reason: u8,
    },
    /// The connection object of a closed connection is free again
    Recycled {
        /// Handle of the recycled connection
        handle: ConnHandle,
    },
    /// Central changed the connection parameters
    ParamsUpdated(ConnParams),
    /// PHY update procedure completed
    PhyUpdated(Result<PhyUpdate, StatusCode>),
    /// Data length update procedure completed
    DataLengthUpdated(Result<DataLength, StatusCode>),
    /// MTU exchange completed, carrying the negotiated ATT MTU
    MtuExchanged(Result<u16, StatusCode>),
    /// Peer wrote the client configuration descriptor
    SubscriptionChanged(u16),
}

/// Protocol violations detected while applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Violation {
    /// A second connection arrived while one is active
    AlreadyConnected(ConnHandle),
    /// Descriptor written with a value other than disabled or notify
    InvalidSubscription(u16),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reaction {
    /// Event recorded, nothing to do
    None,
    /// Event does not apply to the current state and was dropped
    Ignored,
    /// Connection accepted: stop advertising and start negotiating
    StartNegotiation(ConnHandle),
    /// Connection attempt failed, session stays idle
    ConnectFailed(StatusCode),
    /// Session is idle again: resume advertising
    RestartAdvertising,
    /// Negotiation step failed, report it
    StepFailed(NegotiationFailure),
    /// Event rejected, report it
    Rejected(Violation),
}

/// Errors raised by negotiation driving calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// No peer is connected
    NotConnected,
    /// Handle does not belong to the active connection
    HandleMismatch,
    /// Operation not valid in the current state
    WrongState(LinkState),
}

/// Consistent copy of the session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionSnapshot {
    /// Lifecycle state
    pub state: LinkState,
    /// Active connection, if any
    pub handle: Option<ConnHandle>,
    /// Peer subscribed to notifications
    pub subscribed: bool,
    /// Negotiated parameters
    pub params: LinkParams,
    /// Last reported connection parameters
    pub conn_params: Option<ConnParams>,
}

/// State of the single peer connection
#[derive(Debug, Clone)]
pub struct LinkSession {
    state: LinkState,
    handle: Option<ConnHandle>,
    params: LinkParams,
    conn_params: Option<ConnParams>,
    subscribed: bool,
    /// Index into `NegotiationStep::ORDER` of the next request to issue
    cursor: usize,
    /// Bumped on every accepted connection, survives resets
    generation: u32,
}

impl LinkSession {
    /// Create an idle session
    pub const fn new() -> Self {
        Self {
            state: LinkState::Idle,
            handle: None,
            params: LinkParams::DEFAULT,
            conn_params: None,
            subscribed: false,
            cursor: 0,
            generation: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Active connection handle
    pub fn handle(&self) -> Option<ConnHandle> {
        self.handle
    }

    /// Negotiated parameters
    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    /// Last reported connection parameters
    pub fn conn_params(&self) -> Option<ConnParams> {
        self.conn_params
    }

    /// Check if a peer is connected
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Check if `handle` is the active connection and its peer subscribed
    pub fn is_subscribed(&self, handle: ConnHandle) -> bool {
        self.handle == Some(handle) && self.subscribed
    }

    /// Copy every field at once
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            handle: self.handle,
            subscribed: self.subscribed,
            params: self.params,
            conn_params: self.conn_params,
        }
    }

    /// Fold a transport event into the session
    pub fn apply(&mut self, event: LinkEvent) -> Reaction {
        match event {
            LinkEvent::Connected { handle, params } => {
                if let Some(active) = self.handle {
                    if active != handle {
                        return Reaction::Rejected(Violation::AlreadyConnected(handle));
                    }
                    return Reaction::Ignored;
                }
                self.reset();
                self.generation = self.generation.wrapping_add(1);
                self.handle = Some(handle);
                self.conn_params = Some(params);
                self.state = LinkState::Connected;
                Reaction::StartNegotiation(handle)
            }
            LinkEvent::ConnectFailed { status } => Reaction::ConnectFailed(status),
            LinkEvent::Disconnected { .. } => {
                // Single connection: whatever closed, nothing stays active
                self.reset();
                Reaction::RestartAdvertising
            }
            LinkEvent::Recycled { .. } => Reaction::RestartAdvertising,
            LinkEvent::ParamsUpdated(params) => {
                if !self.is_connected() {
                    return Reaction::Ignored;
                }
                self.conn_params = Some(params);
                Reaction::None
            }
            LinkEvent::PhyUpdated(result) => self.complete(NegotiationStep::Phy, result, |p, phy| {
                p.phy = phy;
            }),
            LinkEvent::DataLengthUpdated(result) => {
                self.complete(NegotiationStep::DataLength, result, |p, len| {
                    p.data_length = len;
                })
            }
            LinkEvent::MtuExchanged(result) => self.complete(NegotiationStep::Mtu, result, |p, mtu| {
                p.mtu = mtu;
            }),
            LinkEvent::SubscriptionChanged(value) => match Subscription::try_from(value) {
                Err(()) => Reaction::Rejected(Violation::InvalidSubscription(value)),
                Ok(_) if !self.is_connected() => Reaction::Ignored,
                Ok(subscription) => {
                    self.subscribed = subscription == Subscription::Notify;
                    Reaction::None
                }
            },
        }
    }

    /// Move a fresh connection into negotiation
    pub fn begin_negotiation(
        &mut self,
        handle: ConnHandle,
    ) -> Result<NegotiationTicket, SessionError> {
        self.check_handle(handle)?;
        if self.state != LinkState::Connected {
            return Err(SessionError::WrongState(self.state));
        }
        self.cursor = 0;
        self.state = LinkState::Negotiating;
        Ok(NegotiationTicket {
            handle,
            generation: self.generation,
        })
    }

    /// Check if `ticket` was taken on the active connection
    pub fn is_current(&self, ticket: NegotiationTicket) -> bool {
        self.handle == Some(ticket.handle) && self.generation == ticket.generation
    }

    /// Next request to issue for the connection `ticket` was taken on
    ///
    /// Returns `None` once every step was handed out, moving the session to
    /// `Ready`, and also when that connection is gone, even if a new one
    /// reuses its handle.
    pub fn next_step(&mut self, ticket: NegotiationTicket) -> Option<NegotiationStep> {
        if !self.is_current(ticket) || self.state != LinkState::Negotiating {
            return None;
        }
        match NegotiationStep::ORDER.get(self.cursor) {
            Some(step) => {
                self.cursor += 1;
                Some(*step)
            }
            None => {
                self.state = LinkState::Ready;
                None
            }
        }
    }

    fn complete<T>(
        &mut self,
        step: NegotiationStep,
        result: Result<T, StatusCode>,
        update: impl FnOnce(&mut LinkParams, T),
    ) -> Reaction {
        if !self.is_connected() {
            return Reaction::Ignored;
        }
        match result {
            Ok(value) => {
                update(&mut self.params, value);
                Reaction::None
            }
            Err(status) => Reaction::StepFailed(NegotiationFailure { step, status }),
        }
    }

    fn check_handle(&self, handle: ConnHandle) -> Result<(), SessionError> {
        match self.handle {
            None => Err(SessionError::NotConnected),
            Some(active) if active != handle => Err(SessionError::HandleMismatch),
            Some(_) => Ok(()),
        }
    }

    fn reset(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::new()
        };
    }
}

impl Default for LinkSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Phy, DEFAULT_MTU};

    const H1: ConnHandle = ConnHandle(1);
    const PARAMS: ConnParams = ConnParams {
        interval: 24,
        latency: 0,
        timeout: 400,
    };

    fn connected() -> LinkSession {
        let mut session = LinkSession::new();
        let reaction = session.apply(LinkEvent::Connected {
            handle: H1,
            params: PARAMS,
        });
        assert_eq!(reaction, Reaction::StartNegotiation(H1));
        session
    }

    fn issue_all(session: &mut LinkSession) -> heapless::Vec<NegotiationStep, 4> {
        let mut steps = heapless::Vec::new();
        let ticket = session.begin_negotiation(H1).unwrap();
        while let Some(step) = session.next_step(ticket) {
            steps.push(step).unwrap();
        }
        steps
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = LinkSession::new();
        assert_eq!(session.state(), LinkState::Idle);
        assert!(session.handle().is_none());
        assert!(!session.is_subscribed(H1));
        assert_eq!(*session.params(), LinkParams::DEFAULT);
    }

    #[test]
    fn test_connect_records_handle_and_params() {
        let session = connected();
        assert_eq!(session.state(), LinkState::Connected);
        assert_eq!(session.handle(), Some(H1));
        assert_eq!(session.conn_params(), Some(PARAMS));
    }

    #[test]
    fn test_steps_issued_in_order_then_ready() {
        let mut session = connected();
        let steps = issue_all(&mut session);
        assert_eq!(steps.as_slice(), &NegotiationStep::ORDER);
        assert_eq!(session.state(), LinkState::Ready);
    }

    #[test]
    fn test_begin_negotiation_requires_connected_state() {
        let mut session = LinkSession::new();
        assert_eq!(session.begin_negotiation(H1), Err(SessionError::NotConnected));

        let mut session = connected();
        assert_eq!(
            session.begin_negotiation(ConnHandle(9)),
            Err(SessionError::HandleMismatch)
        );
        session.begin_negotiation(H1).unwrap();
        assert_eq!(
            session.begin_negotiation(H1),
            Err(SessionError::WrongState(LinkState::Negotiating))
        );
    }

    #[test]
    fn test_phy_failure_keeps_other_results() {
        let mut session = connected();
        issue_all(&mut session);

        let phy = session.apply(LinkEvent::PhyUpdated(Err(StatusCode(0x1A))));
        let dl = session.apply(LinkEvent::DataLengthUpdated(Ok(DataLength::MAXIMUM)));
        let mtu = session.apply(LinkEvent::MtuExchanged(Ok(247)));

        assert_eq!(
            phy,
            Reaction::StepFailed(NegotiationFailure {
                step: NegotiationStep::Phy,
                status: StatusCode(0x1A),
            })
        );
        assert_eq!(dl, Reaction::None);
        assert_eq!(mtu, Reaction::None);
        assert_eq!(session.state(), LinkState::Ready);
        assert_eq!(session.params().phy.tx, Phy::OneM);
        assert_eq!(session.params().data_length, DataLength::MAXIMUM);
        assert_eq!(session.params().mtu, 247);
        assert_eq!(session.params().usable_payload(), 244);
    }

    #[test]
    fn test_completions_out_of_order() {
        let mut session = connected();
        issue_all(&mut session);

        session.apply(LinkEvent::MtuExchanged(Ok(185)));
        session.apply(LinkEvent::PhyUpdated(Ok(PhyUpdate::PREFERRED)));
        assert_eq!(session.params().mtu, 185);
        assert_eq!(session.params().phy, PhyUpdate::PREFERRED);
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut session = connected();
        issue_all(&mut session);
        session.apply(LinkEvent::SubscriptionChanged(1));
        session.apply(LinkEvent::MtuExchanged(Ok(247)));
        assert!(session.is_subscribed(H1));

        let reaction = session.apply(LinkEvent::Disconnected {
            handle: H1,
            reason: 0x13,
        });
        assert_eq!(reaction, Reaction::RestartAdvertising);
        assert_eq!(session.state(), LinkState::Idle);
        assert!(session.handle().is_none());
        assert!(!session.is_subscribed(H1));
        assert_eq!(session.params().mtu, DEFAULT_MTU);
        assert!(session.conn_params().is_none());

        // A new connection negotiates from the first step again
        let reaction = session.apply(LinkEvent::Connected {
            handle: ConnHandle(2),
            params: PARAMS,
        });
        assert_eq!(reaction, Reaction::StartNegotiation(ConnHandle(2)));
        let ticket = session.begin_negotiation(ConnHandle(2)).unwrap();
        assert_eq!(session.next_step(ticket), Some(NegotiationStep::Phy));
    }

    #[test]
    fn test_stale_handle_stops_negotiation() {
        let mut session = connected();
        let ticket = session.begin_negotiation(H1).unwrap();
        assert_eq!(session.next_step(ticket), Some(NegotiationStep::Phy));

        session.apply(LinkEvent::Disconnected { handle: H1, reason: 8 });
        assert_eq!(session.next_step(ticket), None);
        assert_eq!(session.state(), LinkState::Idle);
    }

    #[test]
    fn test_reused_handle_gets_fresh_negotiation() {
        let mut session = connected();
        let old = session.begin_negotiation(H1).unwrap();
        assert_eq!(session.next_step(old), Some(NegotiationStep::Phy));

        session.apply(LinkEvent::Disconnected { handle: H1, reason: 8 });
        session.apply(LinkEvent::Connected {
            handle: H1,
            params: PARAMS,
        });
        let new = session.begin_negotiation(H1).unwrap();
        assert_ne!(old, new);

        // The old ticket cannot take steps of the new connection
        assert_eq!(session.next_step(old), None);
        assert_eq!(session.next_step(new), Some(NegotiationStep::Phy));
        assert_eq!(session.next_step(old), None);
        assert_eq!(session.next_step(new), Some(NegotiationStep::DataLength));
        assert_eq!(session.state(), LinkState::Negotiating);
    }

    #[test]
    fn test_repeated_connect_keeps_ticket_valid() {
        let mut session = connected();
        let ticket = session.begin_negotiation(H1).unwrap();
        assert_eq!(
            session.apply(LinkEvent::Connected {
                handle: H1,
                params: PARAMS,
            }),
            Reaction::Ignored
        );
        assert_eq!(session.next_step(ticket), Some(NegotiationStep::Phy));
    }

    #[test]
    fn test_subscription_values() {
        let mut session = connected();
        assert_eq!(session.apply(LinkEvent::SubscriptionChanged(1)), Reaction::None);
        assert!(session.is_subscribed(H1));
        assert!(!session.is_subscribed(ConnHandle(5)));

        let state = session.state();
        assert_eq!(
            session.apply(LinkEvent::SubscriptionChanged(2)),
            Reaction::Rejected(Violation::InvalidSubscription(2))
        );
        assert!(session.is_subscribed(H1));
        assert_eq!(session.state(), state);

        session.apply(LinkEvent::SubscriptionChanged(0));
        assert!(!session.is_subscribed(H1));
    }

    #[test]
    fn test_subscription_while_idle_is_not_kept() {
        let mut session = LinkSession::new();
        assert_eq!(session.apply(LinkEvent::SubscriptionChanged(1)), Reaction::Ignored);
        assert_eq!(
            session.apply(LinkEvent::SubscriptionChanged(7)),
            Reaction::Rejected(Violation::InvalidSubscription(7))
        );

        let session = connected();
        assert!(!session.is_subscribed(H1));
    }

    #[test]
    fn test_second_connection_rejected() {
        let mut session = connected();
        let reaction = session.apply(LinkEvent::Connected {
            handle: ConnHandle(2),
            params: PARAMS,
        });
        assert_eq!(
            reaction,
            Reaction::Rejected(Violation::AlreadyConnected(ConnHandle(2)))
        );
        assert_eq!(session.handle(), Some(H1));
    }

    #[test]
    fn test_completions_ignored_when_idle() {
        let mut session = LinkSession::new();
        assert_eq!(session.apply(LinkEvent::MtuExchanged(Ok(247))), Reaction::Ignored);
        assert_eq!(
            session.apply(LinkEvent::PhyUpdated(Err(StatusCode(1)))),
            Reaction::Ignored
        );
        assert_eq!(session.apply(LinkEvent::ParamsUpdated(PARAMS)), Reaction::Ignored);
        assert_eq!(session.params().mtu, DEFAULT_MTU);
    }

    #[test]
    fn test_connect_failed_stays_idle() {
        let mut session = LinkSession::new();
        let reaction = session.apply(LinkEvent::ConnectFailed {
            status: StatusCode(0x3E),
        });
        assert_eq!(reaction, Reaction::ConnectFailed(StatusCode(0x3E)));
        assert_eq!(session.state(), LinkState::Idle);
    }

    #[test]
    fn test_recycle_restarts_advertising_in_any_state() {
        let mut session = LinkSession::new();
        assert_eq!(
            session.apply(LinkEvent::Recycled { handle: H1 }),
            Reaction::RestartAdvertising
        );
        let mut session = connected();
        assert_eq!(
            session.apply(LinkEvent::Recycled { handle: H1 }),
            Reaction::RestartAdvertising
        );
        assert_eq!(session.state(), LinkState::Connected);
    }
}
