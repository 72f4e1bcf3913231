//! Shared link session
//!
//! The control path is the only writer of the session, the notifier reads
//! it. Both go through one mutex so a reader always sees handle,
//! subscription and parameters from the same moment.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::{
    ConnHandle, LinkEvent, LinkSession, NegotiationStep, NegotiationTicket, Reaction, SessionError,
    SessionSnapshot,
};

/// Link session guarded for use across tasks
#[derive(Debug, Default)]
pub struct SharedSession {
    inner: Mutex<LinkSession>,
}

impl SharedSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of every session field
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Fold a transport event into the session
    pub fn apply(&self, event: LinkEvent) -> Reaction {
        self.lock().apply(event)
    }

    /// Move a fresh connection into negotiation
    pub fn begin_negotiation(&self, handle: ConnHandle) -> Result<NegotiationTicket, SessionError> {
        self.lock().begin_negotiation(handle)
    }

    /// Next negotiation request for the connection behind `ticket`
    pub fn next_step(&self, ticket: NegotiationTicket) -> Option<NegotiationStep> {
        self.lock().next_step(ticket)
    }

    /// Check if `ticket` belongs to the active connection
    pub fn is_current(&self, ticket: NegotiationTicket) -> bool {
        self.lock().is_current(ticket)
    }

    /// Check if `handle` is connected and subscribed
    pub fn is_subscribed(&self, handle: ConnHandle) -> bool {
        self.lock().is_subscribed(handle)
    }

    fn lock(&self) -> MutexGuard<'_, LinkSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
