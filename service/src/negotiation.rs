//! Post-connect negotiation driver
//!
//! Issues the link upgrade requests for one connection in their fixed
//! order: PHY, then after the settle delay data length, then MTU. Requests
//! are fire-and-forget; their completions come back as events through the
//! control path. A refused request is reported like a failed completion and
//! the driver moves on to the next step.
//!
//! The settle delay only suspends this driver. The control path keeps
//! handling events meanwhile, so a disconnect during the delay ends the
//! negotiation before the next request is issued. The driver holds a
//! [`NegotiationTicket`] rather than a bare handle: a reconnect that reuses
//! the handle starts its own driver and the stale one stops.

use std::time::Duration;

use shared::{
    DataLength, LinkState, NegotiationFailure, NegotiationStep, NegotiationTicket, PhyUpdate,
};

use crate::session::SharedSession;
use crate::stats::PipelineStats;
use crate::transport::Transport;

/// What the driver requests and how long it waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiationPlan {
    /// PHY pair requested
    pub phy: PhyUpdate,
    /// Data length requested
    pub data_length: DataLength,
    /// ATT MTU offered in the exchange
    pub mtu: u16,
    /// Wait between the PHY and data length requests
    pub settle_delay: Duration,
}

impl Default for NegotiationPlan {
    fn default() -> Self {
        Self {
            phy: PhyUpdate::PREFERRED,
            data_length: DataLength::MAXIMUM,
            mtu: 247,
            settle_delay: Duration::from_millis(shared::SETTLE_DELAY_MS),
        }
    }
}

/// Report a failed step, never fatal
pub(crate) fn report_failure(failure: NegotiationFailure, stats: &PipelineStats) {
    stats.negotiation_failure();
    log::warn!(
        "{} failed (status {}), keeping current parameters",
        failure.step.label(),
        failure.status
    );
}

/// Issue every negotiation request for the connection behind `ticket`
pub async fn negotiate<T: Transport>(
    session: &SharedSession,
    transport: &T,
    ticket: NegotiationTicket,
    plan: &NegotiationPlan,
    stats: &PipelineStats,
) {
    let handle = ticket.handle;
    while let Some(step) = session.next_step(ticket) {
        let issued = match step {
            NegotiationStep::Phy => transport.request_phy(handle, plan.phy),
            NegotiationStep::DataLength => transport.request_data_length(handle, plan.data_length),
            NegotiationStep::Mtu => transport.exchange_mtu(handle, plan.mtu),
        };
        match issued {
            Ok(()) => log::debug!("{} requested", step.label()),
            Err(e) => {
                log::error!("{} request refused: {}", step.label(), e);
                let failure = NegotiationFailure {
                    step,
                    status: e.status(),
                };
                report_failure(failure, stats);
            }
        }

        if step == NegotiationStep::Phy {
            tokio::time::sleep(plan.settle_delay).await;
        }
    }

    if session.is_current(ticket) && session.snapshot().state == LinkState::Ready {
        log::info!("Negotiation requests issued, link ready");
    } else {
        log::info!("Connection {:?} closed during negotiation", handle);
    }
}
