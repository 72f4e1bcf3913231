//! Pipeline statistics
//!
//! Counters are bumped from the sampler, notifier and control tasks without
//! locking. A [`StatsSnapshot`] copies them for reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters shared by the pipeline tasks
#[derive(Debug, Default)]
pub struct PipelineStats {
    records_produced: AtomicU64,
    records_sent: AtomicU64,
    discarded_no_link: AtomicU64,
    discarded_unsubscribed: AtomicU64,
    send_failures: AtomicU64,
    negotiation_failures: AtomicU64,
    protocol_violations: AtomicU64,
    advertising_starts: AtomicU64,
    advertising_failures: AtomicU64,
    config_bytes_accepted: AtomicU64,
}

/// Point-in-time copy of the pipeline counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Records pushed by the sampler
    pub records_produced: u64,
    /// Records handed to the transport successfully
    pub records_sent: u64,
    /// Records dropped because no peer was connected
    pub discarded_no_link: u64,
    /// Records dropped because the peer did not subscribe
    pub discarded_unsubscribed: u64,
    /// Notifications the transport refused
    pub send_failures: u64,
    /// Negotiation steps that failed or were refused
    pub negotiation_failures: u64,
    /// Invalid descriptor values, oversized writes, duplicate connections
    pub protocol_violations: u64,
    /// Advertising start requests accepted by the transport
    pub advertising_starts: u64,
    /// Advertising start requests refused by the transport
    pub advertising_failures: u64,
    /// Bytes accepted on the configuration characteristic
    pub config_bytes_accepted: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl PipelineStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        record_produced => records_produced,
        record_sent => records_sent,
        discarded_no_link => discarded_no_link,
        discarded_unsubscribed => discarded_unsubscribed,
        send_failure => send_failures,
        negotiation_failure => negotiation_failures,
        protocol_violation => protocol_violations,
        advertising_started => advertising_starts,
        advertising_failure => advertising_failures,
    }

    pub(crate) fn config_accepted(&self, len: usize) {
        self.config_bytes_accepted
            .fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Copy every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_produced: self.records_produced.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            discarded_no_link: self.discarded_no_link.load(Ordering::Relaxed),
            discarded_unsubscribed: self.discarded_unsubscribed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            negotiation_failures: self.negotiation_failures.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            advertising_starts: self.advertising_starts.load(Ordering::Relaxed),
            advertising_failures: self.advertising_failures.load(Ordering::Relaxed),
            config_bytes_accepted: self.config_bytes_accepted.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Render as a JSON object
    pub fn to_json(&self) -> String {
        // Plain integer fields cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = PipelineStats::new();
        stats.record_produced();
        stats.record_produced();
        stats.record_sent();
        stats.config_accepted(12);

        let snap = stats.snapshot();
        assert_eq!(snap.records_produced, 2);
        assert_eq!(snap.records_sent, 1);
        assert_eq!(snap.config_bytes_accepted, 12);
        assert_eq!(snap.send_failures, 0);
    }

    #[test]
    fn test_snapshot_json() {
        let stats = PipelineStats::new();
        stats.negotiation_failure();

        let json: serde_json::Value = serde_json::from_str(&stats.snapshot().to_json()).unwrap();
        assert_eq!(json["negotiation_failures"], 1);
        assert_eq!(json["records_sent"], 0);
    }
}
