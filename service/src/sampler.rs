//! Sampler task
//!
//! Collects one window per period from a [`SampleSource`] and pushes it into
//! the transfer queue. A full queue stalls the sampler; records are never
//! dropped on this side.

use std::sync::Arc;
use std::time::Duration;

use shared::SampleSource;

use crate::queue::TransferQueue;
use crate::stats::PipelineStats;

/// Produce and enqueue one record per `period`, forever
pub async fn run<S, const C: usize>(
    mut source: S,
    queue: Arc<TransferQueue<C>>,
    stats: Arc<PipelineStats>,
    period: Duration,
) where
    S: SampleSource,
{
    log::info!("Sampler started, one window every {:?}", period);
    loop {
        tokio::time::sleep(period).await;
        let record = source.produce();
        if queue.len() == queue.capacity() {
            log::debug!("Transfer queue full, sampler stalls");
        }
        queue.push(record).await;
        stats.record_produced();
    }
}
