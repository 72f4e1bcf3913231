//! # Transfer Queue
//!
//! Bounded FIFO between the sampler and the notifier. Both ends block: a
//! producer waits for a free slot instead of dropping a record, the consumer
//! waits for a record instead of polling.
//!
//! ```text
//!  sampler ──push──► ┌────────────────────┐ ──pop──► notifier
//!                    │  RecordRing<C>     │
//!      waits on      │  (mutex guarded)   │      waits on
//!      not_full ◄────┴────────────────────┴────► not_empty
//! ```
//!
//! The ring lock is only held for a slot copy, never across an await.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shared::{RecordRing, SampleRecord, QUEUE_CAPACITY};
use tokio::sync::Notify;

/// Bounded multi-producer, single-consumer record queue
pub struct TransferQueue<const C: usize = QUEUE_CAPACITY> {
    ring: Mutex<RecordRing<C>>,
    not_empty: Notify,
    not_full: Notify,
}

impl<const C: usize> TransferQueue<C> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            ring: Mutex::new(RecordRing::new()),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Append a record, waiting while the queue is full
    ///
    /// Cancel safe: a push dropped while waiting has inserted nothing.
    pub async fn push(&self, record: SampleRecord) {
        loop {
            if self.ring().try_push(record).is_ok() {
                self.not_empty.notify_one();
                return;
            }
            self.not_full.notified().await;
        }
    }

    /// Remove the oldest record, waiting while the queue is empty
    ///
    /// Only one task may pop.
    pub async fn pop(&self) -> SampleRecord {
        loop {
            let popped = self.ring().try_pop();
            if let Ok(record) = popped {
                self.not_full.notify_one();
                return record;
            }
            self.not_empty.notified().await;
        }
    }

    /// Number of queued records
    pub fn len(&self) -> usize {
        self.ring().len()
    }

    /// Check if no record is queued
    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    /// Fixed number of slots
    pub const fn capacity(&self) -> usize {
        C
    }

    fn ring(&self) -> MutexGuard<'_, RecordRing<C>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<const C: usize> Default for TransferQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared::SAMPLE_WINDOW;
    use tokio::time::timeout;

    use super::*;

    fn record(head: u8) -> SampleRecord {
        let mut data = [0u8; SAMPLE_WINDOW];
        data[0] = head;
        SampleRecord::new(data)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_five_records() {
        let queue: TransferQueue<8> = TransferQueue::new();
        for i in 1..=5 {
            queue.push(record(i)).await;
        }
        assert_eq!(queue.len(), 5);
        for i in 1..=5 {
            assert_eq!(queue.pop().await.as_bytes()[0], i);
        }
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_blocks_push() {
        let queue: TransferQueue<2> = TransferQueue::new();
        queue.push(record(1)).await;
        queue.push(record(2)).await;

        // Third push cannot complete while both slots are taken
        let blocked = timeout(Duration::from_millis(100), queue.push(record(3))).await;
        assert!(blocked.is_err());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().await.as_bytes()[0], 1);
        timeout(Duration::from_millis(1), queue.push(record(3)))
            .await
            .expect("push after pop must not block");

        assert_eq!(queue.pop().await.as_bytes()[0], 2);
        assert_eq!(queue.pop().await.as_bytes()[0], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_push_resumes_after_pop() {
        let queue: Arc<TransferQueue<2>> = Arc::new(TransferQueue::new());
        queue.push(record(1)).await;
        queue.push(record(2)).await;

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(record(3)).await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!producer.is_finished());

        assert_eq!(queue.pop().await.as_bytes()[0], 1);
        producer.await.unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_waits_for_push() {
        let queue: Arc<TransferQueue<4>> = Arc::new(TransferQueue::new());

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::task::yield_now().await;
        assert!(!consumer.is_finished());

        queue.push(record(42)).await;
        assert_eq!(consumer.await.unwrap().as_bytes()[0], 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_loss_with_concurrent_producers() {
        let queue: Arc<TransferQueue<3>> = Arc::new(TransferQueue::new());
        let mut producers = Vec::new();
        for p in 0..4u8 {
            let queue = queue.clone();
            producers.push(tokio::spawn(async move {
                for i in 0..25u8 {
                    queue.push(record(p * 25 + i)).await;
                }
            }));
        }

        let mut seen = vec![0u32; 100];
        for _ in 0..100 {
            let head = queue.pop().await.as_bytes()[0] as usize;
            seen[head] += 1;
        }
        for producer in producers {
            producer.await.unwrap();
        }

        assert!(seen.iter().all(|&n| n == 1));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity() {
        let queue: TransferQueue = TransferQueue::new();
        assert_eq!(queue.capacity(), QUEUE_CAPACITY);
    }
}
