//! Bounded hand-off between request handlers and the ingestion worker.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use thiserror::Error;

use super::types::IngestionJob;

/// Why a job was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("csv processing queue is full")]
    QueueFull,

    #[error("csv processing worker is not running")]
    Unavailable,
}

/// Create a queue holding at most `capacity` pending jobs.
///
/// With a capacity of zero a job is only admitted while the worker is blocked
/// waiting for one.
pub fn intake_queue(capacity: usize) -> (IntakeQueue, IntakeReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    (
        IntakeQueue { tx, capacity },
        IntakeReceiver { rx },
    )
}

/// Producer side. Cheap to clone; shared by every request handler.
#[derive(Debug, Clone)]
pub struct IntakeQueue {
    tx: SyncSender<IngestionJob>,
    capacity: usize,
}

impl IntakeQueue {
    /// Admit a job without blocking.
    pub fn try_enqueue(&self, job: IngestionJob) -> Result<(), EnqueueError> {
        self.tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::QueueFull,
            TrySendError::Disconnected(_) => EnqueueError::Unavailable,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer side. Owned by exactly one worker.
#[derive(Debug)]
pub struct IntakeReceiver {
    rx: Receiver<IngestionJob>,
}

/// Result of waiting for the next job.
#[derive(Debug)]
pub enum Dequeued {
    Job(IngestionJob),
    Idle,
    Closed,
}

impl IntakeReceiver {
    /// Block until a job arrives or every producer is gone.
    pub fn dequeue(&self) -> Option<IngestionJob> {
        self.rx.recv().ok()
    }

    /// Wait up to `timeout` for the next job.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Dequeued {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => Dequeued::Job(job),
            Err(RecvTimeoutError::Timeout) => Dequeued::Idle,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opportunities_core::RequestId;

    fn job(tag: &str) -> IngestionJob {
        IngestionJob::new(RequestId::new(), tag.as_bytes())
    }

    #[test]
    fn full_queue_rejects_without_blocking() {
        let (queue, _rx) = intake_queue(1);
        assert_eq!(queue.try_enqueue(job("a")), Ok(()));
        assert_eq!(queue.try_enqueue(job("b")), Err(EnqueueError::QueueFull));
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn zero_capacity_without_a_waiting_consumer_is_full() {
        let (queue, _rx) = intake_queue(0);
        assert_eq!(queue.try_enqueue(job("a")), Err(EnqueueError::QueueFull));
    }

    #[test]
    fn dropped_receiver_means_unavailable() {
        let (queue, rx) = intake_queue(4);
        drop(rx);
        assert_eq!(queue.try_enqueue(job("a")), Err(EnqueueError::Unavailable));
    }

    #[test]
    fn jobs_come_out_in_admission_order() {
        let (queue, rx) = intake_queue(3);
        for tag in ["a", "b", "c"] {
            queue.try_enqueue(job(tag)).unwrap();
        }

        let tags: Vec<Vec<u8>> = (0..3).map(|_| rx.dequeue().unwrap().content).collect();
        assert_eq!(tags, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn idle_and_closed_are_distinguished() {
        let (queue, rx) = intake_queue(1);
        assert!(matches!(rx.dequeue_timeout(Duration::from_millis(10)), Dequeued::Idle));
        drop(queue);
        assert!(matches!(rx.dequeue_timeout(Duration::from_millis(10)), Dequeued::Closed));
        assert!(rx.dequeue().is_none());
    }
}
