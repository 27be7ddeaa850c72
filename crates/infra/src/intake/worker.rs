//! Single serial consumer of the intake queue.
//!
//! Each job goes Received -> Parsing -> (ShortCircuited | Committing) -> Publishing
//! and back to Idle. Exactly one outcome is published per job.

use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use opportunities_openings::CsvBatchParser;

use crate::feedback::FeedbackPublisher;
use crate::store::OpeningStore;

use super::commit::commit_batch;
use super::queue::{Dequeued, IntakeReceiver};
use super::types::{IngestionJob, IngestionOutcome};

const WORKER_NAME: &str = "csv-ingestion-worker";

/// How often an idle worker checks for a shutdown request.
const TICK: Duration = Duration::from_millis(250);

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    #[default]
    Idle,
    Received,
    Parsing,
    Committing,
    ShortCircuited,
    Publishing,
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeStats {
    pub state: WorkerState,
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub feedback_published: u64,
    pub feedback_dropped: u64,
    pub uptime_secs: u64,
}

/// Shared, read-mostly view of the worker's statistics.
#[derive(Debug, Clone)]
pub struct IntakeStatsHandle {
    started: Instant,
    inner: Arc<Mutex<IntakeStats>>,
}

impl Default for IntakeStatsHandle {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            inner: Arc::new(Mutex::new(IntakeStats::default())),
        }
    }
}

impl IntakeStatsHandle {
    pub fn snapshot(&self) -> IntakeStats {
        let mut stats = self
            .inner
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }

    fn update(&self, f: impl FnOnce(&mut IntakeStats)) {
        if let Ok(mut stats) = self.inner.lock() {
            f(&mut stats);
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.update(|s| s.state = state);
    }
}

/// Parses, persists and reports on queued uploads, one at a time.
pub struct IngestionWorker<S> {
    parser: CsvBatchParser,
    store: S,
    publisher: Option<Arc<dyn FeedbackPublisher>>,
    stats: IntakeStatsHandle,
}

impl<S: OpeningStore + 'static> IngestionWorker<S> {
    pub fn new(store: S, parser: CsvBatchParser) -> Self {
        Self {
            parser,
            store,
            publisher: None,
            stats: IntakeStatsHandle::default(),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn FeedbackPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn stats_handle(&self) -> IntakeStatsHandle {
        self.stats.clone()
    }

    /// Run one job to completion and publish its outcome.
    ///
    /// Must not be called from inside an async task: the store is driven with
    /// `runtime.block_on`.
    pub fn process(&self, job: IngestionJob, runtime: &Handle) -> IngestionOutcome {
        let started = Instant::now();
        let request_id = job.request_id;

        self.stats.set_state(WorkerState::Received);
        info!(request_id = %request_id, bytes = job.content.len(), "csv job received");

        self.stats.set_state(WorkerState::Parsing);
        let outcome = match self.parser.parse(&job.content) {
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "csv document rejected");
                IngestionOutcome::document_rejected(request_id, started, &e)
            }
            Ok(batch) if batch.has_errors() => {
                self.stats.set_state(WorkerState::ShortCircuited);
                for row_error in &batch.row_errors {
                    debug!(
                        request_id = %request_id,
                        line_number = row_error.line_number,
                        error = %row_error.message,
                        "csv row rejected"
                    );
                }
                warn!(
                    request_id = %request_id,
                    total_rows = batch.total_rows(),
                    error_count = batch.row_errors.len(),
                    "csv validation failed; nothing persisted"
                );
                IngestionOutcome::rows_rejected(request_id, started, &batch)
            }
            Ok(batch) => {
                self.stats.set_state(WorkerState::Committing);
                let total_rows = batch.total_rows();
                match runtime.block_on(commit_batch(&self.store, &batch.openings)) {
                    Ok(_) => IngestionOutcome::succeeded(request_id, started, total_rows),
                    Err(e) => {
                        error!(request_id = %request_id, error = %e, "csv batch not persisted");
                        IngestionOutcome::commit_failed(request_id, started, total_rows, &e)
                    }
                }
            }
        };

        self.stats.set_state(WorkerState::Publishing);
        let delivered = self.publish(&outcome);

        self.stats.update(|s| {
            s.state = WorkerState::Idle;
            s.jobs_processed += 1;
            if outcome.is_success() {
                s.jobs_succeeded += 1;
            } else {
                s.jobs_failed += 1;
            }
            if delivered {
                s.feedback_published += 1;
            } else {
                s.feedback_dropped += 1;
            }
        });

        info!(
            request_id = %request_id,
            status = ?outcome.status,
            total_rows = outcome.total_rows,
            processed_rows = outcome.processed_rows,
            duration_ms = outcome.duration_ms,
            "csv job finished"
        );
        outcome
    }

    fn publish(&self, outcome: &IngestionOutcome) -> bool {
        let Some(publisher) = &self.publisher else {
            error!(request_id = %outcome.request_id, "feedback publisher not configured; outcome dropped");
            return false;
        };

        match publisher.publish(outcome) {
            Ok(()) => true,
            Err(e) => {
                error!(request_id = %outcome.request_id, error = %e, "failed to publish csv feedback");
                false
            }
        }
    }

    /// Start the worker on its own thread.
    ///
    /// The worker stops when shut down through the returned handle or when every
    /// producer of `receiver` is gone. A job in progress always finishes first.
    pub fn spawn(self, receiver: IntakeReceiver, runtime: Handle) -> io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = self.stats.clone();

        let join = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || worker_loop(self, receiver, shutdown_rx, runtime))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn worker_loop<S: OpeningStore + 'static>(
    worker: IngestionWorker<S>,
    receiver: IntakeReceiver,
    shutdown_rx: mpsc::Receiver<()>,
    runtime: Handle,
) {
    info!(worker = WORKER_NAME, "ingestion worker started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match receiver.dequeue_timeout(TICK) {
            Dequeued::Job(job) => {
                worker.process(job, &runtime);
            }
            Dequeued::Idle => continue,
            Dequeued::Closed => break,
        }
    }

    info!(worker = WORKER_NAME, "ingestion worker stopped");
}

/// Handle to control and join the ingestion worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: IntakeStatsHandle,
}

impl WorkerHandle {
    /// Request shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> IntakeStats {
        self.stats.snapshot()
    }

    pub fn stats_handle(&self) -> IntakeStatsHandle {
        self.stats.clone()
    }
}
