//! Asynchronous ingestion: bounded intake queue, serial worker, atomic commit.

pub mod commit;
pub mod queue;
pub mod types;
pub mod worker;

pub use commit::{CommitError, commit_batch};
pub use queue::{Dequeued, EnqueueError, IntakeQueue, IntakeReceiver, intake_queue};
pub use types::{IngestionJob, IngestionOutcome, OutcomeStatus};
pub use worker::{IngestionWorker, IntakeStats, IntakeStatsHandle, WorkerHandle, WorkerState};
