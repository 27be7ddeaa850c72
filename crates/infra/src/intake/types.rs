//! Job and outcome types of the ingestion pipeline.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opportunities_core::RequestId;
use opportunities_openings::{DocumentError, ParsedBatch};

use super::commit::CommitError;

/// One queued upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJob {
    pub request_id: RequestId,
    pub content: Vec<u8>,
}

impl IngestionJob {
    pub fn new(request_id: RequestId, content: impl Into<Vec<u8>>) -> Self {
        Self {
            request_id,
            content: content.into(),
        }
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
}

/// Feedback event: exactly one per job, whatever happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub request_id: RequestId,
    pub status: OutcomeStatus,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub duration_ms: u64,
    pub error_count: usize,
    pub first_error_line: usize,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl IngestionOutcome {
    fn error(
        request_id: RequestId,
        started: Instant,
        total_rows: usize,
        error_count: usize,
        first_error_line: usize,
        message: String,
    ) -> Self {
        Self {
            request_id,
            status: OutcomeStatus::Error,
            total_rows,
            processed_rows: 0,
            duration_ms: elapsed_ms(started),
            error_count,
            first_error_line,
            message,
            timestamp: Utc::now(),
        }
    }

    /// The document could not be processed at all.
    pub fn document_rejected(request_id: RequestId, started: Instant, err: &DocumentError) -> Self {
        Self::error(request_id, started, 0, 1, 0, err.to_string())
    }

    /// At least one row failed validation; nothing was persisted.
    pub fn rows_rejected(request_id: RequestId, started: Instant, batch: &ParsedBatch) -> Self {
        Self::error(
            request_id,
            started,
            batch.total_rows(),
            batch.row_errors.len(),
            batch.first_error_line().unwrap_or(0),
            "csv validation failed".to_string(),
        )
    }

    /// Persistence failed and the transaction was rolled back.
    pub fn commit_failed(
        request_id: RequestId,
        started: Instant,
        total_rows: usize,
        err: &CommitError,
    ) -> Self {
        Self::error(
            request_id,
            started,
            total_rows,
            1,
            err.line_number().unwrap_or(0),
            err.summary(),
        )
    }

    /// Every row was persisted.
    pub fn succeeded(request_id: RequestId, started: Instant, total_rows: usize) -> Self {
        Self {
            request_id,
            status: OutcomeStatus::Success,
            total_rows,
            processed_rows: total_rows,
            duration_ms: elapsed_ms(started),
            error_count: 0,
            first_error_line: 0,
            message: "csv processed successfully".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
