//! Infrastructure layer: intake queue, ingestion worker, persistence, feedback delivery.

pub mod config;
pub mod feedback;
pub mod intake;
pub mod store;
