//! `opportunities-core`: shared primitives for the openings ingestion service.
//!
//! This crate contains **pure** building blocks (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::RequestId;
