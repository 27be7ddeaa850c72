//! Openings domain module.
//!
//! Turns raw tabular uploads into validated job openings. Pure logic: no IO,
//! no HTTP, no storage. Validation fans out across threads but has no side effects.

pub mod batch;
pub mod opening;

pub use batch::{
    CsvBatchParser, DEFAULT_CHUNK_SIZE, DocumentError, EXPECTED_HEADER, ParsedBatch,
    validate_header,
};
pub use opening::{COLUMN_COUNT, FIRST_DATA_LINE, Opening, ParsedOpening, RowError, validate_row};
