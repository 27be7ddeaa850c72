//! Whole-document parsing: header contract, chunked parallel row validation.

use csv::{ReaderBuilder, StringRecord};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::opening::{FIRST_DATA_LINE, ParsedOpening, RowError, validate_row};

/// Column names every upload must start with, compared case-insensitively after trimming.
pub const EXPECTED_HEADER: [&str; 6] = ["role", "company", "location", "remote", "link", "salary"];

/// Rows validated together before moving on to the next chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Failure that prevents any row-level processing of a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("invalid csv format: {0}")]
    Malformed(String),

    #[error("csv file is empty")]
    Empty,

    #[error("invalid csv header. expected [role company location remote link salary]")]
    InvalidHeader,
}

/// Result of validating every data row of a well-formed document.
///
/// Both sequences are in ascending line-number order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    pub openings: Vec<ParsedOpening>,
    pub row_errors: Vec<RowError>,
}

impl ParsedBatch {
    /// Number of data rows seen (valid + invalid).
    pub fn total_rows(&self) -> usize {
        self.openings.len() + self.row_errors.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.row_errors.is_empty()
    }

    /// Smallest line number among the row errors, if any.
    pub fn first_error_line(&self) -> Option<usize> {
        self.row_errors.iter().map(|e| e.line_number).min()
    }
}

/// Check only the header row of a document.
///
/// Used at the intake boundary to reject malformed uploads before they are queued.
pub fn validate_header(content: &[u8]) -> Result<(), DocumentError> {
    let mut reader = reader_for(content);
    let mut header = StringRecord::new();
    let found = reader
        .read_record(&mut header)
        .map_err(|e| DocumentError::Malformed(e.to_string()))?;

    if !found {
        return Err(DocumentError::Empty);
    }
    check_header(&header)
}

/// Parses uploads and validates their rows in parallel, one chunk at a time.
#[derive(Debug, Clone)]
pub struct CsvBatchParser {
    chunk_size: usize,
}

impl Default for CsvBatchParser {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl CsvBatchParser {
    /// A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Parse a whole document.
    ///
    /// Document-level problems (untokenizable text, no rows, wrong header) fail the
    /// whole call. Row problems are collected into [`ParsedBatch::row_errors`].
    pub fn parse(&self, content: &[u8]) -> Result<ParsedBatch, DocumentError> {
        let mut records = Vec::new();
        for record in reader_for(content).records() {
            records.push(record.map_err(|e| DocumentError::Malformed(e.to_string()))?);
        }

        let Some((header, rows)) = records.split_first() else {
            return Err(DocumentError::Empty);
        };
        check_header(header)?;

        let mut batch = ParsedBatch {
            openings: Vec::with_capacity(rows.len()),
            row_errors: Vec::new(),
        };

        for (chunk_index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            let first_line = FIRST_DATA_LINE + chunk_index * self.chunk_size;

            // Indexed collect: each result lands in its row's slot, whatever the
            // completion order. The chunk is fully validated before the next starts.
            let results: Vec<Result<ParsedOpening, RowError>> = chunk
                .par_iter()
                .enumerate()
                .map(|(offset, record)| {
                    let fields: Vec<&str> = record.iter().collect();
                    validate_row(first_line + offset, &fields)
                })
                .collect();

            for result in results {
                match result {
                    Ok(parsed) => batch.openings.push(parsed),
                    Err(row_error) => batch.row_errors.push(row_error),
                }
            }

            debug!(
                chunk = chunk_index,
                rows = chunk.len(),
                first_line,
                "validated csv chunk"
            );
        }

        Ok(batch)
    }
}

fn reader_for(content: &[u8]) -> csv::Reader<&[u8]> {
    // Flexible: a short or long data row is a row error, not a document error.
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content)
}

fn check_header(header: &StringRecord) -> Result<(), DocumentError> {
    if header.len() != EXPECTED_HEADER.len() {
        return Err(DocumentError::InvalidHeader);
    }

    let matches = header
        .iter()
        .zip(EXPECTED_HEADER)
        .all(|(got, want)| got.trim().eq_ignore_ascii_case(want));

    if matches {
        Ok(())
    } else {
        Err(DocumentError::InvalidHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HEADER: &str = "role,company,location,remote,link,salary\n";

    fn doc(rows: &[&str]) -> Vec<u8> {
        let mut out = HEADER.to_string();
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out.into_bytes()
    }

    #[test]
    fn single_valid_row_parses_at_line_two() {
        let content = doc(&["Go Dev,Acme,BR,true,https://acme.com,1000"]);
        let batch = CsvBatchParser::default().parse(&content).unwrap();

        assert_eq!(batch.openings.len(), 1);
        assert!(batch.row_errors.is_empty());
        assert_eq!(batch.openings[0].line_number, 2);
        assert_eq!(batch.openings[0].opening.role, "Go Dev");
        assert_eq!(batch.openings[0].opening.salary, 1000);
    }

    #[test]
    fn zero_salary_is_a_row_error_at_line_two() {
        let content = doc(&["Go Dev,Acme,BR,true,https://acme.com,0"]);
        let batch = CsvBatchParser::default().parse(&content).unwrap();

        assert!(batch.openings.is_empty());
        assert_eq!(batch.row_errors, vec![RowError::new(2, "salary must be greater than zero")]);
        assert_eq!(batch.first_error_line(), Some(2));
    }

    #[test]
    fn header_without_data_rows_is_an_empty_success() {
        let batch = CsvBatchParser::default().parse(HEADER.as_bytes()).unwrap();
        assert_eq!(batch, ParsedBatch::default());
        assert_eq!(batch.total_rows(), 0);
    }

    #[test]
    fn empty_document_is_a_document_error() {
        assert_eq!(CsvBatchParser::default().parse(b""), Err(DocumentError::Empty));
        assert_eq!(validate_header(b""), Err(DocumentError::Empty));
    }

    #[test]
    fn invalid_utf8_is_a_document_error() {
        let content = b"role,company,location,remote,link,salary\nDev,\xff\xfe,BR,true,x,1\n";
        let err = CsvBatchParser::default().parse(content).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed(_)));
        assert!(err.to_string().starts_with("invalid csv format: "));
    }

    #[test]
    fn header_variants_are_rejected_with_the_same_error() {
        let bad_headers = [
            "role,company,location,link,salary\n",
            "company,role,location,remote,link,salary\n",
            "role,company,location,remote,link,salary,extra\n",
            "role,company,place,remote,link,salary\n",
        ];
        for header in bad_headers {
            assert_eq!(
                CsvBatchParser::default().parse(header.as_bytes()),
                Err(DocumentError::InvalidHeader),
                "header {header:?}"
            );
            assert_eq!(validate_header(header.as_bytes()), Err(DocumentError::InvalidHeader));
        }
    }

    #[test]
    fn header_matches_case_insensitively_after_trimming() {
        let content = b" ROLE , Company,LOCATION ,remote,Link, SALARY\n";
        assert_eq!(validate_header(content), Ok(()));
        assert!(CsvBatchParser::default().parse(content).is_ok());
    }

    #[test]
    fn validate_header_ignores_bad_data_rows() {
        let content = doc(&["only,two"]);
        assert_eq!(validate_header(&content), Ok(()));
    }

    #[test]
    fn ragged_rows_become_row_errors() {
        let content = doc(&[
            "Dev,Acme,BR,true,https://acme.com,10",
            "Dev,Acme,BR,true",
            "Dev,Acme,BR,true,https://acme.com,10,extra",
        ]);
        let batch = CsvBatchParser::default().parse(&content).unwrap();

        assert_eq!(batch.openings.len(), 1);
        assert_eq!(
            batch.row_errors,
            vec![
                RowError::new(3, "invalid column count, expected 6, got 4"),
                RowError::new(4, "invalid column count, expected 6, got 7"),
            ]
        );
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let content = doc(&["\"Dev, Senior\",Acme,\"São Paulo, BR\",false,https://acme.com,5"]);
        let batch = CsvBatchParser::default().parse(&content).unwrap();
        assert_eq!(batch.openings[0].opening.role, "Dev, Senior");
        assert_eq!(batch.openings[0].opening.location, "São Paulo, BR");
    }

    #[test]
    fn line_numbers_are_continuous_across_chunks() {
        let rows: Vec<String> = (0..25)
            .map(|i| {
                if i % 7 == 3 {
                    "Dev,Acme,BR,true,https://acme.com,0".to_string()
                } else {
                    format!("Dev {i},Acme,BR,true,https://acme.com,{}", i + 1)
                }
            })
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let content = doc(&refs);

        let batch = CsvBatchParser::new(4).parse(&content).unwrap();

        let error_lines: Vec<usize> = batch.row_errors.iter().map(|e| e.line_number).collect();
        assert_eq!(error_lines, vec![5, 12, 19, 26]);
        let ok_lines: Vec<usize> = batch.openings.iter().map(|p| p.line_number).collect();
        assert_eq!(ok_lines.len(), 21);
        assert!(ok_lines.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(batch.openings[0].opening.role, "Dev 0");
        assert_eq!(batch.openings.last().unwrap().opening.role, "Dev 23");
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        assert_eq!(CsvBatchParser::new(0).chunk_size(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: error count, first error line and ordering do not depend on
        /// chunk size or scheduling.
        #[test]
        fn results_are_ordered_and_counted(
            validity in prop::collection::vec(any::<bool>(), 0..250),
            chunk_size in 1usize..130,
        ) {
            let rows: Vec<String> = validity
                .iter()
                .enumerate()
                .map(|(i, ok)| {
                    let salary = if *ok { i as i64 + 1 } else { 0 };
                    format!("Role {i},Acme,BR,false,https://acme.com/{i},{salary}")
                })
                .collect();
            let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
            let content = doc(&refs);

            let batch = CsvBatchParser::new(chunk_size).parse(&content).unwrap();

            let invalid: Vec<usize> = validity
                .iter()
                .enumerate()
                .filter(|(_, ok)| !**ok)
                .map(|(i, _)| i + FIRST_DATA_LINE)
                .collect();

            prop_assert_eq!(batch.total_rows(), validity.len());
            prop_assert_eq!(batch.row_errors.len(), invalid.len());
            prop_assert_eq!(batch.first_error_line(), invalid.first().copied());
            let error_lines: Vec<usize> = batch.row_errors.iter().map(|e| e.line_number).collect();
            prop_assert_eq!(error_lines, invalid);
            for parsed in &batch.openings {
                prop_assert_eq!(
                    &parsed.opening.role,
                    &format!("Role {}", parsed.line_number - FIRST_DATA_LINE)
                );
            }
        }
    }
}
