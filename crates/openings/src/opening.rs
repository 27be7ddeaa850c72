use serde::{Deserialize, Serialize};

use opportunities_core::{DomainError, DomainResult};

/// Number of columns every data row must carry.
pub const COLUMN_COUNT: usize = 6;

/// Line number of the first data row (line 1 is the header).
pub const FIRST_DATA_LINE: usize = 2;

/// A job opening as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub role: String,
    pub company: String,
    pub location: String,
    pub remote: bool,
    pub link: String,
    pub salary: i64,
}

/// An opening that passed row validation, tagged with its source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOpening {
    pub line_number: usize,
    pub opening: Opening,
}

/// A data row that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub line_number: usize,
    pub message: String,
}

impl RowError {
    pub fn new(line_number: usize, message: impl Into<String>) -> Self {
        Self {
            line_number,
            message: message.into(),
        }
    }

    fn from_domain(line_number: usize, err: DomainError) -> Self {
        Self::new(line_number, err.to_string())
    }
}

/// Validate one data row into an opening.
///
/// Checks short-circuit in a fixed order: column count, then `role`, `company`,
/// `location`, `link` (non-empty after trimming), then `remote`, then `salary`.
/// Only the first failure is reported.
pub fn validate_row(line_number: usize, fields: &[&str]) -> Result<ParsedOpening, RowError> {
    if fields.len() != COLUMN_COUNT {
        return Err(RowError::new(
            line_number,
            format!(
                "invalid column count, expected {}, got {}",
                COLUMN_COUNT,
                fields.len()
            ),
        ));
    }

    build_opening(fields)
        .map(|opening| ParsedOpening {
            line_number,
            opening,
        })
        .map_err(|e| RowError::from_domain(line_number, e))
}

fn build_opening(fields: &[&str]) -> DomainResult<Opening> {
    let role = required(fields[0], "role")?;
    let company = required(fields[1], "company")?;
    let location = required(fields[2], "location")?;
    let link = required(fields[4], "link")?;
    let remote = parse_remote(fields[3])?;
    let salary = parse_salary(fields[5])?;

    Ok(Opening {
        role: role.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        remote,
        link: link.to_string(),
        salary,
    })
}

fn required<'a>(raw: &'a str, name: &str) -> DomainResult<&'a str> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{name} is required")));
    }
    Ok(value)
}

fn parse_remote(raw: &str) -> DomainResult<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(DomainError::validation("remote must be a boolean")),
    }
}

fn parse_salary(raw: &str) -> DomainResult<i64> {
    let salary: i64 = raw
        .trim()
        .parse()
        .map_err(|_| DomainError::validation("salary must be an integer"))?;

    if salary <= 0 {
        return Err(DomainError::validation("salary must be greater than zero"));
    }
    Ok(salary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(role: &'a str, remote: &'a str, salary: &'a str) -> [&'a str; 6] {
        [role, "Acme", "BR", remote, "https://acme.com", salary]
    }

    #[test]
    fn valid_row_is_trimmed_into_an_opening() {
        let parsed = validate_row(
            2,
            &["  Go Dev ", " Acme", "BR ", " true ", " https://acme.com ", " 1000 "],
        )
        .unwrap();

        assert_eq!(parsed.line_number, 2);
        assert_eq!(
            parsed.opening,
            Opening {
                role: "Go Dev".to_string(),
                company: "Acme".to_string(),
                location: "BR".to_string(),
                remote: true,
                link: "https://acme.com".to_string(),
                salary: 1000,
            }
        );
    }

    #[test]
    fn wrong_column_count_names_expected_and_actual() {
        let err = validate_row(7, &["Go Dev", "Acme", "BR", "true", "https://acme.com"]).unwrap_err();
        assert_eq!(err.line_number, 7);
        assert_eq!(err.message, "invalid column count, expected 6, got 5");
    }

    #[test]
    fn first_missing_text_field_wins() {
        let err = validate_row(3, &[" ", "", "BR", "nope", "", "-1"]).unwrap_err();
        assert_eq!(err.message, "role is required");

        let err = validate_row(3, &["Dev", "", "", "true", "", "1"]).unwrap_err();
        assert_eq!(err.message, "company is required");

        let err = validate_row(3, &["Dev", "Acme", "\t", "true", "", "1"]).unwrap_err();
        assert_eq!(err.message, "location is required");
    }

    #[test]
    fn link_is_checked_before_remote_and_salary() {
        let err = validate_row(4, &["Dev", "Acme", "BR", "maybe", "  ", "zero"]).unwrap_err();
        assert_eq!(err.message, "link is required");
    }

    #[test]
    fn remote_accepts_boolean_literals_only() {
        for literal in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(validate_row(2, &row("Dev", literal, "10")).unwrap().opening.remote);
        }
        for literal in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!validate_row(2, &row("Dev", literal, "10")).unwrap().opening.remote);
        }
        for literal in ["yes", "tRuE", "2", ""] {
            let err = validate_row(2, &row("Dev", literal, "10")).unwrap_err();
            assert_eq!(err.message, "remote must be a boolean");
        }
    }

    #[test]
    fn remote_is_checked_before_salary() {
        let err = validate_row(2, &row("Dev", "nah", "abc")).unwrap_err();
        assert_eq!(err.message, "remote must be a boolean");
    }

    #[test]
    fn salary_must_be_a_base10_integer() {
        for raw in ["abc", "10.5", "1e3", "", "99999999999999999999"] {
            let err = validate_row(2, &row("Dev", "true", raw)).unwrap_err();
            assert_eq!(err.message, "salary must be an integer", "input {raw:?}");
        }
    }

    #[test]
    fn salary_must_be_positive() {
        for raw in ["0", "-5", " -1 "] {
            let err = validate_row(2, &row("Dev", "true", raw)).unwrap_err();
            assert_eq!(err.message, "salary must be greater than zero");
        }
        assert_eq!(validate_row(2, &row("Dev", "true", "+7")).unwrap().opening.salary, 7);
    }
}
