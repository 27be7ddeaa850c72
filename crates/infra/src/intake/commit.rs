//! All-or-nothing persistence of a validated batch.

use thiserror::Error;
use tracing::{debug, error, info, instrument};

use opportunities_openings::ParsedOpening;

use crate::store::{OpeningStore, StoreError};

/// Why a batch was not persisted. In every case nothing from the batch is visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] StoreError),

    #[error("failed to insert line {line_number}: {source}")]
    Insert {
        line_number: usize,
        #[source]
        source: StoreError,
    },

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] StoreError),
}

impl CommitError {
    /// Source line of the opening whose insert failed.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            CommitError::Insert { line_number, .. } => Some(*line_number),
            _ => None,
        }
    }

    /// Short message without the store detail.
    pub fn summary(&self) -> String {
        match self {
            CommitError::Begin(_) => "failed to begin transaction".to_string(),
            CommitError::Insert { line_number, .. } => format!("failed to insert line {line_number}"),
            CommitError::Commit(_) => "failed to commit transaction".to_string(),
        }
    }
}

/// Persist every opening in one transaction, in line order.
///
/// An empty batch is a no-op and opens no transaction. On the first failing
/// insert the transaction is rolled back and the remaining openings are skipped.
#[instrument(skip_all, fields(rows = openings.len()))]
pub async fn commit_batch<S>(store: &S, openings: &[ParsedOpening]) -> Result<usize, CommitError>
where
    S: OpeningStore + ?Sized,
{
    if openings.is_empty() {
        debug!("empty batch; skipping transaction");
        return Ok(0);
    }

    let mut tx = store.begin().await.map_err(|e| {
        error!(error = %e, "failed to begin transaction");
        CommitError::Begin(e)
    })?;

    for parsed in openings {
        if let Err(e) = store.insert_in_tx(&mut tx, parsed).await {
            error!(line_number = parsed.line_number, error = %e, "insert failed");
            store.rollback(tx).await;
            info!(transaction_rolled_back = true, "batch rolled back");
            return Err(CommitError::Insert {
                line_number: parsed.line_number,
                source: e,
            });
        }
    }

    store.commit(tx).await.map_err(|e| {
        error!(error = %e, "failed to commit transaction");
        CommitError::Commit(e)
    })?;

    info!(rows = openings.len(), "batch committed");
    Ok(openings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryOpeningStore;
    use crate::store::test_support::FlakyStore;
    use opportunities_openings::Opening;

    fn batch(lines: std::ops::RangeInclusive<usize>) -> Vec<ParsedOpening> {
        lines
            .map(|line_number| ParsedOpening {
                line_number,
                opening: Opening {
                    role: format!("Role {line_number}"),
                    company: "Acme".to_string(),
                    location: "BR".to_string(),
                    remote: false,
                    link: "https://acme.com".to_string(),
                    salary: 100,
                },
            })
            .collect()
    }

    #[tokio::test]
    async fn commits_every_opening_in_line_order() {
        let store = InMemoryOpeningStore::new();
        let written = commit_batch(&store, &batch(2..=5)).await.unwrap();

        assert_eq!(written, 4);
        let roles: Vec<String> = store.all().into_iter().map(|r| r.opening.role).collect();
        assert_eq!(roles, vec!["Role 2", "Role 3", "Role 4", "Role 5"]);
    }

    #[tokio::test]
    async fn empty_batch_opens_no_transaction() {
        let store = FlakyStore {
            fail_begin: true,
            ..FlakyStore::default()
        };
        assert_eq!(commit_batch(&store, &[]).await, Ok(0));
    }

    #[tokio::test]
    async fn failing_insert_rolls_back_the_whole_batch() {
        let store = FlakyStore::failing_insert_on(4);
        let err = commit_batch(&store, &batch(2..=6)).await.unwrap_err();

        assert_eq!(err.line_number(), Some(4));
        assert_eq!(err.summary(), "failed to insert line 4");
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn begin_failure_is_reported_without_a_line() {
        let store = FlakyStore {
            fail_begin: true,
            ..FlakyStore::default()
        };
        let err = commit_batch(&store, &batch(2..=3)).await.unwrap_err();

        assert!(matches!(err, CommitError::Begin(StoreError::Connection(_))));
        assert_eq!(err.line_number(), None);
        assert_eq!(err.summary(), "failed to begin transaction");
    }

    #[tokio::test]
    async fn commit_failure_leaves_nothing_behind() {
        let store = FlakyStore {
            fail_commit: true,
            ..FlakyStore::default()
        };
        let err = commit_batch(&store, &batch(2..=3)).await.unwrap_err();

        assert_eq!(err.summary(), "failed to commit transaction");
        assert!(store.inner.is_empty());
    }
}
