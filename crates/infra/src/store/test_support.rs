//! Store doubles with scripted failures.

use std::sync::Arc;

use opportunities_openings::ParsedOpening;

use super::in_memory::{InMemoryOpeningStore, InMemoryTx};
use super::r#trait::{OpeningStore, StoreError};

/// Wraps the in-memory store and fails on demand.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: Arc<InMemoryOpeningStore>,
    pub fail_begin: bool,
    pub fail_insert_on_line: Option<usize>,
    pub fail_commit: bool,
}

impl FlakyStore {
    pub fn failing_insert_on(line_number: usize) -> Self {
        Self {
            fail_insert_on_line: Some(line_number),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl OpeningStore for FlakyStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        if self.fail_begin {
            return Err(StoreError::Connection("pool timed out".to_string()));
        }
        self.inner.begin().await
    }

    async fn insert_in_tx(
        &self,
        tx: &mut Self::Tx,
        opening: &ParsedOpening,
    ) -> Result<(), StoreError> {
        if self.fail_insert_on_line == Some(opening.line_number) {
            return Err(StoreError::Constraint("duplicate opening".to_string()));
        }
        self.inner.insert_in_tx(tx, opening).await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        if self.fail_commit {
            self.inner.rollback(tx).await;
            return Err(StoreError::Storage("commit refused".to_string()));
        }
        self.inner.commit(tx).await
    }

    async fn rollback(&self, tx: Self::Tx) {
        self.inner.rollback(tx).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }
}
