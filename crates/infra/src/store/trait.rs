use std::sync::Arc;

use thiserror::Error;

use opportunities_openings::ParsedOpening;

/// Store-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A row was refused by a schema constraint (unique, check, not-null).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The store could not be reached (pool closed/timed out, network).
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Transactional sink for openings.
///
/// The transaction handle is opaque to callers: it is created by [`begin`],
/// threaded through [`insert_in_tx`] by mutable reference, and consumed by
/// exactly one of [`commit`] or [`rollback`].
///
/// Implementations must guarantee that nothing inserted through a transaction is
/// visible to readers unless `commit` returns `Ok`. A failed `commit` leaves the
/// store as if the transaction never ran.
///
/// [`begin`]: OpeningStore::begin
/// [`insert_in_tx`]: OpeningStore::insert_in_tx
/// [`commit`]: OpeningStore::commit
/// [`rollback`]: OpeningStore::rollback
#[async_trait::async_trait]
pub trait OpeningStore: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn insert_in_tx(
        &self,
        tx: &mut Self::Tx,
        opening: &ParsedOpening,
    ) -> Result<(), StoreError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Discard everything staged in `tx`. Failures are logged, not returned.
    async fn rollback(&self, tx: Self::Tx);

    /// Number of persisted (non-deleted) openings.
    async fn count(&self) -> Result<u64, StoreError>;
}

#[async_trait::async_trait]
impl<S> OpeningStore for Arc<S>
where
    S: OpeningStore + ?Sized,
{
    type Tx = S::Tx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin().await
    }

    async fn insert_in_tx(
        &self,
        tx: &mut Self::Tx,
        opening: &ParsedOpening,
    ) -> Result<(), StoreError> {
        (**self).insert_in_tx(tx, opening).await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        (**self).commit(tx).await
    }

    async fn rollback(&self, tx: Self::Tx) {
        (**self).rollback(tx).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        (**self).count().await
    }
}
