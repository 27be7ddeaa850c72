//! In-memory opening store for tests/dev.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use opportunities_openings::{Opening, ParsedOpening};

use super::r#trait::{OpeningStore, StoreError};

/// A persisted opening with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOpening {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub opening: Opening,
}

/// Staged writes of one in-memory transaction.
#[derive(Debug, Default)]
pub struct InMemoryTx {
    staged: Vec<Opening>,
}

impl InMemoryTx {
    #[cfg(test)]
    fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredOpening>,
    next_id: i64,
}

/// In-memory store.
///
/// - No IO
/// - Inserts are staged in the transaction and appended under one write lock on commit
#[derive(Debug, Default)]
pub struct InMemoryOpeningStore {
    inner: RwLock<Inner>,
}

impl InMemoryOpeningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of every committed opening, in commit order.
    pub fn all(&self) -> Vec<StoredOpening> {
        self.inner
            .read()
            .map(|inner| inner.rows.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl OpeningStore for InMemoryOpeningStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTx::default())
    }

    async fn insert_in_tx(
        &self,
        tx: &mut Self::Tx,
        opening: &ParsedOpening,
    ) -> Result<(), StoreError> {
        tx.staged.push(opening.opening.clone());
        Ok(())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Storage("store lock poisoned".to_string()))?;

        let now = Utc::now();
        for opening in tx.staged {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.rows.push(StoredOpening {
                id,
                created_at: now,
                opening,
            });
        }
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) {
        drop(tx);
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line_number: usize, role: &str) -> ParsedOpening {
        ParsedOpening {
            line_number,
            opening: Opening {
                role: role.to_string(),
                company: "Acme".to_string(),
                location: "BR".to_string(),
                remote: true,
                link: "https://acme.com".to_string(),
                salary: 1000,
            },
        }
    }

    #[tokio::test]
    async fn staged_rows_are_invisible_until_commit() {
        let store = InMemoryOpeningStore::new();
        let mut tx = store.begin().await.unwrap();
        store.insert_in_tx(&mut tx, &parsed(2, "a")).await.unwrap();
        store.insert_in_tx(&mut tx, &parsed(3, "b")).await.unwrap();

        assert_eq!(tx.staged_len(), 2);
        assert!(store.is_empty());

        store.commit(tx).await.unwrap();
        let rows = store.all();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].opening.role, "b");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rollback_discards_staged_rows() {
        let store = InMemoryOpeningStore::new();
        let mut tx = store.begin().await.unwrap();
        store.insert_in_tx(&mut tx, &parsed(2, "a")).await.unwrap();
        store.rollback(tx).await;

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn ids_keep_increasing_across_transactions() {
        let store = Arc::new(InMemoryOpeningStore::new());
        for role in ["a", "b"] {
            let mut tx = store.begin().await.unwrap();
            store.insert_in_tx(&mut tx, &parsed(2, role)).await.unwrap();
            store.commit(tx).await.unwrap();
        }

        let ids: Vec<i64> = store.all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
