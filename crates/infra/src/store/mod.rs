//! Persistence of validated openings behind a narrow transactional contract.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryOpeningStore, InMemoryTx, StoredOpening};
pub use postgres::PostgresOpeningStore;
pub use r#trait::{OpeningStore, StoreError};

#[cfg(test)]
pub(crate) mod test_support;
