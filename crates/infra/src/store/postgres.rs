//! Postgres-backed opening store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Constraint` |
//! | Database (not-null violation) | `23502` | `Constraint` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (other) | Any other | `Storage` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Connection` |
//! | Other | N/A | `Storage` |

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, warn};

use opportunities_openings::ParsedOpening;

use super::r#trait::{OpeningStore, StoreError};

/// Postgres-backed store.
///
/// Each ingestion batch runs in one `sqlx::Transaction`. Dropping a transaction
/// that was neither committed nor rolled back rolls it back, so a failed commit
/// never leaves partial rows behind.
#[derive(Debug, Clone)]
pub struct PostgresOpeningStore {
    pool: Arc<PgPool>,
}

impl PostgresOpeningStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `openings` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS openings (
                id          BIGSERIAL PRIMARY KEY,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                deleted_at  TIMESTAMPTZ NULL,
                role        TEXT NOT NULL,
                company     TEXT NOT NULL,
                location    TEXT NOT NULL,
                remote      BOOLEAN NOT NULL,
                link        TEXT NOT NULL,
                salary      BIGINT NOT NULL CHECK (salary > 0)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl OpeningStore for PostgresOpeningStore {
    type Tx = Transaction<'static, Postgres>;

    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    #[instrument(skip(self, tx, opening), fields(line_number = opening.line_number), err)]
    async fn insert_in_tx(
        &self,
        tx: &mut Self::Tx,
        opening: &ParsedOpening,
    ) -> Result<(), StoreError> {
        let o = &opening.opening;
        sqlx::query(
            r#"
            INSERT INTO openings (role, company, location, remote, link, salary)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&o.role)
        .bind(&o.company)
        .bind(&o.location)
        .bind(o.remote)
        .bind(&o.link)
        .bind(o.salary)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_opening", e))?;

        Ok(())
    }

    #[instrument(skip(self, tx), err)]
    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError> {
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(&self, tx: Self::Tx) {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "rollback failed; connection will be discarded");
        }
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM openings WHERE deleted_at IS NULL")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_openings", e))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| StoreError::Storage(format!("failed to read count: {}", e)))?;
        Ok(total.max(0) as u64)
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23502") | Some("23514") => StoreError::Constraint(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Connection(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Connection(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Connection(format!("io error in {}: {}", operation, e)),
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
