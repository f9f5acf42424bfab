//! `PostgreSQL` repositories for Roomly.
//!
//! [`PostgresStore`] implements every repository trait of `roomly-core` over
//! one connection pool. The two store-side guarantees the engine relies on
//! are carried by the schema in `migrations/`:
//!
//! - slot exclusivity is the partial unique index
//!   `reservations_active_slot_key` over `(amenity_id, date, time_slot)`
//!   for non-cancelled rows
//! - state transitions are `UPDATE ... WHERE status = <expected> RETURNING`,
//!   so a lost race returns no row
//!
//! Point totals are bumped with `SET points = points + $2`, never
//! read-modify-written.
//!
//! # Example
//!
//! ```ignore
//! use roomly_postgres::PostgresStore;
//!
//! let store = PostgresStore::connect("postgres://localhost/roomly", 10).await?;
//! store.migrate().await?;
//! ```

mod amenities;
mod communities;
mod feed;
mod join_requests;
mod ledger;
mod reservations;
mod rows;
mod users;

use roomly_core::error::{StoreError, StoreResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Every Roomly repository over one `PostgreSQL` pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool of at most `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to run migrations: {e}")))?;
        Ok(())
    }
}

/// Map a `sqlx` failure to a [`StoreError`], keeping unique-violation
/// constraint names so callers can tell which rule fired.
pub(crate) fn store_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::NotFound;
            }
        }
        StoreError::Backend(format!("Failed to {context}: {e}"))
    }
}
