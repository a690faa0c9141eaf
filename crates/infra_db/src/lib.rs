//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for trips, members, expenses, splits and
//! settlements, using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: `repositories` holds plain
//! query functions over a `&mut PgConnection`, and `adapters` implements
//! the domain ports on top of them. Expense writes and the settlement
//! recalculation that follows them share one database transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/trip_ledger")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PgLedgerTransaction, PostgresLedgerStore};
pub use error::{db_to_port_error, DatabaseError};
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
