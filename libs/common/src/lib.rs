//! Common library for the attendance and payroll services
//!
//! This crate holds what the `auth` and `api` services share: the domain
//! models, the [`store::Store`] persistence boundary with its PostgreSQL and
//! in-memory implementations, database configuration and migrations, and the
//! decimal helpers used for money.

pub mod database;
pub mod error;
pub mod models;
pub mod money;
pub mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use store::{DynStore, MemoryStore, PgStore, Store};

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, run_migrations};
/// use common::{PgStore, Store};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     let store = PgStore::new(pool);
///     println!("Database health check: {}", store.health_check().await?);
///     Ok(())
/// }
/// ```
#[cfg(doctest)]
pub struct ExampleUsage;
