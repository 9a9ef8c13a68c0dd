//! PostgreSQL adapters using Diesel with async support.
//!
//! The catalogue itself is owned by pgstac: tables, partitions and upsert
//! semantics live in the `pgstac` schema and are reached through its SQL
//! functions. These adapters only translate between domain records and
//! `jsonb` arguments, and map Diesel errors to domain port errors.
//!
//! # Example
//!
//! ```no_run
//! use stac_backend::outbound::persistence::{DbPool, DieselCatalogRepository, PoolConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoolConfig::new("postgres://loader@pooler:5432/postgis");
//! let pool = DbPool::new(config).await?;
//! let repository = DieselCatalogRepository::new(pool);
//! # let _ = repository;
//! # Ok(())
//! # }
//! ```

mod diesel_catalog_repository;
mod diesel_database_bootstrapper;
pub(crate) mod diesel_helpers;
mod pool;

pub use diesel_catalog_repository::DieselCatalogRepository;
pub use diesel_database_bootstrapper::DieselDatabaseBootstrapper;
pub use pool::{DbPool, PoolConfig, PoolError};
