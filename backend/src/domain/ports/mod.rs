//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports describe what the domain needs from storage, the message
//! bus, the secret store, and the pooler host. Each exposes a strongly typed
//! error so adapters map their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod catalog_repository;
mod database_bootstrapper;
mod deployment_status_reporter;
mod item_command_runner;
mod object_store;
mod pgstac_migrator;
mod pooler_host_control;
mod record_publisher;
mod secret_store;
mod stac_batch_loader;

#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
pub use catalog_repository::{
    CatalogRepository, CatalogRepositoryError, FixtureCatalogRepository,
};
#[cfg(test)]
pub use database_bootstrapper::MockDatabaseBootstrapper;
pub use database_bootstrapper::{DatabaseBootstrapper, DatabaseBootstrapperError};
#[cfg(test)]
pub use deployment_status_reporter::MockDeploymentStatusReporter;
pub use deployment_status_reporter::{
    DeploymentReport, DeploymentStatus, DeploymentStatusReporter, DeploymentStatusReporterError,
};
#[cfg(test)]
pub use item_command_runner::MockItemCommandRunner;
pub use item_command_runner::{ItemCommandRunner, ItemCommandRunnerError};
#[cfg(test)]
pub use object_store::MockObjectStore;
pub use object_store::{FixtureObjectStore, ObjectStore, ObjectStoreError};
#[cfg(test)]
pub use pgstac_migrator::MockPgstacMigrator;
pub use pgstac_migrator::{PgstacMigrator, PgstacMigratorError};
#[cfg(test)]
pub use pooler_host_control::MockPoolerHostControl;
pub use pooler_host_control::{
    CommandInvocation, CommandStatus, PingStatus, PoolerHostControl, PoolerHostControlError,
};
#[cfg(test)]
pub use record_publisher::MockRecordPublisher;
pub use record_publisher::{
    FixtureRecordPublisher, PublishReceipt, RecordPublisher, RecordPublisherError,
};
#[cfg(test)]
pub use secret_store::MockSecretStore;
pub use secret_store::{SecretStore, SecretStoreError};
#[cfg(test)]
pub use stac_batch_loader::MockStacBatchLoader;
pub use stac_batch_loader::{
    BatchLoadReport, BatchRecord, FixtureStacBatchLoader, LoadOptions, StacBatchLoader,
};

#[cfg(test)]
mod tests;
