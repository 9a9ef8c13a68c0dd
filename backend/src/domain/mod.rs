//! Domain primitives, policies, and services.
//!
//! Purpose: keep the ingestion pipeline and database orchestration logic
//! independent of AWS and PostgreSQL. Services depend on the traits in
//! [`ports`]; adapters live under `outbound`.
//!
//! Public surface:
//! - Catalogue records: `StacItem`, `StacCollection`, `CatalogRecord`.
//! - Queue decoding: `SnsEnvelope`, `IngestionPayload`, `DedupedBatch`.
//! - Pipeline policy: `PipelineConfig`, `QueuePolicy`, `BatchWindow`.
//! - Services: `StacLoaderService`, `ItemGenerationService`,
//!   `PoolerHealthCheckService`, `SecretHostRewriteService`,
//!   `PoolerRollout`, `DatabaseBootstrapService`.
//! - `Error` and `ErrorCode` for service failures.

pub mod batch_dedup;
pub mod bootstrap;
pub mod credentials;
pub mod db_capacity;
pub mod error;
pub mod ingestion_message;
pub mod ingestion_pipeline;
pub mod item_generation;
pub mod polling;
pub mod pooler;
pub mod ports;
pub mod stac;
pub mod stac_loader;

pub use self::batch_dedup::{DedupedBatch, Delivered};
pub use self::bootstrap::{
    BootstrapReport, BootstrapRequest, DatabaseBootstrapService, quote_identifier, quote_literal,
};
pub use self::credentials::{CredentialsError, DatabaseCredentials};
pub use self::db_capacity::{
    DEFAULT_INSTANCE_TYPE, DatabaseParameterOverrides, DatabaseParameters, InstanceMemory,
    UnknownInstanceType, derive_database_parameters,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::ingestion_message::{IngestionPayload, MessageDecodeError, ObjectLocation, SnsEnvelope};
pub use self::ingestion_pipeline::{
    BatchTrigger, BatchWindow, Disposition, PipelineConfig, PipelineConfigError, QueuePolicy,
};
pub use self::item_generation::{GeneratedItem, ItemCommand, ItemGenerationService, ItemRequest};
pub use self::polling::{PollSleeper, TokioSleeper};
pub use self::pooler::{
    DatabaseDependencies, HealthCheckError, HealthCheckPolicy, HealthCheckReport, PoolMode,
    PoolerConfig, PoolerConfigError, PoolerHealthCheckService, PoolerOverrides, PoolerRollout,
    RolloutError, SecretHostRewriteService, SecretRewriteError,
};
pub use self::stac::{CatalogRecord, RecordError, StacCollection, StacItem};
pub use self::stac_loader::{FailureKind, RecordFailure, StacLoaderService};

/// Convenient service result alias.
///
/// # Examples
/// ```
/// use stac_backend::domain::{Error, ServiceResult};
///
/// fn load() -> ServiceResult<usize> {
///     Err(Error::service_unavailable("catalogue unreachable"))
/// }
/// assert!(load().is_err());
/// ```
pub type ServiceResult<T> = Result<T, Error>;
