//! Error mapping shared by the Diesel catalogue adapters.

use tracing::{debug, warn};

use crate::domain::ports::CatalogRepositoryError;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn map_pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug context.
pub fn map_diesel_error_message(error: diesel::result::Error, operation: &str) -> String {
    let error_message = error.to_string();
    debug!(%error_message, %operation, "diesel operation failed");
    error_message
}

/// Map pool errors to catalogue connection errors.
pub fn map_pool_error(error: PoolError) -> CatalogRepositoryError {
    CatalogRepositoryError::connection(map_pool_error_message(error))
}

/// pgstac reports an unknown collection either as a foreign key violation on
/// the items table or as a missing partition.
fn references_missing_collection(message: &str, constraint_name: Option<&str>) -> bool {
    let lower = message.to_lowercase();
    let constraint = constraint_name.map(str::to_lowercase);
    constraint
        .as_deref()
        .is_some_and(|name| name.contains("collection"))
        || lower.contains("no partition of relation")
        || (lower.contains("collection") && lower.contains("does not exist"))
}

/// Map Diesel errors raised while writing items of `collection_id`.
pub fn map_item_write_error(
    error: diesel::result::Error,
    collection_id: &str,
) -> CatalogRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    if let DieselError::DatabaseError(kind, info) = &error {
        let fk_violation = matches!(kind, DatabaseErrorKind::ForeignKeyViolation);
        if fk_violation || references_missing_collection(info.message(), info.constraint_name()) {
            if !fk_violation {
                debug!(message = info.message(), "treating missing partition as missing collection");
            } else if info.constraint_name().is_none() {
                warn!(
                    message = info.message(),
                    "foreign key violation without constraint name while writing items"
                );
            }
            return CatalogRepositoryError::missing_collection(collection_id);
        }
    }
    map_diesel_error(error, "upsert items")
}

/// Map Diesel errors to catalogue repository errors.
pub fn map_diesel_error(error: diesel::result::Error, operation: &str) -> CatalogRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            debug!(message = info.message(), %operation, "catalogue connection closed");
            CatalogRepositoryError::connection("database connection error")
        }
        other => CatalogRepositoryError::query(map_diesel_error_message(other, operation)),
    }
}
