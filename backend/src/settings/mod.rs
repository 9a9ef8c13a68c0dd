//! Environment-driven settings for each Lambda, loaded via OrthoConfig.
//!
//! Every struct is resolved once at cold start. Required values are
//! `Option` fields checked by accessors so a missing variable surfaces as a
//! [`SettingsError`] naming the variable instead of an opaque parse failure.

mod health_check;
mod item_generator;
mod loader;
mod pooler_secret;

pub use health_check::HealthCheckSettings;
pub use item_generator::ItemGeneratorSettings;
pub use loader::LoaderSettings;
pub use pooler_secret::PoolerSecretSettings;

/// Settings validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required variable is unset or blank.
    #[error("{variable} must be set")]
    Missing { variable: &'static str },
}

fn required<'a>(value: Option<&'a str>, variable: &'static str) -> Result<&'a str, SettingsError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SettingsError::Missing { variable })
}
