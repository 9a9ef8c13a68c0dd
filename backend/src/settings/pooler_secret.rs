//! Settings for the pooler secret updater.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::{SettingsError, required};

#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "POOLER_SECRET")]
pub struct PoolerSecretSettings {
    /// Secret with the direct database credentials.
    pub source_secret_arn: Option<String>,
    /// Secret rewritten to point at the pooler.
    pub target_secret_arn: Option<String>,
    /// Port PgBouncer listens on, written into the target secret.
    #[ortho_config(default = 5432)]
    pub pooler_port: u16,
}

impl PoolerSecretSettings {
    pub fn source_secret_arn(&self) -> Result<&str, SettingsError> {
        required(
            self.source_secret_arn.as_deref(),
            "POOLER_SECRET_SOURCE_SECRET_ARN",
        )
    }

    pub fn target_secret_arn(&self) -> Result<&str, SettingsError> {
        required(
            self.target_secret_arn.as_deref(),
            "POOLER_SECRET_TARGET_SECRET_ARN",
        )
    }
}
