//! Settings for the catalogue loader.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::{SettingsError, required};
use crate::domain::ports::LoadOptions;

const DEFAULT_POOL_MAX_SIZE: u32 = 2;

#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STAC_LOADER")]
pub struct LoaderSettings {
    /// Secret holding the pgstac connection credentials.
    pub pgstac_secret_arn: Option<String>,
    /// Create placeholder collections for items whose collection is absent.
    #[ortho_config(default = false)]
    pub create_collections_if_missing: bool,
    /// Upper bound on pooled connections per invocation environment.
    pub pool_max_size: Option<u32>,
}

impl LoaderSettings {
    pub fn pgstac_secret_arn(&self) -> Result<&str, SettingsError> {
        required(
            self.pgstac_secret_arn.as_deref(),
            "STAC_LOADER_PGSTAC_SECRET_ARN",
        )
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            create_collections_if_missing: self.create_collections_if_missing,
        }
    }
}
