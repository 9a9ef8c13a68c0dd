//! Settings for the item generator.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use std::time::Duration;

use super::{SettingsError, required};

/// Budget for one item command; the item-generation queue gives each
/// invocation 120 s.
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 110;

#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ITEM_GENERATOR")]
pub struct ItemGeneratorSettings {
    /// Topic receiving generated items for the loader.
    pub item_load_topic_arn: Option<String>,
    /// Seconds an item command may run before it is killed.
    #[ortho_config(default = 110)]
    pub command_timeout_secs: u64,
}

impl ItemGeneratorSettings {
    /// Per-command time budget. Zero falls back to the default.
    pub fn command_timeout(&self) -> Duration {
        let seconds = if self.command_timeout_secs == 0 {
            DEFAULT_COMMAND_TIMEOUT_SECS
        } else {
            self.command_timeout_secs
        };
        Duration::from_secs(seconds)
    }

    pub fn item_load_topic_arn(&self) -> Result<&str, SettingsError> {
        required(
            self.item_load_topic_arn.as_deref(),
            "ITEM_GENERATOR_ITEM_LOAD_TOPIC_ARN",
        )
    }
}
