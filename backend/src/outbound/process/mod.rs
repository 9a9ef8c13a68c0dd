//! Adapters that shell out to Python tooling.

mod pypgstac_migrator;
mod uvx_item_command_runner;

pub use pypgstac_migrator::PypgstacMigrator;
pub use uvx_item_command_runner::UvxItemCommandRunner;
