mod backup;
mod catalog;
mod config;
mod context;
mod inventory;
mod version;

pub use backup::{parse_backup_location, BackupLocation};
pub use catalog::{match_inventory, parse_catalog_json, CatalogEntry, PluginMatchPlan, QueuedPlugin};
pub use config::UpgradeConfig;
pub use context::{InstallKind, InstallationContext, ServiceCommands};
pub use inventory::{PluginInventory, PluginRecord};
pub use version::{parse_reported_version, parse_version_triple, VersionGate};

#[cfg(test)]
mod tests;
