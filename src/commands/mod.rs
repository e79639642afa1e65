pub mod export;
pub mod plan;

use crate::cli::ScopeArgs;
use crate::config::{InventorySettings, Settings};
use anyhow::Result;
use inventory::InventoryConfig;

impl From<ScopeArgs> for InventorySettings {
    fn from(scope: ScopeArgs) -> Self {
        Self {
            control_project: scope.control_project,
            target_project: scope.project,
            organization: scope.organization,
            bucket: scope.bucket,
        }
    }
}

/// Build the inventory configuration from the settings file, with flags on top.
pub fn resolve_config(settings: &Settings, scope: &ScopeArgs) -> Result<InventoryConfig> {
    let mut merged = settings.inventory.clone();
    merged.merge(InventorySettings::from(scope.clone()));
    Ok(InventoryConfig::new(merged.to_options())?)
}
