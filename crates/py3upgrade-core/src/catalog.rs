use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::inventory::{PluginInventory, PluginRecord};

/// A record of the remote plugin repository. Only the fields the upgrade
/// needs are kept; everything else in the listing is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub archive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPlugin {
    pub key: String,
    pub name: String,
    pub archive: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginMatchPlan {
    /// Catalog order.
    pub queued: Vec<QueuedPlugin>,
    /// Inventory order.
    pub unmatched: Vec<PluginRecord>,
}

pub fn parse_catalog_json(input: &str) -> Result<Vec<CatalogEntry>> {
    serde_json::from_str(input).context("failed to parse plugin catalog")
}

/// Walks the catalog in order and consumes the first pending inventory entry
/// whose key equals the catalog id. Entries without an archive reference are
/// not installable and never consume a key.
pub fn match_inventory(inventory: &PluginInventory, catalog: &[CatalogEntry]) -> PluginMatchPlan {
    let mut pending = inventory.plugins().iter().collect::<Vec<_>>();
    let mut queued = Vec::new();

    for entry in catalog {
        let Some(archive) = entry.archive.as_deref().filter(|value| !value.trim().is_empty())
        else {
            continue;
        };
        let Some(position) = pending.iter().position(|plugin| plugin.key == entry.id) else {
            continue;
        };

        let plugin = pending.remove(position);
        queued.push(QueuedPlugin {
            key: plugin.key.clone(),
            name: plugin.name.clone(),
            archive: archive.to_string(),
        });
    }

    PluginMatchPlan {
        queued,
        unmatched: pending.into_iter().cloned().collect(),
    }
}
