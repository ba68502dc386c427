use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One entry of the plugin manifest stored inside a backup archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub name: String,
    pub key: String,
}

/// Plugins that were installed before the upgrade, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginInventory {
    plugins: Vec<PluginRecord>,
}

impl PluginInventory {
    pub fn new(plugins: Vec<PluginRecord>) -> Self {
        Self { plugins }
    }

    pub fn from_manifest_json(input: &str) -> Result<Self> {
        let plugins: Vec<PluginRecord> =
            serde_json::from_str(input).context("failed to parse plugin manifest")?;
        Ok(Self { plugins })
    }

    pub fn plugins(&self) -> &[PluginRecord] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }
}
