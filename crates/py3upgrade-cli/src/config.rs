use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use py3upgrade_core::UpgradeConfig;

/// Answers for the manual-install prompts given up front on the command line.
/// Each is validated like a typed answer; an invalid one falls back to prompting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ManualAnswers {
    pub(crate) venv: Option<PathBuf>,
    pub(crate) config_dir: Option<PathBuf>,
    pub(crate) stop_command: Option<String>,
    pub(crate) start_command: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum PluginFailurePolicy {
    /// Stop reinstalling at the first failed plugin.
    #[default]
    AbortOnFirst,
    /// Attempt every queued plugin and report all failures.
    KeepGoing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RunOptions {
    pub(crate) answers: ManualAnswers,
    pub(crate) auto_yes: bool,
    pub(crate) failure_policy: PluginFailurePolicy,
}

pub(crate) fn load_upgrade_config(path: Option<&Path>) -> Result<UpgradeConfig> {
    let Some(path) = path else {
        return Ok(UpgradeConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    UpgradeConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid config file: {}", path.display()))
}

pub(crate) fn apply_catalog_url_override(
    config: &mut UpgradeConfig,
    catalog_url: Option<String>,
) -> Result<()> {
    if let Some(url) = catalog_url {
        config.catalog_url = url;
        config
            .validate()
            .context("invalid --catalog-url override")?;
    }
    Ok(())
}
