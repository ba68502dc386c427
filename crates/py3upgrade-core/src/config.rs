use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

/// Every fixed path, command, and name the upgrade relies on. Defaults match
/// a stock appliance image; a TOML file may override any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub app_module: String,
    pub app_package: String,
    pub appliance_marker: PathBuf,
    pub appliance_venv: PathBuf,
    pub appliance_config_base: PathBuf,
    pub appliance_stop_command: String,
    pub appliance_start_command: String,
    pub config_file_name: String,
    pub venv_interpreter: PathBuf,
    pub backup_excludes: Vec<String>,
    pub legacy_backup_dir: PathBuf,
    pub manifest_entry: String,
    pub catalog_url: String,
    pub retired_venv_suffix: String,
    pub virtualenv_program: String,
    pub new_interpreter: PathBuf,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            app_module: "octoprint".to_string(),
            app_package: "OctoPrint".to_string(),
            appliance_marker: PathBuf::from("/etc/octopi_version"),
            appliance_venv: PathBuf::from("/home/pi/oprint"),
            appliance_config_base: PathBuf::from("/home/pi/.octoprint"),
            appliance_stop_command: "sudo service octoprint stop".to_string(),
            appliance_start_command: "sudo service octoprint start".to_string(),
            config_file_name: "config.yaml".to_string(),
            venv_interpreter: PathBuf::from("bin/python"),
            backup_excludes: vec!["timelapse".to_string(), "uploads".to_string()],
            legacy_backup_dir: PathBuf::from("data/backup"),
            manifest_entry: "plugin_list.json".to_string(),
            catalog_url: "https://plugins.octoprint.org/plugins.json".to_string(),
            retired_venv_suffix: ".bak".to_string(),
            virtualenv_program: "virtualenv".to_string(),
            new_interpreter: PathBuf::from("/usr/bin/python3"),
        }
    }
}

impl UpgradeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse upgrade config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("app_module", self.app_module.as_str()),
            ("app_package", self.app_package.as_str()),
            ("appliance_stop_command", self.appliance_stop_command.as_str()),
            ("appliance_start_command", self.appliance_start_command.as_str()),
            ("config_file_name", self.config_file_name.as_str()),
            ("manifest_entry", self.manifest_entry.as_str()),
            ("catalog_url", self.catalog_url.as_str()),
            ("retired_venv_suffix", self.retired_venv_suffix.as_str()),
            ("virtualenv_program", self.virtualenv_program.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(anyhow!("config field '{field}' must not be empty"));
            }
        }

        if self.venv_interpreter.as_os_str().is_empty() {
            return Err(anyhow!("config field 'venv_interpreter' must not be empty"));
        }
        if self.venv_interpreter.is_absolute() {
            return Err(anyhow!(
                "config field 'venv_interpreter' must be relative to the virtual environment: {}",
                self.venv_interpreter.display()
            ));
        }
        if self.new_interpreter.as_os_str().is_empty() {
            return Err(anyhow!("config field 'new_interpreter' must not be empty"));
        }
        if !self.catalog_url.starts_with("http://") && !self.catalog_url.starts_with("https://") {
            return Err(anyhow!(
                "config field 'catalog_url' must be an http(s) URL: {}",
                self.catalog_url
            ));
        }

        Ok(())
    }
}
