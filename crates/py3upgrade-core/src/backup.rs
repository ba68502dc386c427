use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use crate::version::VersionGate;

const LOCATED_PATTERN: &str = r"Backup located at (.*)\.zip";
const CREATED_PATTERN: &str = r"(?m)Creating backup at (.+?)(?:\.zip)?\s*$";

/// Location of the backup archive, kept without its `.zip` extension the way
/// the application reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLocation {
    stem: PathBuf,
}

impl BackupLocation {
    pub fn from_stem(stem: impl Into<PathBuf>) -> Self {
        Self { stem: stem.into() }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    pub fn archive_path(&self) -> PathBuf {
        let mut raw = OsString::from(self.stem.as_os_str());
        raw.push(".zip");
        PathBuf::from(raw)
    }
}

/// Reads the archive location out of the backup subcommand's stdout.
///
/// Current releases print the full path. The 1.4.0 release only prints the
/// generated file name, which lives under `<config_base>/<legacy_backup_dir>`.
pub fn parse_backup_location(
    output: &str,
    gate: VersionGate,
    config_base: Option<&Path>,
    legacy_backup_dir: &Path,
) -> Result<BackupLocation> {
    if gate == VersionGate::Unsupported {
        return Err(anyhow!(
            "backups from unsupported application versions cannot be located"
        ));
    }

    if gate.reports_backup_location() {
        let stem = capture_first(LOCATED_PATTERN, output)?.ok_or_else(|| {
            anyhow!(
                "backup output did not report 'Backup located at <path>.zip': '{}'",
                output.trim()
            )
        })?;
        return Ok(BackupLocation::from_stem(stem));
    }

    let name = capture_first(CREATED_PATTERN, output)?.ok_or_else(|| {
        anyhow!(
            "backup output did not report 'Creating backup at <name>': '{}'",
            output.trim()
        )
    })?;
    let config_base = config_base.ok_or_else(|| {
        anyhow!("config directory is required to locate a backup created by version 1.4.0")
    })?;
    Ok(BackupLocation::from_stem(
        config_base.join(legacy_backup_dir).join(name),
    ))
}

fn capture_first(pattern: &str, output: &str) -> Result<Option<String>> {
    let regex = Regex::new(pattern).with_context(|| format!("invalid pattern: {pattern}"))?;
    Ok(regex
        .captures(output)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str().trim().to_string())
        .filter(|value| !value.is_empty()))
}
