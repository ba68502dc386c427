use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use py3upgrade_core::PluginInventory;
use zip::result::ZipError;

/// Reads the plugin manifest out of a backup archive.
///
/// `Ok(None)` means the archive has no manifest entry, which is how backups
/// without third-party plugins look.
pub fn read_plugin_inventory(
    archive_path: &Path,
    manifest_entry: &str,
) -> Result<Option<PluginInventory>> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("failed to open backup archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).with_context(|| {
        format!(
            "backup archive is not a readable zip: {}",
            archive_path.display()
        )
    })?;

    let mut entry = match archive.by_name(manifest_entry) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| {
                format!(
                    "failed to read '{manifest_entry}' from {}",
                    archive_path.display()
                )
            })
        }
    };

    let mut raw = String::new();
    entry.read_to_string(&mut raw).with_context(|| {
        format!(
            "failed to read '{manifest_entry}' from {}",
            archive_path.display()
        )
    })?;

    PluginInventory::from_manifest_json(&raw)
        .map(Some)
        .with_context(|| format!("malformed '{manifest_entry}' in {}", archive_path.display()))
}

/// Deletes the archive; a missing file is not an error.
pub fn remove_backup_archive(archive_path: &Path) -> Result<()> {
    match fs::remove_file(archive_path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| {
            format!(
                "failed to remove backup archive: {}",
                archive_path.display()
            )
        }),
    }
}
