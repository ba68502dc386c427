use std::cmp::Ordering;

use anyhow::{anyhow, Result};
use semver::Version;

const VERSION_MARKER: &str = "version ";

/// How the installed release is treated by the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionGate {
    /// Newer than 1.4.0: backup output reports the archive location directly.
    Current,
    /// Exactly 1.4.0: backup output reports a bare file name under the config base.
    Legacy,
    /// Too old to migrate.
    Unsupported,
}

impl VersionGate {
    /// Minor and patch are compared regardless of how far `major` exceeds 1,
    /// so `2.0.0` is rejected while `2.4.1` is accepted.
    pub fn classify(version: &Version) -> Self {
        if version.major < 1 {
            return Self::Unsupported;
        }

        match version.minor.cmp(&4) {
            Ordering::Greater => Self::Current,
            Ordering::Equal if version.patch > 0 => Self::Current,
            Ordering::Equal => Self::Legacy,
            Ordering::Less => Self::Unsupported,
        }
    }

    pub fn reports_backup_location(self) -> bool {
        self == Self::Current
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Extracts the `major.minor.patch` triple following `version ` in the
/// application's `--version` output.
pub fn parse_reported_version(output: &str) -> Result<Version> {
    let start = output
        .find(VERSION_MARKER)
        .ok_or_else(|| anyhow!("version output did not contain a version: '{}'", output.trim()))?;
    let rest = &output[start + VERSION_MARKER.len()..];
    let line = rest.lines().next().unwrap_or_default();
    parse_version_triple(line)
}

/// Parses the leading digits of the first three dot-separated components;
/// suffixes such as `rc1` or `.post0` are ignored.
pub fn parse_version_triple(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let mut components = trimmed.split('.');
    let mut next_number = |label: &str| -> Result<u64> {
        let component = components
            .next()
            .ok_or_else(|| anyhow!("version '{trimmed}' is missing its {label} component"))?;
        leading_number(component)
            .ok_or_else(|| anyhow!("version '{trimmed}' has a non-numeric {label} component"))
    };

    let major = next_number("major")?;
    let minor = next_number("minor")?;
    let patch = next_number("patch")?;
    Ok(Version::new(major, minor, patch))
}

fn leading_number(component: &str) -> Option<u64> {
    let end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    component[..end].parse().ok()
}
