use std::ffi::OsString;
use std::path::{Path, PathBuf};

use semver::Version;

use crate::version::VersionGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    /// Pre-configured image with fixed paths, detected through a marker file.
    Appliance,
    /// Paths and service commands supplied by the operator.
    Manual,
}

impl InstallKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Appliance => "appliance",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommands {
    pub stop: String,
    pub start: String,
}

/// What detection learned about the running installation. Built once and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationContext {
    kind: InstallKind,
    venv: PathBuf,
    interpreter: PathBuf,
    config_base: Option<PathBuf>,
    service: ServiceCommands,
    version: Version,
    gate: VersionGate,
}

impl InstallationContext {
    pub fn new(
        kind: InstallKind,
        venv: PathBuf,
        venv_interpreter: &Path,
        config_base: Option<PathBuf>,
        service: ServiceCommands,
        version: Version,
    ) -> Self {
        let interpreter = venv.join(venv_interpreter);
        let gate = VersionGate::classify(&version);
        Self {
            kind,
            venv,
            interpreter,
            config_base,
            service,
            version,
            gate,
        }
    }

    pub fn kind(&self) -> InstallKind {
        self.kind
    }

    pub fn venv(&self) -> &Path {
        &self.venv
    }

    /// Interpreter inside the environment. After replacement this path points
    /// at the freshly created environment.
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn config_base(&self) -> Option<&Path> {
        self.config_base.as_deref()
    }

    pub fn service(&self) -> &ServiceCommands {
        &self.service
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn gate(&self) -> VersionGate {
        self.gate
    }

    pub fn retired_venv(&self, suffix: &str) -> PathBuf {
        let mut raw = OsString::from(self.venv.as_os_str());
        raw.push(suffix);
        PathBuf::from(raw)
    }
}
