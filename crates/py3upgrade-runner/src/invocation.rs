use std::fmt;
use std::io;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

/// A program and its arguments, executed directly without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn for_path(program: &Path) -> Self {
        Self::new(program.to_string_lossy().into_owned())
    }

    /// Splits an operator-supplied command line on whitespace. Quoting and
    /// escaping are not interpreted.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("command must not be empty"))?;
        Ok(Self::new(program).args(parts))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, arg: &Path) -> Self {
        self.arg(arg.to_string_lossy().into_owned())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Narrow seam over subprocess execution. Returns stdout on a zero exit and
/// an error carrying status, stdout, and stderr otherwise.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<String> {
        tracing::debug!(command = %invocation, "running command");
        let output = Command::new(invocation.program())
            .args(invocation.arguments())
            .output()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    return anyhow!(err).context(format!(
                        "'{}' was not found on PATH; install it and retry",
                        invocation.program()
                    ));
                }
                anyhow!(err)
            })
            .with_context(|| format!("`{invocation}` failed to start"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            tracing::debug!(command = %invocation, status = %output.status, "command finished");
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(command = %invocation, status = %output.status, "command failed");
        Err(anyhow!(
            "`{invocation}` failed: status={} stdout='{}' stderr='{}'",
            output.status,
            stdout.trim(),
            stderr.trim()
        ))
    }
}

pub fn app_version_invocation(interpreter: &Path, app_module: &str) -> Invocation {
    Invocation::for_path(interpreter)
        .args(["-m", app_module])
        .arg("--version")
}

pub fn backup_invocation(interpreter: &Path, app_module: &str, excludes: &[String]) -> Invocation {
    let mut invocation =
        Invocation::for_path(interpreter).args(["-m", app_module, "plugins", "backup:backup"]);
    for exclude in excludes {
        invocation = invocation.arg("--exclude").arg(exclude.as_str());
    }
    invocation
}

pub fn pip_install_invocation(interpreter: &Path, target: &str) -> Invocation {
    Invocation::for_path(interpreter)
        .args(["-m", "pip", "install"])
        .arg(target)
}
