use anyhow::{Context, Result};
use py3upgrade_core::{InstallationContext, UpgradeConfig};

use crate::invocation::{pip_install_invocation, CommandRunner, Invocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStep {
    StopService,
    RetireEnvironment,
    CreateEnvironment,
    InstallApplication,
}

impl ReplacementStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopService => "stop service",
            Self::RetireEnvironment => "move old environment",
            Self::CreateEnvironment => "create environment",
            Self::InstallApplication => "install application",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub step: ReplacementStep,
    pub invocation: Invocation,
}

/// The four commands that swap the old environment for a fresh one, in the
/// order they must run.
pub fn plan_environment_replacement(
    context: &InstallationContext,
    config: &UpgradeConfig,
) -> Result<Vec<PlannedStep>> {
    let stop = Invocation::from_command_line(&context.service().stop)
        .context("invalid service stop command")?;
    let retired = context.retired_venv(&config.retired_venv_suffix);

    Ok(vec![
        PlannedStep {
            step: ReplacementStep::StopService,
            invocation: stop,
        },
        PlannedStep {
            step: ReplacementStep::RetireEnvironment,
            invocation: Invocation::new("mv")
                .path_arg(context.venv())
                .path_arg(&retired),
        },
        PlannedStep {
            step: ReplacementStep::CreateEnvironment,
            invocation: Invocation::new(config.virtualenv_program.as_str())
                .arg(format!("--python={}", config.new_interpreter.display()))
                .path_arg(context.venv()),
        },
        PlannedStep {
            step: ReplacementStep::InstallApplication,
            invocation: pip_install_invocation(context.interpreter(), &config.app_package),
        },
    ])
}

/// Runs the planned steps strictly in order and stops at the first failure.
/// Nothing already done is undone.
pub fn run_environment_replacement<R, F>(
    runner: &mut R,
    steps: &[PlannedStep],
    mut on_step: F,
) -> Result<()>
where
    R: CommandRunner + ?Sized,
    F: FnMut(&PlannedStep),
{
    for planned in steps {
        on_step(planned);
        tracing::info!(step = planned.step.as_str(), "environment replacement step");
        runner
            .run(&planned.invocation)
            .with_context(|| format!("failed to {}", planned.step.as_str()))?;
    }
    Ok(())
}
