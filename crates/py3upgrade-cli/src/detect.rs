use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use py3upgrade_core::{
    parse_reported_version, InstallKind, InstallationContext, ServiceCommands, UpgradeConfig,
    VersionGate,
};
use py3upgrade_runner::{app_version_invocation, CommandRunner};
use semver::Version;

use crate::config::ManualAnswers;
use crate::prompt::{prompt_until, Prompter};
use crate::render::TerminalRenderer;

/// Decides between the appliance layout and an operator-described install,
/// then asks the installed application for its version.
pub(crate) fn detect_installation(
    config: &UpgradeConfig,
    answers: &ManualAnswers,
    runner: &mut dyn CommandRunner,
    prompter: &mut dyn Prompter,
    renderer: TerminalRenderer,
) -> Result<InstallationContext> {
    if config.appliance_marker.is_file() {
        renderer.print_status("ok", "detected packaged appliance install");
        let venv = config.appliance_venv.clone();
        let version = query_installed_version(config, &venv, runner, renderer)?;
        let config_base = match VersionGate::classify(&version) {
            VersionGate::Legacy => Some(config.appliance_config_base.clone()),
            _ => None,
        };
        return Ok(InstallationContext::new(
            InstallKind::Appliance,
            venv,
            &config.venv_interpreter,
            config_base,
            ServiceCommands {
                stop: config.appliance_stop_command.clone(),
                start: config.appliance_start_command.clone(),
            },
            version,
        ));
    }

    renderer.print_status("ok", "manual install detected");
    renderer.print_lines(&[
        "Provide the path to the virtual environment and the config directory of the application."
            .to_string(),
    ]);
    let venv = resolve_venv(config, answers.venv.as_deref(), prompter, renderer)?;
    let version = query_installed_version(config, &venv, runner, renderer)?;
    let config_base = match VersionGate::classify(&version) {
        VersionGate::Legacy => Some(resolve_config_dir(
            config,
            answers.config_dir.as_deref(),
            prompter,
            renderer,
        )?),
        _ => None,
    };

    renderer.print_lines(&[
        String::new(),
        "To replace the environment the service stop and start commands are needed.".to_string(),
    ]);
    let stop = resolve_service_command(
        "Stop command: ",
        answers.stop_command.as_deref(),
        prompter,
        renderer,
    )?;
    let start = resolve_service_command(
        "Start command: ",
        answers.start_command.as_deref(),
        prompter,
        renderer,
    )?;

    Ok(InstallationContext::new(
        InstallKind::Manual,
        venv,
        &config.venv_interpreter,
        config_base,
        ServiceCommands { stop, start },
        version,
    ))
}

fn query_installed_version(
    config: &UpgradeConfig,
    venv: &Path,
    runner: &mut dyn CommandRunner,
    renderer: TerminalRenderer,
) -> Result<Version> {
    renderer.print_status("ok", "checking installed version");
    let interpreter = venv.join(&config.venv_interpreter);
    let output = runner
        .run(&app_version_invocation(&interpreter, &config.app_module))
        .with_context(|| {
            format!(
                "failed to find the installed application in {}; on a manual install check that the virtual environment path is correct",
                venv.display()
            )
        })?;
    let version = parse_reported_version(&output)?;
    renderer.print_status("ok", &format!("installed version: {version}"));

    if VersionGate::classify(&version) == VersionGate::Unsupported {
        bail!(
            "installed version {version} is not supported; upgrade to a release >= 1.4.0 before migrating"
        );
    }
    Ok(version)
}

fn resolve_venv(
    config: &UpgradeConfig,
    preset: Option<&Path>,
    prompter: &mut dyn Prompter,
    renderer: TerminalRenderer,
) -> Result<PathBuf> {
    let has_interpreter = |path: &Path| {
        !path.as_os_str().is_empty() && path.join(&config.venv_interpreter).is_file()
    };

    if let Some(path) = preset {
        if has_interpreter(path) {
            renderer.print_status("ok", "virtual environment found");
            return Ok(path.to_path_buf());
        }
        renderer.print_status(
            "warn",
            &format!("no interpreter found in {}", path.display()),
        );
    }

    let venv = prompt_until(
        prompter,
        renderer,
        "Path: ",
        "Invalid virtual environment path, please try again",
        |answer| {
            let path = PathBuf::from(answer);
            has_interpreter(&path).then_some(path)
        },
    )?;
    renderer.print_status("ok", "virtual environment found");
    Ok(venv)
}

fn resolve_config_dir(
    config: &UpgradeConfig,
    preset: Option<&Path>,
    prompter: &mut dyn Prompter,
    renderer: TerminalRenderer,
) -> Result<PathBuf> {
    let has_config_file = |path: &Path| {
        !path.as_os_str().is_empty() && path.join(&config.config_file_name).is_file()
    };

    if let Some(path) = preset {
        if has_config_file(path) {
            renderer.print_status("ok", "config directory valid");
            return Ok(path.to_path_buf());
        }
        renderer.print_status(
            "warn",
            &format!(
                "no {} found in {}",
                config.config_file_name,
                path.display()
            ),
        );
    }

    let dir = prompt_until(
        prompter,
        renderer,
        "Config directory: ",
        "Invalid config directory, please try again",
        |answer| {
            let path = PathBuf::from(answer);
            has_config_file(&path).then_some(path)
        },
    )?;
    renderer.print_status("ok", "config directory valid");
    Ok(dir)
}

fn resolve_service_command(
    prompt: &str,
    preset: Option<&str>,
    prompter: &mut dyn Prompter,
    renderer: TerminalRenderer,
) -> Result<String> {
    if let Some(command) = preset.map(str::trim).filter(|command| !command.is_empty()) {
        return Ok(command.to_string());
    }

    prompt_until(
        prompter,
        renderer,
        prompt,
        "Command must not be empty, please try again",
        |answer| (!answer.is_empty()).then(|| answer.to_string()),
    )
}
