use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use py3upgrade_core::{
    match_inventory, parse_backup_location, BackupLocation, InstallationContext, PluginInventory,
    PluginRecord, QueuedPlugin, UpgradeConfig,
};
use py3upgrade_runner::{
    backup_invocation, pip_install_invocation, plan_environment_replacement, read_plugin_inventory,
    remove_backup_archive, run_environment_replacement, CommandRunner, Invocation,
};

use crate::catalog::PluginCatalogSource;
use crate::config::{PluginFailurePolicy, RunOptions};
use crate::detect::detect_installation;
use crate::prompt::{acknowledge, Prompter};
use crate::render::TerminalRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Detect,
    Backup,
    Inventory,
    Confirm,
    Replace,
    ReinstallPlugins,
    Restart,
    Cleanup,
}

impl Stage {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Backup => "backup",
            Self::Inventory => "inventory",
            Self::Confirm => "confirm",
            Self::Replace => "replace",
            Self::ReinstallPlugins => "reinstall-plugins",
            Self::Restart => "restart",
            Self::Cleanup => "cleanup",
        }
    }

    /// A failed restart leaves the backup archive in place so the operator
    /// still has it while fixing the service.
    fn keeps_archive(self) -> bool {
        self == Self::Restart
    }
}

#[derive(Debug)]
pub(crate) struct StageFailure {
    pub(crate) stage: Stage,
    source: anyhow::Error,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed", self.stage.as_str())
    }
}

impl std::error::Error for StageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

fn fail(stage: Stage) -> impl FnOnce(anyhow::Error) -> StageFailure {
    move |source| StageFailure { stage, source }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FailedPlugin {
    pub(crate) plugin: QueuedPlugin,
    pub(crate) error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MigrationReport {
    pub(crate) retired_venv: PathBuf,
    pub(crate) installed: Vec<QueuedPlugin>,
    pub(crate) failed: Vec<FailedPlugin>,
    pub(crate) unmatched: Vec<PluginRecord>,
    pub(crate) archive_removed: bool,
}

impl MigrationReport {
    fn new(retired_venv: PathBuf) -> Self {
        Self {
            retired_venv,
            installed: Vec::new(),
            failed: Vec::new(),
            unmatched: Vec::new(),
            archive_removed: false,
        }
    }
}

/// One run of the upgrade: detect, back up, read the plugin inventory,
/// confirm, replace the environment, reinstall plugins, restart, clean up.
/// There is no way back to an earlier stage.
pub(crate) struct Migration<'a> {
    config: &'a UpgradeConfig,
    options: &'a RunOptions,
    runner: &'a mut dyn CommandRunner,
    prompter: &'a mut dyn Prompter,
    catalog: &'a dyn PluginCatalogSource,
    renderer: TerminalRenderer,
}

impl<'a> Migration<'a> {
    pub(crate) fn new(
        config: &'a UpgradeConfig,
        options: &'a RunOptions,
        runner: &'a mut dyn CommandRunner,
        prompter: &'a mut dyn Prompter,
        catalog: &'a dyn PluginCatalogSource,
        renderer: TerminalRenderer,
    ) -> Self {
        Self {
            config,
            options,
            runner,
            prompter,
            catalog,
            renderer,
        }
    }

    pub(crate) fn run(&mut self) -> Result<MigrationReport> {
        self.print_intro();
        acknowledge(
            &mut *self.prompter,
            "Press [enter] to continue or ctrl-c to quit",
            self.options.auto_yes,
        )
        .map_err(fail(Stage::Confirm))?;

        self.renderer.print_section("Detect");
        let context = detect_installation(
            self.config,
            &self.options.answers,
            &mut *self.runner,
            &mut *self.prompter,
            self.renderer,
        )
        .map_err(fail(Stage::Detect))?;
        self.renderer.print_status(
            "ok",
            &format!(
                "{} install at version {} ({})",
                context.kind().as_str(),
                context.version(),
                context.gate().as_str()
            ),
        );
        tracing::info!(
            kind = context.kind().as_str(),
            venv = %context.venv().display(),
            version = %context.version(),
            gate = context.gate().as_str(),
            "installation detected"
        );

        self.renderer.print_section("Backup");
        let backup = self
            .capture_backup(&context)
            .map_err(fail(Stage::Backup))?;
        let archive = backup.archive_path();

        match self.run_after_backup(&context, &archive) {
            Ok(report) => Ok(report),
            Err(failure) => {
                tracing::info!(stage = failure.stage.as_str(), "migration stopped");
                if !failure.stage.keeps_archive() {
                    self.discard_archive(&archive);
                }
                Err(failure.into())
            }
        }
    }

    fn run_after_backup(
        &mut self,
        context: &InstallationContext,
        archive: &Path,
    ) -> std::result::Result<MigrationReport, StageFailure> {
        self.renderer.print_section("Plugins");
        let inventory = self
            .read_inventory(archive)
            .map_err(fail(Stage::Inventory))?;
        self.confirm_inventory(&inventory)
            .map_err(fail(Stage::Confirm))?;

        self.renderer.print_section("Environment");
        self.replace_environment(context)
            .map_err(fail(Stage::Replace))?;

        let mut report =
            MigrationReport::new(context.retired_venv(&self.config.retired_venv_suffix));
        if !inventory.is_empty() {
            self.renderer.print_section("Reinstall");
            self.reinstall_plugins(context, &inventory, &mut report)
                .map_err(fail(Stage::ReinstallPlugins))?;
        }

        self.renderer.print_section("Restart");
        self.restart_service(context)
            .map_err(fail(Stage::Restart))?;

        report.archive_removed = self.remove_archive_after_success(archive);
        self.print_completion(&report);
        Ok(report)
    }

    fn print_intro(&self) {
        self.renderer.print_lines(&[
            "This will migrate the print server install from Python 2 to Python 3.".to_string(),
            "It requires an internet connection.".to_string(),
            "**This will interrupt any ongoing print job**".to_string(),
            "The latest release and the latest version of every catalog plugin will be installed."
                .to_string(),
            "No configuration or other files will be overwritten.".to_string(),
            "If the upgrade fails, the old environment can be restored with the revert helper."
                .to_string(),
        ]);
    }

    fn capture_backup(&mut self, context: &InstallationContext) -> Result<BackupLocation> {
        self.renderer
            .print_status("ok", "creating a backup to read the plugin list");
        let output = self
            .runner
            .run(&backup_invocation(
                context.interpreter(),
                &self.config.app_module,
                &self.config.backup_excludes,
            ))
            .context(
                "failed to create a backup; on a manual install check that the application is installed in the given environment",
            )?;

        let location = parse_backup_location(
            &output,
            context.gate(),
            context.config_base(),
            &self.config.legacy_backup_dir,
        )?;
        let archive = location.archive_path();
        if !archive.is_file() {
            return Err(anyhow!(
                "backup archive reported at {} does not exist",
                archive.display()
            ));
        }
        tracing::info!(archive = %archive.display(), "backup captured");
        Ok(location)
    }

    fn read_inventory(&self, archive: &Path) -> Result<PluginInventory> {
        self.renderer.print_status(
            "ok",
            &format!("reading {} from backup", self.config.manifest_entry),
        );
        let inventory =
            read_plugin_inventory(archive, &self.config.manifest_entry)?.unwrap_or_default();
        tracing::info!(plugins = inventory.len(), "plugin inventory read");
        Ok(inventory)
    }

    fn confirm_inventory(&mut self, inventory: &PluginInventory) -> Result<()> {
        if inventory.is_empty() {
            self.renderer.print_status("warn", "No plugins found");
            self.renderer.print_lines(&[
                "If you think this is an error, please ask for help. Bundled plugins are not listed."
                    .to_string(),
            ]);
            return acknowledge(
                &mut *self.prompter,
                "Press [enter] to continue, or ctrl-c to quit",
                self.options.auto_yes,
            );
        }

        let mut lines = vec!["Plugins installed:".to_string()];
        lines.extend(
            inventory
                .plugins()
                .iter()
                .map(|plugin| format!("- {}", plugin.name)),
        );
        lines.push(
            "If something is missing here, check the plugin list inside the application."
                .to_string(),
        );
        self.renderer.print_lines(&lines);
        acknowledge(
            &mut *self.prompter,
            "Continue? [enter]",
            self.options.auto_yes,
        )
    }

    fn replace_environment(&mut self, context: &InstallationContext) -> Result<()> {
        let steps = plan_environment_replacement(context, self.config)?;
        self.renderer.print_status(
            "warn",
            "moving the environment and installing the application, this may take a while; do not cancel",
        );

        let progress = self.renderer.start_progress("replace environment");
        let result = run_environment_replacement(&mut *self.runner, &steps, |planned| {
            progress.set_message(planned.step.as_str())
        });
        match result {
            Ok(()) => {
                progress.finish_success();
                self.renderer
                    .print_status("ok", "application installed into the new environment");
                Ok(())
            }
            Err(err) => {
                progress.finish_abandon();
                Err(err)
            }
        }
    }

    fn reinstall_plugins(
        &mut self,
        context: &InstallationContext,
        inventory: &PluginInventory,
        report: &mut MigrationReport,
    ) -> Result<()> {
        self.renderer.print_status("ok", "fetching the plugin catalog");
        let catalog = self.catalog.fetch()?;
        let plan = match_inventory(inventory, &catalog);
        report.unmatched = plan.unmatched;

        let progress = self.renderer.start_progress("reinstall plugins");
        for plugin in plan.queued {
            progress.set_message(&format!("installing {}", plugin.archive));
            tracing::info!(plugin = %plugin.key, archive = %plugin.archive, "installing plugin");

            let invocation = pip_install_invocation(context.interpreter(), &plugin.archive);
            match self.runner.run(&invocation) {
                Ok(_) => report.installed.push(plugin),
                Err(err) => {
                    let name = plugin.name.clone();
                    report.failed.push(FailedPlugin {
                        plugin,
                        error: format!("{err:#}"),
                    });
                    if self.options.failure_policy == PluginFailurePolicy::AbortOnFirst {
                        progress.finish_abandon();
                        self.print_plugin_reports(report);
                        return Err(err.context(format!(
                            "failed to install plugin '{name}', it may not be compatible; remaining plugins were skipped"
                        )));
                    }
                }
            }
        }

        progress.finish_success();
        self.print_plugin_reports(report);
        Ok(())
    }

    fn print_plugin_reports(&self, report: &MigrationReport) {
        if !report.failed.is_empty() {
            self.renderer
                .print_status("warn", "Could not install these plugins:");
            let mut lines = report
                .failed
                .iter()
                .map(|failed| {
                    format!(
                        " - {} ({}): {}",
                        failed.plugin.name, failed.plugin.archive, failed.error
                    )
                })
                .collect::<Vec<_>>();
            lines.extend([
                "Reasons for this could be:".to_string(),
                "- not on the repository (installed from an uploaded archive or url)".to_string(),
                "- incompatible with your system".to_string(),
                "Reinstall them from the plugin manager once the service is back.".to_string(),
            ]);
            self.renderer.print_lines(&lines);
        }

        if !report.unmatched.is_empty() {
            self.renderer.print_status(
                "warn",
                "These plugins were not found on the repository, please install them manually:",
            );
            let lines = report
                .unmatched
                .iter()
                .map(|plugin| format!("- {}", plugin.name))
                .collect::<Vec<_>>();
            self.renderer.print_lines(&lines);
        }
    }

    fn restart_service(&mut self, context: &InstallationContext) -> Result<()> {
        self.renderer.print_status("ok", "starting the service");
        let start = Invocation::from_command_line(&context.service().start)
            .context("invalid service start command")?;
        self.runner
            .run(&start)
            .context("failed to start the service")?;
        Ok(())
    }

    fn remove_archive_after_success(&self, archive: &Path) -> bool {
        self.renderer.print_status("ok", "removing backup archive");
        match remove_backup_archive(archive) {
            Ok(()) => true,
            Err(err) => {
                self.renderer.print_status(
                    "warn",
                    &format!("{}: {err:#}", Stage::Cleanup.as_str()),
                );
                false
            }
        }
    }

    fn discard_archive(&self, archive: &Path) {
        self.renderer.print_status("warn", "cleaning up, removing backup archive");
        if let Err(err) = remove_backup_archive(archive) {
            self.renderer.print_status("warn", &format!("{err:#}"));
        }
    }

    fn print_completion(&self, report: &MigrationReport) {
        self.renderer
            .print_status("ok", "Finished! The service should be restarted and ready to go.");
        let mut lines = Vec::new();
        if !report.installed.is_empty() {
            lines.push(format!("Reinstalled {} plugin(s).", report.installed.len()));
        }
        if !report.archive_removed {
            lines.push("The backup archive could not be removed; delete it manually.".to_string());
        }
        lines.push(format!(
            "Once you have verified the install works, you can safely remove {}",
            report.retired_venv.display()
        ));
        self.renderer.print_lines(&lines);
    }
}
