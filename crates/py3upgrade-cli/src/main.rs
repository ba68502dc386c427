mod catalog;
mod config;
mod detect;
mod pipeline;
mod prompt;
mod render;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use py3upgrade_runner::SystemRunner;
use tracing_subscriber::EnvFilter;

use crate::catalog::HttpCatalog;
use crate::config::{
    apply_catalog_url_override, load_upgrade_config, ManualAnswers, PluginFailurePolicy,
    RunOptions,
};
use crate::pipeline::Migration;
use crate::prompt::{is_cancellation, StdinPrompter};
use crate::render::{resolve_output_style, TerminalRenderer};

#[derive(Parser, Debug)]
#[command(name = "py3upgrade")]
#[command(
    about = "Move a print server install from Python 2 to Python 3, keeping its plugins",
    long_about = None
)]
struct Cli {
    /// TOML file overriding built-in paths, commands, and URLs
    #[arg(long)]
    config: Option<PathBuf>,
    /// Virtual environment of a manual install
    #[arg(long)]
    venv: Option<PathBuf>,
    /// Config directory of a manual install
    #[arg(long)]
    config_dir: Option<PathBuf>,
    #[arg(long)]
    stop_command: Option<String>,
    #[arg(long)]
    start_command: Option<String>,
    #[arg(long)]
    catalog_url: Option<String>,
    /// Keep installing plugins after one fails
    #[arg(long)]
    keep_going: bool,
    /// Skip the confirmation prompts
    #[arg(short, long)]
    yes: bool,
    #[arg(long)]
    plain: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancellation(&err) => {
            println!();
            println!("Cancelled.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let mut config = load_upgrade_config(cli.config.as_deref())?;
    apply_catalog_url_override(&mut config, cli.catalog_url)?;

    let options = RunOptions {
        answers: ManualAnswers {
            venv: cli.venv,
            config_dir: cli.config_dir,
            stop_command: cli.stop_command,
            start_command: cli.start_command,
        },
        auto_yes: cli.yes,
        failure_policy: failure_policy_from_flag(cli.keep_going),
    };
    let renderer =
        TerminalRenderer::from_style(resolve_output_style(io::stdout().is_terminal(), cli.plain));
    let catalog = HttpCatalog::new(config.catalog_url.clone());
    let mut runner = SystemRunner;
    let mut prompter = StdinPrompter;

    Migration::new(
        &config,
        &options,
        &mut runner,
        &mut prompter,
        &catalog,
        renderer,
    )
    .run()?;
    Ok(())
}

fn failure_policy_from_flag(keep_going: bool) -> PluginFailurePolicy {
    if keep_going {
        PluginFailurePolicy::KeepGoing
    } else {
        PluginFailurePolicy::AbortOnFirst
    }
}

fn tracing_filter_directive(verbose: bool) -> &'static str {
    if verbose {
        "py3upgrade_cli=debug,py3upgrade_runner=debug,py3upgrade_core=debug"
    } else {
        "warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_filter_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
