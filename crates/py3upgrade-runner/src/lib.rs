mod archive;
mod invocation;
mod replace;

pub use archive::{read_plugin_inventory, remove_backup_archive};
pub use invocation::{
    app_version_invocation, backup_invocation, pip_install_invocation, CommandRunner, Invocation,
    SystemRunner,
};
pub use replace::{
    plan_environment_replacement, run_environment_replacement, PlannedStep, ReplacementStep,
};
