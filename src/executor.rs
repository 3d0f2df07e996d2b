use owo_colors::OwoColorize;
use stacked_errors::{Result, StackableErr};
use tracing::debug;

use crate::{Command, CommandResult};

/// Something that can run [Command]s to completion, one at a time.
///
/// An `Err` means the command could not be run at all. A command that ran but
/// exited unsuccessfully is an `Ok` with the status in the `CommandResult`.
#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn execute(&mut self, command: Command) -> Result<CommandResult>;

    /// If this executor spawns real processes and touches the filesystem.
    /// Cleanup paths that bypass the executor check this first.
    fn spawns_processes(&self) -> bool {
        true
    }
}

/// Runs commands as child processes of this one
#[derive(Debug, Default, Clone, Copy)]
pub struct OsExecutor;

impl Executor for OsExecutor {
    async fn execute(&mut self, command: Command) -> Result<CommandResult> {
        debug!("OsExecutor::execute {command:?}");
        command
            .run_to_completion()
            .await
            .stack_err_locationless("OsExecutor::execute")
    }
}

/// Records commands instead of running them, reporting every command as
/// successful. With `echo` set, each command is also printed to stdout.
#[derive(Debug, Default, Clone)]
pub struct DryRunExecutor {
    pub commands: Vec<Command>,
    pub echo: bool,
}

impl DryRunExecutor {
    /// A `DryRunExecutor` that prints commands as they are recorded
    pub fn echo() -> Self {
        Self {
            commands: vec![],
            echo: true,
        }
    }

    /// The recorded commands in their unified form
    pub fn unified_commands(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(Command::get_unified_command)
            .collect()
    }
}

impl Executor for DryRunExecutor {
    async fn execute(&mut self, command: Command) -> Result<CommandResult> {
        if self.echo {
            println!("{} {}", "dry-run |".cyan(), command.get_unified_command());
        }
        self.commands.push(command.clone());
        Ok(CommandResult::from_code(command, 0))
    }

    fn spawns_processes(&self) -> bool {
        false
    }
}
