use core::fmt;
use std::{
    fmt::{Debug, Display},
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use stacked_errors::{bail_locationless, Result, StackableErr};

// Arguments are kept as `String`s, everything here ends up on a docker command
// line and non-UTF-8 paths are rejected before getting this far.

/// An OS command, a description of a `tokio::process::Command` that can be
/// inspected, printed, and compared before it is run.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// The program to run.
    pub program: String,
    /// All the arguments that will be passed to the program
    pub args: Vec<String>,
    /// Working directory for the process, the current one if `None`
    pub cwd: Option<PathBuf>,
    /// If set, the standard input is inherited from this process so that the
    /// command can be used interactively. Otherwise stdin is null. Stdout and
    /// stderr are always inherited.
    pub interactive: bool,
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("Command {{ {:?}", self.get_unified_command()))?;
        if let Some(cwd) = &self.cwd {
            f.write_fmt(format_args!(", cwd: {cwd:?}"))?;
        }
        if self.interactive {
            f.write_fmt(format_args!(", interactive: true"))?;
        }
        f.write_fmt(format_args!(" }}"))
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_unified_command())
    }
}

/// Quotes `arg` for a POSIX shell if it would not survive word splitting
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '@' | '+')
        });
    if plain {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

impl Command {
    /// Creates a `Command` that only sets the `program` and `args` and leaves
    /// other things as their default values. `program_with_args` is separated
    /// by whitespace, the first part becomes the progam, and the the others
    /// are inserted as args.
    ///
    /// In case an argument has spaces, it should be added with [Command::arg]
    /// as an unbroken `&str`.
    pub fn new(program_with_args: impl AsRef<str>) -> Self {
        let mut parts = program_with_args.as_ref().split_whitespace();
        let program = parts.next().unwrap_or_default().to_owned();
        Self {
            program,
            args: parts.map(str::to_owned).collect(),
            ..Default::default()
        }
    }

    /// Adds an argument
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Adds arguments to be passed to the program
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_owned()));
        self
    }

    /// Sets `self.cwd`
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_owned());
        self
    }

    /// Sets `self.interactive`
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// If the command is `program` with a first argument of `subcommand`, e.x.
    /// `is_subcommand("docker", "exec")`
    pub fn is_subcommand(&self, program: &str, subcommand: &str) -> bool {
        (self.program == program) && (self.args.first().map(String::as_str) == Some(subcommand))
    }

    /// Gets the program and args interspersed with spaces, quoting arguments
    /// so that the result can be pasted into a shell
    pub fn get_unified_command(&self) -> String {
        let mut command = shell_quote(&self.program);
        for arg in &self.args {
            command.push(' ');
            command += &shell_quote(arg);
        }
        command
    }

    /// Spawns the command and waits for it to exit. The child is killed if the
    /// returned future is dropped before completion.
    pub async fn run_to_completion(self) -> Result<CommandResult> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if self.interactive {
            cmd.stdin(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null());
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        let status = cmd.status().await.stack_err_with_locationless(|| {
            format!("Command::run_to_completion -> could not spawn {self:?}")
        })?;
        Ok(CommandResult {
            command: self,
            status: Some(status),
        })
    }
}

/// The result of a [Command](crate::Command)
#[must_use]
#[derive(Clone, Default)]
pub struct CommandResult {
    // the command information is kept around for failures
    pub command: Command,
    /// `None` if the command never got to run to completion
    pub status: Option<ExitStatus>,
}

impl Debug for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandResult")
            .field("command", &self.command)
            .field("status", &self.status)
            .finish()
    }
}

impl Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:#?}", self))
    }
}

impl CommandResult {
    /// A result for `command` as if it exited normally with `code`
    pub fn from_code(command: Command, code: i32) -> Self {
        Self {
            command,
            // wait statuses keep the exit code in the second byte
            status: Some(ExitStatus::from_raw((code & 0xff) << 8)),
        }
    }

    /// Returns if the command completed with a successful return status
    pub fn successful(&self) -> bool {
        self.status.as_ref().is_some_and(ExitStatus::success)
    }

    /// The exit code, if the command exited normally
    pub fn code(&self) -> Option<i32> {
        self.status.as_ref().and_then(ExitStatus::code)
    }

    /// Returns a formatted error with relevant information if the command was
    /// not successful
    pub fn assert_success(&self) -> Result<()> {
        if let Some(status) = self.status.as_ref() {
            if status.success() {
                Ok(())
            } else {
                bail_locationless!("{self:#?}.assert_success() -> unsuccessful")
            }
        } else {
            bail_locationless!("{self:#?}.assert_success() -> the command did not complete")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_command_quoting() {
        let command = Command::new("docker exec dev")
            .args(["sh", "-c"])
            .arg("cd /devcontainer/src && zsh");
        assert_eq!(
            command.get_unified_command(),
            "docker exec dev sh -c 'cd /devcontainer/src && zsh'"
        );
        let command = Command::new("echo").arg("").arg("it's");
        assert_eq!(command.get_unified_command(), r"echo '' 'it'\''s'");
        assert!(command.is_subcommand("echo", ""));
        assert!(!command.is_subcommand("docker", ""));
    }

    #[test]
    fn results_from_codes() {
        let comres = CommandResult::from_code(Command::new("true"), 0);
        assert!(comres.successful());
        assert!(comres.assert_success().is_ok());
        let comres = CommandResult::from_code(Command::new("false"), 1);
        assert!(!comres.successful());
        assert_eq!(comres.code(), Some(1));
        assert!(comres.assert_success().is_err());
        assert!(!CommandResult::default().successful());
    }

    #[tokio::test]
    async fn runs_processes() {
        let comres = Command::new("sh -c")
            .arg("exit 3")
            .run_to_completion()
            .await
            .unwrap();
        assert_eq!(comres.code(), Some(3));
        assert!(Command::new("nonexistent_program_for_devcontainer_tests")
            .run_to_completion()
            .await
            .is_err());
    }
}
