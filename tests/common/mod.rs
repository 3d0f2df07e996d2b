#![allow(dead_code)]

use devcontainer::{Args, Command, HostContext, LifecycleConfig};
use stacked_errors::{Result, StackableErr};

pub const HOME: &str = "/home/alice";
pub const CWD: &str = "/home/alice/project";

/// A host context that does not depend on the machine running the tests
pub fn host() -> HostContext {
    HostContext {
        uid: 1000,
        gid: 1001,
        user: Some("alice".to_owned()),
        home: Some(HOME.into()),
        xdg_config_home: Some("/home/alice/.xdg".into()),
        cwd: CWD.into(),
    }
}

pub fn parse(args: &[&str]) -> Result<Args> {
    let mut full = vec!["devcontainer"];
    full.extend_from_slice(args);
    Args::try_parse_from_with_templates(&[], full).stack()
}

pub fn lifecycle_config(args: &[&str]) -> Result<LifecycleConfig> {
    parse(args)?.lifecycle_config(&host())
}

/// The argument following `flag`
pub fn arg_after<'a>(command: &'a Command, flag: &str) -> Option<&'a str> {
    let i = command.args.iter().position(|a| a == flag)?;
    command.args.get(i + 1).map(String::as_str)
}

/// All the arguments following each occurence of `flag`
pub fn args_after<'a>(command: &'a Command, flag: &str) -> Vec<&'a str> {
    command
        .args
        .windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

/// `(program, subcommand)` of every command
pub fn steps(commands: &[Command]) -> Vec<(String, String)> {
    commands
        .iter()
        .map(|c| {
            (
                c.program.clone(),
                c.args.first().cloned().unwrap_or_default(),
            )
        })
        .collect()
}

pub fn docker_steps(subcommands: &[&str]) -> Vec<(String, String)> {
    subcommands
        .iter()
        .map(|s| ("docker".to_owned(), (*s).to_owned()))
        .collect()
}
