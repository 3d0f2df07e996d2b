use std::{env, path::PathBuf};

use nix::unistd::{getgid, getuid};
use stacked_errors::{Result, StackableErr};

use crate::{path_to_string, UsageError};

/// Everything read from the host environment at startup. Nothing here is
/// validated yet since the install and template actions need almost none of
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub uid: u32,
    pub gid: u32,
    /// `$USER`
    pub user: Option<String>,
    /// `$HOME`
    pub home: Option<PathBuf>,
    /// `$XDG_CONFIG_HOME`
    pub xdg_config_home: Option<PathBuf>,
    /// The working directory of this process, which gets mounted as the
    /// source directory
    pub cwd: PathBuf,
}

impl HostContext {
    /// Reads the context of the current process
    pub fn capture() -> Result<Self> {
        let non_empty = |key: &str| env::var_os(key).filter(|v| !v.is_empty());
        Ok(Self {
            uid: getuid().as_raw(),
            gid: getgid().as_raw(),
            user: env::var("USER").ok().filter(|v| !v.is_empty()),
            home: non_empty("HOME").map(PathBuf::from),
            xdg_config_home: non_empty("XDG_CONFIG_HOME").map(PathBuf::from),
            cwd: env::current_dir().stack_err("HostContext::capture -> no working directory")?,
        })
    }

    pub fn home(&self) -> Result<&PathBuf> {
        self.home
            .as_ref()
            .ok_or(UsageError::MissingEnv("HOME"))
            .stack()
    }

    /// The identity that gets provisioned inside the container
    pub fn identity(&self) -> Result<HostIdentity> {
        let user = self
            .user
            .clone()
            .ok_or(UsageError::MissingEnv("USER"))
            .stack()?;
        let home = path_to_string(self.home()?)?;
        Ok(HostIdentity {
            uid: self.uid,
            gid: self.gid,
            // the provisioned group is named after the user
            group: user.clone(),
            user,
            home,
        })
    }
}

/// The host user mirrored inside the container, so that files written to the
/// mounted directories keep their host ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub uid: u32,
    pub gid: u32,
    pub user: String,
    pub group: String,
    pub home: String,
}

impl HostIdentity {
    /// The `user:group` form used by `docker exec --user`
    pub fn user_group(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }
}
