use std::{
    env,
    fs::Permissions,
    io::ErrorKind,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use stacked_errors::{Result, StackableErr};
use tokio::fs;
use tracing::{info, warn};

use crate::{
    acquire_dir_path, acquire_path, path_to_string, Command, Executor, Templates, UsageError,
    TEMPLATES_DIR,
};

/// Name of the installed directory and of the binary inside it
pub const INSTALL_NAME: &str = "devcontainer";
/// Name of the short link placed in the local bin directory
pub const LINK_NAME: &str = "devcon";

/// Copies this program (the binary and its `templates/`) into
/// `local_bin/devcontainer` and links `local_bin/devcon` to the installed
/// binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    /// The binary to install
    pub binary: PathBuf,
    /// Copied to `templates/` in the install directory if it exists
    pub templates_dir: PathBuf,
    pub local_bin: PathBuf,
}

impl Installer {
    pub fn new(
        binary: impl AsRef<Path>,
        templates_dir: impl AsRef<Path>,
        local_bin: impl AsRef<Path>,
    ) -> Self {
        Self {
            binary: binary.as_ref().to_owned(),
            templates_dir: templates_dir.as_ref().to_owned(),
            local_bin: local_bin.as_ref().to_owned(),
        }
    }

    /// Installs the running executable and `templates` into `home/.local/bin`
    pub fn for_current_exe(templates: &Templates, home: impl AsRef<Path>) -> Result<Self> {
        let exe = env::current_exe().stack_err("Installer::for_current_exe -> current_exe")?;
        Ok(Self::new(
            exe,
            &templates.dir,
            home.as_ref().join(".local").join("bin"),
        ))
    }

    /// The directory the binary is installed from
    pub fn source_dir(&self) -> Result<&Path> {
        self.binary
            .parent()
            .stack_err("Installer::source_dir -> binary has no parent")
    }

    pub fn install_dir(&self) -> PathBuf {
        self.local_bin.join(INSTALL_NAME)
    }

    pub fn link_path(&self) -> PathBuf {
        self.local_bin.join(LINK_NAME)
    }

    /// The binary the link points to
    pub fn installed_binary(&self) -> PathBuf {
        self.install_dir().join(INSTALL_NAME)
    }

    /// Returns an error if installing would copy the source directory onto
    /// itself. Nothing is modified.
    pub async fn check_collision(&self) -> Result<()> {
        let source = acquire_dir_path(self.source_dir()?)
            .await
            .stack_err_locationless("Installer::check_collision -> source directory")?;
        // the install directory usually does not exist yet
        let install = acquire_path(self.install_dir())
            .await
            .unwrap_or_else(|_| self.install_dir());
        if source == install {
            return Err(UsageError::InstallCollision).stack()
        }
        Ok(())
    }

    /// Removes a previous install directory and link, including a dangling
    /// link
    pub async fn remove_previous(&self) -> Result<()> {
        let install_dir = self.install_dir();
        if fs::try_exists(&install_dir).await.stack()? {
            info!("Removing {install_dir:?}...");
            fs::remove_dir_all(&install_dir)
                .await
                .stack_err_with(|| format!("Installer::remove_previous -> {install_dir:?}"))?;
        }
        let link = self.link_path();
        // `symlink_metadata` so that dangling links are found
        match fs::symlink_metadata(&link).await {
            Ok(_) => {
                info!("Removing {link:?}...");
                fs::remove_file(&link)
                    .await
                    .stack_err_with(|| format!("Installer::remove_previous -> {link:?}"))?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => {
                return Err(e)
                    .stack_err_with(|| format!("Installer::remove_previous -> {link:?}"))
            }
        }
        Ok(())
    }

    /// The `rsync` and `ln` commands that copy and link the program. The
    /// templates are only copied if `templates_dir` exists.
    pub async fn commands(&self) -> Result<Vec<Command>> {
        let install_dir = path_to_string(self.install_dir())?;
        let mut commands = vec![Command::new("rsync -a")
            .arg(path_to_string(&self.binary)?)
            .arg(path_to_string(self.installed_binary())?)];
        if fs::try_exists(&self.templates_dir).await.stack()? {
            let templates_dir = path_to_string(&self.templates_dir)?;
            commands.push(
                Command::new("rsync -a")
                    .arg(format!("{}/", templates_dir.trim_end_matches('/')))
                    .arg(format!("{install_dir}/{TEMPLATES_DIR}/")),
            );
        } else {
            warn!(
                "no templates at {:?}, installing without templates",
                self.templates_dir
            );
        }
        commands.push(
            Command::new("ln -s")
                .arg(path_to_string(self.installed_binary())?)
                .arg(path_to_string(self.link_path())?),
        );
        Ok(commands)
    }

    /// Performs the install. If the executor does not spawn processes, nothing
    /// on the filesystem is touched and only the commands are passed through.
    pub async fn install<E: Executor>(&self, exec: &mut E) -> Result<()> {
        self.check_collision().await?;
        let commands = self.commands().await?;
        let touch_fs = exec.spawns_processes();
        if touch_fs {
            self.remove_previous().await?;
            fs::create_dir_all(self.install_dir())
                .await
                .stack_err("Installer::install -> creating the install directory")?;
        }
        for command in commands {
            let comres = exec
                .execute(command)
                .await
                .stack_err_locationless("Installer::install")?;
            comres.assert_success().stack_err_locationless("Installer::install")?;
        }
        if touch_fs {
            let mode = Permissions::from_mode(0o755);
            fs::set_permissions(self.install_dir(), mode.clone())
                .await
                .stack()?;
            // follows the link to the installed binary
            fs::set_permissions(self.link_path(), mode).await.stack()?;
            info!(
                "Installed {:?}, linked as {:?}",
                self.install_dir(),
                self.link_path()
            );
        }
        Ok(())
    }
}
