use std::process::Stdio;

use stacked_errors::{Result, StackableErr};
use tracing::{debug, info, warn};

use crate::{acquire_file_path, path_to_string, Command, CommandResult, Executor, LifecycleConfig};

/// Where the working directory is mounted inside the container
pub const SOURCE_MOUNT: &str = "/devcontainer/src";
/// Where `<source>/.devcontainer/env` is mounted inside the container
pub const ENV_MOUNT: &str = "/devcontainer/env";
/// The project local directory mounted at `ENV_MOUNT`
pub const PROJECT_ENV_DIR: &str = ".devcontainer/env";
/// Keeps the NVIDIA container runtime from refusing images whose CUDA
/// requirement does not match the host driver
pub const NVIDIA_DISABLE_REQUIRE: &str = "NVIDIA_DISABLE_REQUIRE=1";
/// Keeps the detached container alive until it is stopped
pub const CONTAINER_ENTRYPOINT: &str = "/bin/bash";

/// Logs a warning if a step ran but was unsuccessful. Docker failures do not
/// stop the lifecycle.
fn note_status(step: &str, comres: &CommandResult) {
    if !comres.successful() {
        warn!(
            "{step} step was unsuccessful ({}), continuing: {}",
            comres
                .code()
                .map_or_else(|| "no exit code".to_owned(), |c| format!("exit code {c}")),
            comres.command
        );
    }
}

/// The docker commands for one development container, derived from a
/// `LifecycleConfig`
#[derive(Debug, Clone, Copy)]
pub struct DevContainer<'a> {
    pub config: &'a LifecycleConfig,
}

impl<'a> DevContainer<'a> {
    pub fn new(config: &'a LifecycleConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.container_name
    }

    /// `docker build` for the image tag, with the SDK image as a build arg.
    /// The build context is the working directory.
    pub fn build_command(&self) -> Result<Command> {
        let config = self.config;
        Ok(Command::new("docker build")
            .arg("--file")
            .arg(path_to_string(&config.dockerfile)?)
            .arg("--build-arg")
            .arg(format!("SDK_IMAGE={}", config.sdk_image))
            .arg("--tag")
            .arg(&config.image)
            .arg(".")
            .cwd(&config.source_dir))
    }

    /// `docker run` that starts the detached container with its mounts
    pub fn run_command(&self) -> Command {
        let config = self.config;
        let source = config.source_dir.trim_end_matches('/');
        let home = config.identity.home.trim_end_matches('/');
        Command::new("docker run --rm --gpus all")
            .args(["--env", NVIDIA_DISABLE_REQUIRE])
            .args(["--name", self.name()])
            .args(["--detach", "--tty", "--privileged", "--network", "host"])
            .arg("--volume")
            .arg(format!("{source}:{SOURCE_MOUNT}"))
            .arg("--volume")
            .arg(format!("{source}/{PROJECT_ENV_DIR}:{ENV_MOUNT}"))
            .arg("--volume")
            .arg(format!("{home}/:{home}"))
            .arg(&config.image)
            .arg(CONTAINER_ENTRYPOINT)
    }

    /// The script run as root in the container to create the host user
    pub fn provision_script(&self) -> String {
        let id = &self.config.identity;
        format!(
            "groupadd -g {gid} {group} && mkdir -p {home} && useradd -u {uid} -g {group} -s \
             /bin/bash -d {home} {user} && chmod 755 {home} && chown {user}:{group} {home}",
            gid = id.gid,
            uid = id.uid,
            group = id.group,
            user = id.user,
            home = id.home,
        )
    }

    pub fn provision_command(&self) -> Command {
        Command::new("docker exec")
            .arg(self.name())
            .args(["sh", "-c"])
            .arg(self.provision_script())
    }

    /// `docker exec` of the configured shell as the host user, starting in the
    /// mounted source directory
    pub fn shell_command(&self) -> Command {
        let config = self.config;
        Command::new("docker exec --interactive --tty")
            .arg("--user")
            .arg(config.identity.user_group())
            .arg(self.name())
            .args([CONTAINER_ENTRYPOINT, "-c"])
            .arg(format!("cd {SOURCE_MOUNT} && {}", config.shell))
            .interactive(true)
    }

    pub fn stop_command(&self) -> Command {
        Command::new("docker stop").arg(self.name())
    }

    pub fn remove_command(&self) -> Command {
        Command::new("docker rm").arg(self.name())
    }

    /// Runs `docker build`. An unsuccessful build is logged and the lifecycle
    /// goes on with whatever image exists under the tag.
    pub async fn build<E: Executor>(&self, exec: &mut E) -> Result<()> {
        let config = self.config;
        // not fatal, docker reports a missing dockerfile itself
        match acquire_file_path(&config.dockerfile).await {
            Ok(path) => debug!("DevContainer::build using dockerfile {path:?}"),
            Err(e) => warn!("DevContainer::build -> dockerfile may be missing: {e}"),
        }
        info!(
            "Building image {} from {:?}...",
            config.image, config.dockerfile
        );
        let comres = exec
            .execute(self.build_command()?)
            .await
            .stack_err_locationless("DevContainer::build")?;
        note_status("build", &comres);
        Ok(())
    }

    /// Runs `docker run`, returning the guard that is responsible for stopping
    /// and removing the container. If `docker run` could not be spawned, the
    /// teardown is still attempted before the error is returned.
    pub async fn start<E: Executor>(self, exec: &mut E) -> Result<RunningContainer<'a>> {
        info!("Creating container {} ...", self.name());
        let running = RunningContainer {
            container: self,
            remove_on_drop: exec.spawns_processes(),
            torn_down: false,
        };
        match exec.execute(self.run_command()).await {
            Ok(comres) => {
                note_status("run", &comres);
                Ok(running)
            }
            Err(e) => {
                if let Err(teardown_err) = running.teardown(exec).await {
                    warn!("DevContainer::start -> teardown also failed: {teardown_err}");
                }
                Err(e).stack_err_locationless("DevContainer::start")
            }
        }
    }
}

/// A started container. [RunningContainer::teardown] should always be called,
/// if the guard is dropped without it (e.x. because of a panic or a cancelled
/// future) the container is force removed with a blocking `docker rm --force`.
#[must_use]
#[derive(Debug)]
pub struct RunningContainer<'a> {
    container: DevContainer<'a>,
    remove_on_drop: bool,
    torn_down: bool,
}

impl<'a> RunningContainer<'a> {
    pub fn container(&self) -> DevContainer<'a> {
        self.container
    }

    /// Creates the host group and user inside the container
    pub async fn provision<E: Executor>(&self, exec: &mut E) -> Result<()> {
        let comres = exec
            .execute(self.container.provision_command())
            .await
            .stack_err_locationless("RunningContainer::provision")?;
        note_status("provision", &comres);
        Ok(())
    }

    /// Attaches the terminal to the configured shell and waits for it to exit
    pub async fn open_shell<E: Executor>(&self, exec: &mut E) -> Result<CommandResult> {
        info!("Opening shell in container {}...", self.container.name());
        exec.execute(self.container.shell_command())
            .await
            .stack_err_locationless("RunningContainer::open_shell")
    }

    /// Runs `docker stop` and then `docker rm`. The remove is attempted even if
    /// the stop could not be spawned, the first error is returned.
    pub async fn teardown<E: Executor>(mut self, exec: &mut E) -> Result<()> {
        // from here on the guard is released, even if the commands fail
        self.torn_down = true;
        info!("Stopping container {}...", self.container.name());
        let stop = exec.execute(self.container.stop_command()).await;
        let remove = exec.execute(self.container.remove_command()).await;
        if let Ok(comres) = &stop {
            note_status("stop", comres);
        }
        if let Ok(comres) = &remove {
            note_status("remove", comres);
        }
        stop.stack_err_locationless("RunningContainer::teardown -> docker stop")?;
        remove.stack_err_locationless("RunningContainer::teardown -> docker rm")?;
        Ok(())
    }
}

impl Drop for RunningContainer<'_> {
    fn drop(&mut self) {
        if self.torn_down || !self.remove_on_drop {
            return
        }
        let name = self.container.name();
        warn!("RunningContainer dropped without teardown, force removing container {name}");
        let res = std::process::Command::new("docker")
            .args(["rm", "--force", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = res {
            warn!("could not run `docker rm --force {name}`: {e}");
        }
    }
}
