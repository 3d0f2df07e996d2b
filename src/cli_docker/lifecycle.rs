use stacked_errors::{bail, Result, StackableErr};
use tracing::{info, warn};

use crate::{
    cli_docker::{DevContainer, RunningContainer},
    ctrlc_issued_reset, CommandResult, Executor, LifecycleConfig,
};

async fn attach<E: Executor>(
    running: &RunningContainer<'_>,
    exec: &mut E,
) -> Result<CommandResult> {
    running.provision(exec).await?;
    running.open_shell(exec).await
}

/// Builds the image if requested, then runs the container, provisions the host
/// user, and attaches the shell. The container is stopped and removed after
/// the shell exits no matter how it exits. Returns the result of the shell.
///
/// Unsuccessful docker commands are logged and do not stop the lifecycle, an
/// error is only returned if a command could not be run at all.
pub async fn run_lifecycle<E: Executor>(
    exec: &mut E,
    config: &LifecycleConfig,
) -> Result<CommandResult> {
    let container = DevContainer::new(config);
    if config.build {
        container
            .build(exec)
            .await
            .stack_err_locationless("run_lifecycle")?;
        // nothing has been started yet, so an interrupted build can just stop here
        if ctrlc_issued_reset() {
            let image = &config.image;
            bail!("run_lifecycle -> interrupted while building {image}")
        }
    }
    let running = container
        .start(exec)
        .await
        .stack_err_locationless("run_lifecycle")?;

    let shell = attach(&running, exec).await;
    if ctrlc_issued_reset() {
        info!("interrupted, tearing down container {}", config.container_name);
    }
    let teardown = running.teardown(exec).await;

    let shell = match shell {
        Ok(shell) => shell,
        Err(e) => {
            if let Err(teardown) = teardown {
                warn!("teardown after a failed shell also failed: {teardown:?}");
            }
            return Err(e).stack_err_locationless("run_lifecycle")
        }
    };
    teardown.stack_err_locationless("run_lifecycle")?;
    if !shell.successful() {
        warn!(
            "the shell in container {} exited unsuccessfully",
            config.container_name
        );
    }
    Ok(shell)
}
