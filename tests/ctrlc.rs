//! `CTRLC_ISSUED` is process global, so these run in their own test binary
//! and in a single test.

mod common;

use std::sync::atomic::Ordering;

use common::{docker_steps, lifecycle_config, steps};
use devcontainer::{cli_docker::run_lifecycle, DryRunExecutor, CTRLC_ISSUED};
use stacked_errors::{ensure, ensure_eq, Result, StackableErr};

#[tokio::test]
async fn ctrlc_skips_start_after_build_but_not_teardown() -> Result<()> {
    // interrupted while building, nothing is started
    let config = lifecycle_config(&["--image", "foo", "--build"])?;
    let mut exec = DryRunExecutor::default();
    CTRLC_ISSUED.store(true, Ordering::SeqCst);
    ensure!(run_lifecycle(&mut exec, &config).await.is_err());
    ensure_eq!(steps(&exec.commands), docker_steps(&["build"]));
    // the flag is consumed
    ensure!(!CTRLC_ISSUED.load(Ordering::SeqCst));

    // interrupted while attached, the container is still torn down
    let config = lifecycle_config(&["--image", "foo"])?;
    let mut exec = DryRunExecutor::default();
    CTRLC_ISSUED.store(true, Ordering::SeqCst);
    let shell = run_lifecycle(&mut exec, &config).await.stack()?;
    ensure!(shell.successful());
    ensure_eq!(
        steps(&exec.commands),
        docker_steps(&["run", "exec", "exec", "stop", "rm"])
    );
    ensure!(!CTRLC_ISSUED.load(Ordering::SeqCst));
    Ok(())
}
