use std::sync::atomic::{AtomicBool, Ordering};

use stacked_errors::{Result, StackableErr};
use tracing_subscriber::EnvFilter;

/// Set by the handler installed in [std_init]
pub static CTRLC_ISSUED: AtomicBool = AtomicBool::new(false);

/// Sets up `tracing_subscriber` (writing to stderr, so that printed templates
/// stay clean on stdout) and the ctrl-c handler. `RUST_LOG` overrides the
/// default level of `info`, or `debug` if `verbose`.
///
/// The handler only records the interrupt. The interactive shell shares our
/// process group and receives the same signal, and this process has to survive
/// it to tear the container down.
pub fn std_init(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
    ctrlc::set_handler(move || {
        CTRLC_ISSUED.store(true, Ordering::SeqCst);
    })
    .stack_err("std_init -> could not set the ctrl-c handler")?;
    Ok(())
}

/// Returns if `CTRLC_ISSUED` has been set, and resets it to `false`
pub fn ctrlc_issued_reset() -> bool {
    CTRLC_ISSUED.swap(false, Ordering::SeqCst)
}
