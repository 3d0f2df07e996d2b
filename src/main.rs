use std::env;

use devcontainer::{
    cli_docker::run_lifecycle, std_init, Action, Args, DryRunExecutor, Executor, HostContext,
    Installer, LifecycleConfig, OsExecutor, Templates,
};
use stacked_errors::{Result, StackableErr};
use tracing::debug;

async fn lifecycle<E: Executor>(mut exec: E, config: &LifecycleConfig) -> Result<()> {
    let shell = run_lifecycle(&mut exec, config).await.stack()?;
    debug!("shell finished: {shell:?}");
    Ok(())
}

async fn install<E: Executor>(
    mut exec: E,
    templates: &Templates,
    host: &HostContext,
) -> Result<()> {
    Installer::for_current_exe(templates, host.home()?)
        .stack()?
        .install(&mut exec)
        .await
        .stack()
}

#[tokio::main]
async fn main() -> Result<()> {
    let templates = match Args::templates_dir_in(env::args_os().skip(1)) {
        Some(dir) => Templates::new(dir),
        None => Templates::default_location().stack()?,
    };
    let template_names = templates.names().await.stack()?;
    let args = Args::parse_with_templates(&template_names);
    std_init(args.verbose).stack()?;
    debug!("{args:?}");

    let templates = args
        .templates_dir
        .as_ref()
        .map_or(templates, Templates::new);
    let host = HostContext::capture().stack()?;
    match args.action(&host).stack()? {
        Action::Install => {
            if args.dry_run {
                install(DryRunExecutor::echo(), &templates, &host).await
            } else {
                install(OsExecutor, &templates, &host).await
            }
        }
        Action::GenerateTemplate(name) => templates.generate(&name).await.stack(),
        Action::Lifecycle(config) => {
            debug!("{config:#?}");
            if args.dry_run {
                lifecycle(DryRunExecutor::echo(), &config).await
            } else {
                lifecycle(OsExecutor, &config).await
            }
        }
    }
}
