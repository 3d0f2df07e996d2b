use std::{ffi::OsString, path::PathBuf};

use clap::{CommandFactory, FromArgMatches, Parser};
use stacked_errors::{Result, StackableErr};

use crate::{absolutize, expand_home, path_to_string, HostContext, HostIdentity, UsageError};

/// Used when `--dev-dockerfile` is not passed
pub const DEFAULT_DEV_DOCKERFILE: &str = "~/.config/devcontainer/Dockerfile";
/// Joined onto `$XDG_CONFIG_HOME` when `--dev-dockerfile` is passed without a
/// value
pub const CONFIG_DEV_DOCKERFILE: &str = "devcontainer/Dockerfile";
pub const DEFAULT_SHELL: &str = "/bin/zsh";
pub const DEFAULT_CONTAINER_NAME: &str = "dev";
pub const TEMPLATES_DIR_ENV: &str = "DEVCONTAINER_TEMPLATES_DIR";

// The value options take an optional value, `--image` on its own counts as if
// the image was not given at all.

/// Run an interactive shell in a disposable docker container that mirrors the
/// host user.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version)]
pub struct Args {
    /// Install this program into ~/.local/bin
    #[arg(long)]
    pub install: bool,
    /// Print a Dockerfile template
    #[arg(long, value_name = "NAME")]
    pub generate_template: Option<Option<String>>,
    /// Development dockerfile to use [default: ~/.config/devcontainer/Dockerfile]
    #[arg(long, value_name = "PATH")]
    pub dev_dockerfile: Option<Option<String>>,
    /// Docker image to use as a base, passed as the SDK_IMAGE build argument
    #[arg(long, value_name = "NAME")]
    pub sdk_image: Option<Option<String>>,
    /// Docker image to use
    #[arg(long, value_name = "NAME")]
    pub image: Option<Option<String>>,
    /// Build the docker image before running
    #[arg(long)]
    pub build: bool,
    /// Shell to use in the container [default: /bin/zsh]
    #[arg(long, value_name = "PATH")]
    pub shell: Option<Option<String>>,
    /// Name of the container
    #[arg(long, default_value = DEFAULT_CONTAINER_NAME)]
    pub name: String,
    /// Print docker commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
    /// Directory containing `Dockerfile.<name>` templates [default: templates/
    /// beside the executable]
    #[arg(long, env = TEMPLATES_DIR_ENV, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// What a single invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install,
    GenerateTemplate(String),
    Lifecycle(LifecycleConfig),
}

/// Everything the container lifecycle needs, resolved once before anything
/// runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub container_name: String,
    /// Tag of the image that is built and run
    pub image: String,
    /// Absolute path to the development dockerfile
    pub dockerfile: PathBuf,
    /// Passed as `--build-arg SDK_IMAGE=...`, may be empty
    pub sdk_image: String,
    pub shell: String,
    pub build: bool,
    /// Host directory mounted as the source directory
    pub source_dir: String,
    pub identity: HostIdentity,
}

impl Args {
    /// The clap command with the available template names listed in the help
    pub fn command_with_templates(template_names: &[String]) -> clap::Command {
        let available = if template_names.is_empty() {
            "none found".to_owned()
        } else {
            template_names.join(", ")
        };
        Self::command().mut_arg("generate_template", |arg| {
            arg.help(format!("Print a Dockerfile template [available: {available}]"))
        })
    }

    /// Parses the process arguments, exiting with a usage message on failure
    pub fn parse_with_templates(template_names: &[String]) -> Self {
        let matches = Self::command_with_templates(template_names).get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    /// The `--templates-dir` given on the command line, found before parsing so
    /// that the help can list the templates in it
    pub fn templates_dir_in<I, T>(args: I) -> Option<PathBuf>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut dir = None;
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            if arg == "--" {
                break
            } else if arg == "--templates-dir" {
                dir = args.next().map(PathBuf::from);
            } else if let Some(value) = arg
                .to_str()
                .and_then(|a| a.strip_prefix("--templates-dir="))
            {
                dir = Some(PathBuf::from(value));
            }
        }
        dir.filter(|d| !d.as_os_str().is_empty())
    }

    pub fn try_parse_from_with_templates<I, T>(
        template_names: &[String],
        args: I,
    ) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command_with_templates(template_names).try_get_matches_from(args)?;
        Self::from_arg_matches(&matches)
    }

    /// Decides what to do. Install takes precedence over templates, which take
    /// precedence over running a container.
    pub fn action(&self, host: &HostContext) -> Result<Action> {
        if self.install {
            return Ok(Action::Install)
        }
        if let Some(name) = self.generate_template.clone().flatten() {
            return Ok(Action::GenerateTemplate(name))
        }
        self.lifecycle_config(host)
            .map(Action::Lifecycle)
            .stack_err_locationless("Args::action")
    }

    /// Resolves the dockerfile path. `~` is expanded and relative paths are
    /// taken relative to the working directory.
    pub fn dockerfile_path(&self, host: &HostContext) -> Result<PathBuf> {
        let dockerfile = match &self.dev_dockerfile {
            None => PathBuf::from(DEFAULT_DEV_DOCKERFILE),
            Some(Some(path)) => PathBuf::from(path),
            Some(None) => match &host.xdg_config_home {
                Some(config_dir) => config_dir.join(CONFIG_DEV_DOCKERFILE),
                None => return Err(UsageError::MissingDockerfile).stack(),
            },
        };
        let dockerfile = if dockerfile.starts_with("~") {
            expand_home(&dockerfile, host.home()?)
        } else {
            dockerfile
        };
        Ok(absolutize(dockerfile, &host.cwd))
    }

    pub fn lifecycle_config(&self, host: &HostContext) -> Result<LifecycleConfig> {
        let image = self
            .image
            .clone()
            .flatten()
            .ok_or(UsageError::MissingImage)
            .stack()?;
        let dockerfile = self.dockerfile_path(host)?;
        Ok(LifecycleConfig {
            container_name: self.name.clone(),
            image,
            dockerfile,
            sdk_image: self.sdk_image.clone().flatten().unwrap_or_default(),
            shell: self
                .shell
                .clone()
                .flatten()
                .unwrap_or_else(|| DEFAULT_SHELL.to_owned()),
            build: self.build,
            source_dir: path_to_string(&host.cwd)?,
            identity: host.identity()?,
        })
    }
}
