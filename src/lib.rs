//! See README.md for more

mod command;
mod config;
mod error;
mod executor;
mod identity;
mod install;
mod misc;
mod paths;
mod templates;

/// The development container lifecycle, using the "docker" OS command as a
/// backend.
pub mod cli_docker;
pub use command::*;
pub use config::*;
pub use error::*;
pub use executor::*;
pub use identity::*;
pub use install::*;
pub use misc::*;
pub use paths::*;
pub use templates::*;
/// This reexport helps with dependency wrangling
pub use stacked_errors;
