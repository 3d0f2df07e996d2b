use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use stacked_errors::{Result, StackableErr};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::{config::TEMPLATES_DIR_ENV, UsageError};

/// Template files are named `Dockerfile.<name>`
pub const TEMPLATE_PREFIX: &str = "Dockerfile.";
/// The directory, next to the executable, that holds the templates
pub const TEMPLATES_DIR: &str = "templates";

/// A directory of Dockerfile templates that can be listed and printed by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub dir: PathBuf,
}

impl Templates {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    /// Uses the directory named by the templates environment variable if it is
    /// set, or else `templates/` next to the running executable. Debug builds
    /// run out of a cargo target directory, which has no templates, and fall
    /// back to the ones shipped with the source.
    pub fn default_location() -> Result<Self> {
        if let Some(dir) = env::var_os(TEMPLATES_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir))
        }
        let exe = env::current_exe().stack_err("Templates::default_location -> current_exe")?;
        // resolve symlinks so that the `devcon` link finds the installed templates
        let exe = dunce::canonicalize(&exe)
            .stack_err_with(|| format!("Templates::default_location -> canonicalize {exe:?}"))?;
        let dir = exe
            .parent()
            .stack_err("Templates::default_location -> executable has no parent")?;
        let beside = dir.join(TEMPLATES_DIR);
        #[cfg(debug_assertions)]
        {
            let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join(TEMPLATES_DIR);
            if !beside.is_dir() && shipped.is_dir() {
                return Ok(Self::new(shipped))
            }
        }
        Ok(Self::new(beside))
    }

    /// Path to the template file for `name`, whether or not it exists
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{TEMPLATE_PREFIX}{name}"))
    }

    /// The sorted names of all the templates. A missing directory has no
    /// templates.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Templates::names -> no templates directory at {:?}", self.dir);
                return Ok(vec![])
            }
            Err(e) => {
                return Err(e).stack_err_with(|| format!("Templates::names -> {:?}", self.dir))
            }
        };
        let mut names = vec![];
        while let Some(entry) = entries.next_entry().await.stack()? {
            let file_name = entry.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|s| s.strip_prefix(TEMPLATE_PREFIX))
            else {
                continue
            };
            if name.is_empty() || !entry.file_type().await.stack()?.is_file() {
                continue
            }
            names.push(name.to_owned());
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Reads the contents of the template `name`
    pub async fn read(&self, name: &str) -> Result<String> {
        // only names that were discovered are allowed, this also keeps names with
        // path separators from escaping the directory
        if !self.names().await?.iter().any(|n| n == name) {
            return Err(UsageError::UnknownTemplate(name.to_owned())).stack()
        }
        let path = self.path(name);
        fs::read_to_string(&path)
            .await
            .stack_err_with(|| format!("Templates::read -> {path:?}"))
    }

    /// Prints the template `name` to stdout verbatim
    pub async fn generate(&self, name: &str) -> Result<()> {
        let contents = self.read(name).await?;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(contents.as_bytes()).await.stack()?;
        stdout.flush().await.stack()?;
        Ok(())
    }
}
