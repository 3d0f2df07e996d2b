use std::path::{Component, Path, PathBuf};

use stacked_errors::{bail, Result, StackableErr};
use tokio::fs;

use crate::UsageError;

/// Canonicalizes and checks the existence of a path. Also adds on better
/// information to errors.
///
/// Note: this does not prevent TOCTOU bugs.
pub async fn acquire_path(path_str: impl AsRef<Path>) -> Result<PathBuf> {
    // note: we don't need fs::try_exists because the canonicalization deals with
    // testing for existence and the symbolic links
    let path = path_str.as_ref();
    let path = fs::canonicalize(path)
        .await
        .stack_err_with(|| format!("acquire_path(path_str: {path:?})"))?;
    Ok(dunce::simplified(&path).to_owned())
}

/// Canonicalizes and checks the existence of a file path. Also adds on better
/// information to errors.
pub async fn acquire_file_path(file_path_str: impl AsRef<Path>) -> Result<PathBuf> {
    let file_path_str = file_path_str.as_ref();
    let path = acquire_path(file_path_str)
        .await
        .stack_err_with(|| format!("acquire_file_path(file_path_str: {file_path_str:?})"))?;
    if path.is_file() {
        Ok(path)
    } else {
        bail!("acquire_file_path(file_path_str: {file_path_str:?}) -> is not a file")
    }
}

/// Canonicalizes and checks the existence of a directory path. Also adds on
/// better information to errors.
pub async fn acquire_dir_path(dir_path_str: impl AsRef<Path>) -> Result<PathBuf> {
    let dir_path_str = dir_path_str.as_ref();
    let path = acquire_path(dir_path_str)
        .await
        .stack_err_with(|| format!("acquire_dir_path(dir_path_str: {dir_path_str:?})"))?;
    if path.is_dir() {
        Ok(path)
    } else {
        bail!("acquire_dir_path(dir_path_str: {dir_path_str:?}) -> is not a directory")
    }
}

/// Replaces a leading `~` component with `home`. `~user` forms are left alone.
pub fn expand_home(path: impl AsRef<Path>, home: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => home.as_ref().join(rest),
        Err(_) => path.to_owned(),
    }
}

/// Joins relative paths onto `cwd` and lexically removes `.` and `..`
/// components. Symbolic links are not resolved.
pub fn absolutize(path: impl AsRef<Path>, cwd: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let joined = if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.as_ref().join(path)
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Returns `path` as a `String`, or a `UsageError::NonUtf8Path`
pub fn path_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| UsageError::NonUtf8Path(path.to_owned()))
        .stack()
}
