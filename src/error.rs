/// Errors caused by how the tool was invoked or the environment it was invoked
/// in. These are lifted into `stacked_errors::Error` with `.stack()` and end
/// the process with exit status 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("No image specified.")]
    MissingImage,
    #[error("No dockerfile specified.")]
    MissingDockerfile,
    #[error("Template {0} does not exist.")]
    UnknownTemplate(String),
    #[error("Source location is the same as install location.")]
    InstallCollision,
    #[error("the {0} environment variable is not set")]
    MissingEnv(&'static str),
    #[error("path {0:?} is not UTF-8")]
    NonUtf8Path(std::path::PathBuf),
}
