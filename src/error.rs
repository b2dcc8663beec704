// ABOUTME: Application-wide error types for pagepush.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::cleanup::CleanupError;
use crate::deploy::{DeployError, DeployFailure, VerifyError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no repository given: set `repository` in the config or GITHUB_REPOSITORY")]
    MissingRepository,

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    DeployFailed(#[from] Box<DeployFailure>),

    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<DeployFailure> for Error {
    fn from(failure: DeployFailure) -> Self {
        Error::DeployFailed(Box::new(failure))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
