//! Error types for the retirement tool.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T> = std::result::Result<T, CodemodError>;

#[derive(Debug, Error)]
pub enum CodemodError {
    #[error("Feature flag registry not found at {path}")]
    RegistryNotFound { path: PathBuf },

    #[error("Failed to parse feature flag registry {path}: {reason}")]
    RegistryParse { path: PathBuf, reason: String },

    #[error("Failed to read file {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Call-site search failed")]
    Search(#[source] anyhow::Error),

    #[error("Version control step failed")]
    Git(#[from] flagkit_git_tooling::GitToolingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CodemodError {
    pub(crate) fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        CodemodError::RegistryParse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
