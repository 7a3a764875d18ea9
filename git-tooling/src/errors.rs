use thiserror::Error;

pub type Result<T> = std::result::Result<T, GitToolingError>;

#[derive(Debug, Error)]
pub enum GitToolingError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}
