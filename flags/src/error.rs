use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlagError>;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("Unknown feature flag '{0}'")]
    UnknownFlag(String),

    #[error("Feature flag '{0}' is declared more than once")]
    DuplicateFlag(String),

    #[error("Telemetry sink rejected usage record: {0}")]
    Telemetry(String),
}
