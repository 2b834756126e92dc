use thiserror::Error;

pub type PacingResult<T> = Result<T, PacingError>;

#[derive(Error, Debug)]
pub enum PacingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown period: {0}")]
    InvalidPeriod(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PacingError {
    /// Shorthand for the most common construction in validation paths.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
