use thiserror::Error;

/// Errors raised while parsing credentials or producing tokens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Connection string cannot be empty")]
    EmptyConnectionString,

    #[error("Missing {0} in connection string")]
    MissingField(&'static str),

    #[error("Invalid connection string segment: {0}")]
    InvalidSegment(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error("Token provider failed: {0}")]
    Provider(String),
}
