use std::error::Error as StdError;
use thiserror::Error;

/// A management endpoint response with an HTTP status of 400 or above.
///
/// The `message` field holds the normalised management error text
/// (`error code: <code>, Details: <detail>`), or the raw body together with the
/// parse failure when the body is not a management error document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ResponseError {
    /// HTTP status code returned by the service
    pub status: u16,
    /// Normalised error message
    pub message: String,
    /// Raw response body as received
    pub body: String,
}

/// Errors produced by the ATOM pipeline and the entity manager.
#[derive(Debug, Error)]
pub enum AtomError {
    /// The service answered a list or get with the empty "service feed",
    /// which is how it signals that the requested entity does not exist.
    #[error("entity does not exist")]
    EntityNotFound,

    #[error("{0}")]
    Response(#[from] ResponseError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    #[error("failed to deserialize response body: {0}")]
    Deserialization(String),

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AtomError {
    /// HTTP status of the failed response, if the error came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AtomError::Response(response) => Some(response.status),
            AtomError::EntityNotFound => Some(404),
            _ => None,
        }
    }

    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AtomError::Transport { .. } | AtomError::Timeout { .. } | AtomError::Cancelled { .. }
        )
    }
}

/// Reports whether `err`, or any error in its `source()` chain, means that the
/// requested entity does not exist.
///
/// Both the empty-feed signal ([`AtomError::EntityNotFound`]) and a plain
/// `404` response are recognised.
pub fn not_found(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(error) = current {
        if let Some(AtomError::EntityNotFound) = error.downcast_ref::<AtomError>() {
            return true;
        }
        if let Some(response) = error.downcast_ref::<ResponseError>() {
            if response.status == 404 {
                return true;
            }
        }
        current = error.source();
    }
    false
}
