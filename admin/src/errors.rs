use crate::atom::{AtomError, DurationError};
use crate::auth::AuthError;
use thiserror::Error;

/// Errors returned by [`AdminClient`](crate::client::AdminClient) operations.
///
/// Transport and service failures keep the underlying [`AtomError`] as their
/// source, so [`not_found`](crate::atom::not_found) and
/// [`status_code`](AdminError::status_code) see through this type.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Atom(#[from] AtomError),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    InvalidDuration(#[from] DurationError),

    #[error("unknown filter type {0:?}")]
    UnknownFilterType(String),

    #[error("unknown rule action type {0:?}")]
    UnknownActionType(String),

    #[error("invalid value {value:?} for parameter {key:?} of type {type_name:?}")]
    InvalidParameter {
        key: String,
        type_name: String,
        value: String,
    },

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid {0} runtime properties: no CountDetails element")]
    MissingCountDetails(&'static str),

    #[error("unknown access right {0:?}")]
    UnknownAccessRight(String),

    #[error("invalid namespace properties: no {0} element")]
    MissingNamespaceElement(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl AdminError {
    /// HTTP status of the failed response, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AdminError::Atom(e) => e.status_code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{ResponseError, not_found};

    #[test]
    fn not_found_sees_through_admin_error() {
        let err = AdminError::from(AtomError::Response(ResponseError {
            status: 404,
            message: "error code: 404, Details: missing".to_string(),
            body: String::new(),
        }));
        assert!(not_found(&err));
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "error code: 404, Details: missing");
    }

    #[test]
    fn conversion_errors_are_not_not_found() {
        let err = AdminError::UnknownFilterType("FancyFilter".to_string());
        assert!(!not_found(&err));
        assert_eq!(err.status_code(), None);
        assert_eq!(
            AdminError::MissingCountDetails("queue").to_string(),
            "invalid queue runtime properties: no CountDetails element"
        );
    }
}
