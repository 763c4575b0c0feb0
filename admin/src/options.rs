use crate::errors::AdminError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest page the management endpoint returns for a `$top` query.
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client-wide settings. Deserializable so it can be embedded in an
/// application's configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminClientOptions {
    /// Items requested per list page when the call does not say otherwise
    pub page_size: usize,
    /// Per request HTTP timeout
    pub timeout_secs: u64,
}

impl Default for AdminClientOptions {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AdminClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), AdminError> {
        if self.page_size == 0 {
            return Err(AdminError::InvalidArgument(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AdminError::InvalidArgument(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Options for list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Page size for this listing; the client default when `None`
    pub max_page_size: Option<usize>,
}

impl ListOptions {
    pub fn with_page_size(max_page_size: usize) -> Self {
        Self {
            max_page_size: Some(max_page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    #[test]
    fn defaults() {
        let options = AdminClientOptions::default();
        assert_eq!(options.page_size, 100);
        assert_eq!(options.timeout(), Duration::from_secs(60));
        assert_ok!(options.validate());
    }

    #[test]
    fn rejects_zero_values() {
        let zero_page = AdminClientOptions {
            page_size: 0,
            ..Default::default()
        };
        assert_err!(zero_page.validate());

        let zero_timeout = AdminClientOptions {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_err!(zero_timeout.validate());
    }
}
