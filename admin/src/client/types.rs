use crate::errors::AdminError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

/// Lifecycle state of a queue, topic or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    Active,
    Disabled,
    Restoring,
    SendDisabled,
    ReceiveDisabled,
    Creating,
    Deleting,
    Renaming,
    Unknown,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Active => "Active",
            EntityStatus::Disabled => "Disabled",
            EntityStatus::Restoring => "Restoring",
            EntityStatus::SendDisabled => "SendDisabled",
            EntityStatus::ReceiveDisabled => "ReceiveDisabled",
            EntityStatus::Creating => "Creating",
            EntityStatus::Deleting => "Deleting",
            EntityStatus::Renaming => "Renaming",
            EntityStatus::Unknown => "Unknown",
        }
    }

    /// Parses the wire value; anything unrecognised maps to `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Active" => EntityStatus::Active,
            "Disabled" => EntityStatus::Disabled,
            "Restoring" => EntityStatus::Restoring,
            "SendDisabled" => EntityStatus::SendDisabled,
            "ReceiveDisabled" => EntityStatus::ReceiveDisabled,
            "Creating" => EntityStatus::Creating,
            "Deleting" => EntityStatus::Deleting,
            "Renaming" => EntityStatus::Renaming,
            _ => EntityStatus::Unknown,
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn status_from_wire(value: Option<String>) -> Option<EntityStatus> {
    value.as_deref().map(EntityStatus::from_wire)
}

pub(crate) fn status_to_wire(status: Option<EntityStatus>) -> Option<String> {
    status.map(|s| s.as_str().to_string())
}

/// Parses a service timestamp. The service writes RFC 3339, except for
/// "never" values such as `0001-01-01T00:00:00` which carry no offset and
/// are taken as UTC.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AdminError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| AdminError::InvalidTimestamp(value.to_string()))
}

pub(crate) fn parse_optional_timestamp(
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, AdminError> {
    value.map(parse_timestamp).transpose()
}

/// Rejects empty entity names before they turn into odd URLs.
pub(crate) fn require_name(kind: &str, name: &str) -> Result<(), AdminError> {
    if name.trim().is_empty() {
        return Err(AdminError::InvalidArgument(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use claims::{assert_err, assert_ok_eq};

    #[test]
    fn status_round_trips_and_tolerates_unknown() {
        for status in [
            EntityStatus::Active,
            EntityStatus::SendDisabled,
            EntityStatus::ReceiveDisabled,
        ] {
            assert_eq!(EntityStatus::from_wire(status.as_str()), status);
        }
        assert_eq!(EntityStatus::from_wire("Sleeping"), EntityStatus::Unknown);
    }

    #[test]
    fn parses_both_timestamp_forms() {
        assert_ok_eq!(
            parse_timestamp("2020-01-02T03:04:05.1234567Z"),
            Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()
                + chrono::Duration::nanoseconds(123_456_700)
        );
        assert_ok_eq!(
            parse_timestamp("0001-01-01T00:00:00"),
            Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
        );
        assert_err!(parse_timestamp("yesterday"));
    }
}
