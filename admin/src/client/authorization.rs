//! Shared access authorization rules attached to queues and topics.

use super::types::parse_optional_timestamp;
use crate::atom::{AccessRightsList, AuthorizationRuleDescription, AuthorizationRules};
use crate::errors::AdminError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

const RULE_TYPE: &str = "SharedAccessAuthorizationRule";
const CLAIM_TYPE: &str = "SharedAccessKey";
const CLAIM_VALUE: &str = "None";

/// Operation a shared access key is allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRight {
    Manage,
    Send,
    Listen,
}

impl AccessRight {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRight::Manage => "Manage",
            AccessRight::Send => "Send",
            AccessRight::Listen => "Listen",
        }
    }
}

impl fmt::Display for AccessRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessRight {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Manage" => Ok(AccessRight::Manage),
            "Send" => Ok(AccessRight::Send),
            "Listen" => Ok(AccessRight::Listen),
            other => Err(AdminError::UnknownAccessRight(other.to_string())),
        }
    }
}

/// A named shared access key with its rights.
///
/// Keys left unset on create are generated by the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizationRule {
    pub access_rights: Vec<AccessRight>,
    pub key_name: Option<String>,
    pub primary_key: Option<String>,
    pub secondary_key: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Wire list for `rules`; an empty list leaves the element out.
pub(crate) fn to_authorization_rules(rules: &[AuthorizationRule]) -> Option<AuthorizationRules> {
    if rules.is_empty() {
        return None;
    }
    let rules = rules
        .iter()
        .map(|rule| AuthorizationRuleDescription {
            rule_type: RULE_TYPE.to_string(),
            claim_type: Some(CLAIM_TYPE.to_string()),
            claim_value: Some(CLAIM_VALUE.to_string()),
            rights: Some(AccessRightsList {
                rights: rule
                    .access_rights
                    .iter()
                    .map(|right| right.as_str().to_string())
                    .collect(),
            }),
            created_time: rule
                .created_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            modified_time: rule
                .modified_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            key_name: rule.key_name.clone(),
            primary_key: rule.primary_key.clone(),
            secondary_key: rule.secondary_key.clone(),
        })
        .collect();
    Some(AuthorizationRules { rules })
}

pub(crate) fn from_authorization_rules(
    rules: Option<AuthorizationRules>,
) -> Result<Vec<AuthorizationRule>, AdminError> {
    rules
        .map(|list| list.rules)
        .unwrap_or_default()
        .into_iter()
        .map(|rule| {
            let access_rights = rule
                .rights
                .map(|list| list.rights)
                .unwrap_or_default()
                .iter()
                .map(|right| right.parse())
                .collect::<Result<Vec<AccessRight>, _>>()?;
            Ok(AuthorizationRule {
                access_rights,
                key_name: rule.key_name,
                primary_key: rule.primary_key,
                secondary_key: rule.secondary_key,
                created_time: parse_optional_timestamp(rule.created_time.as_deref())?,
                modified_time: parse_optional_timestamp(rule.modified_time.as_deref())?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_matches, assert_none, assert_ok};

    #[test]
    fn empty_rule_list_is_omitted() {
        assert_none!(to_authorization_rules(&[]));
        assert_eq!(assert_ok!(from_authorization_rules(None)), Vec::new());
    }

    #[test]
    fn rules_carry_shared_access_claims_and_round_trip() {
        let rules = vec![AuthorizationRule {
            access_rights: vec![AccessRight::Send, AccessRight::Listen],
            key_name: Some("keyName1".to_string()),
            primary_key: Some("primary".to_string()),
            secondary_key: Some("secondary".to_string()),
            ..Default::default()
        }];

        let wire = to_authorization_rules(&rules).unwrap_or_default();
        let rule = &wire.rules[0];
        assert_eq!(rule.rule_type, "SharedAccessAuthorizationRule");
        assert_eq!(rule.claim_type.as_deref(), Some("SharedAccessKey"));
        assert_eq!(rule.claim_value.as_deref(), Some("None"));

        assert_eq!(assert_ok!(from_authorization_rules(Some(wire))), rules);
    }

    #[test]
    fn unknown_access_right_is_an_error() {
        let wire = AuthorizationRules {
            rules: vec![AuthorizationRuleDescription {
                rights: Some(AccessRightsList {
                    rights: vec!["Peek".to_string()],
                }),
                ..Default::default()
            }],
        };
        assert_matches!(
            from_authorization_rules(Some(wire)),
            Err(AdminError::UnknownAccessRight(right)) if right == "Peek"
        );
    }
}
