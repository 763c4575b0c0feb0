//! Wire model for the ATOM entity management endpoint.
//!
//! Every field is optional so that partially populated documents (requests
//! only carry what the caller set) and documents from newer service versions
//! both round trip. Element order inside a description follows the service's
//! data contract, which rejects out-of-order elements on write.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const ATOM_SCHEMA: &str = "http://www.w3.org/2005/Atom";
pub const SERVICE_BUS_SCHEMA: &str =
    "http://schemas.microsoft.com/netservices/2010/10/servicebus/connect";
pub const SCHEMA_INSTANCE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_SCHEMA: &str = "http://www.w3.org/2001/XMLSchema";

/// `type` attribute of an entry's `content` element.
pub const CONTENT_TYPE_XML: &str = "application/xml";

/// Title of the feed the service returns when a GET addresses something that
/// is not an entity. Used to tell "not found" apart from a malformed body.
pub const EMPTY_SERVICE_FEED_TITLE: &str = "Publicly Listed Services";

/// Root element a document type must carry. XML decoding through serde does
/// not look at the root element name, so callers check it against this first.
pub trait AtomDocument: DeserializeOwned {
    const ROOT_ELEMENT: &'static str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl Title {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "@rel", default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(rename = "@href", default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// An ATOM `<entry>` whose `<content>` is `C`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "entry", bound(deserialize = "C: DeserializeOwned"))]
pub struct Envelope<C> {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<C>,
}

impl<C> Envelope<C> {
    /// Request envelope around `content`.
    pub fn wrap(content: C) -> Self {
        Self {
            xmlns: Some(ATOM_SCHEMA.to_string()),
            id: None,
            title: None,
            updated: None,
            author: None,
            links: Vec::new(),
            content: Some(content),
        }
    }

    /// Entity name, which the service always reports in the entry title.
    pub fn name(&self) -> &str {
        self.title.as_ref().map(|t| t.text.as_str()).unwrap_or_default()
    }
}

impl<C: DeserializeOwned> AtomDocument for Envelope<C> {
    const ROOT_ELEMENT: &'static str = "entry";
}

/// An ATOM `<feed>` of entries with content `C`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "feed", bound(deserialize = "C: DeserializeOwned"))]
pub struct Feed<C> {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(rename = "entry", default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Envelope<C>>,
}

impl<C> Feed<C> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: DeserializeOwned> AtomDocument for Feed<C> {
    const ROOT_ELEMENT: &'static str = "feed";
}

macro_rules! description_content {
    ($(#[$meta:meta])* $name:ident, $field:ident: $description:ty, $element:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(rename = "@type", default = "content_type_xml")]
            pub content_type: String,
            #[serde(rename = $element)]
            pub $field: $description,
        }

        impl $name {
            pub fn new($field: $description) -> Self {
                Self {
                    content_type: CONTENT_TYPE_XML.to_string(),
                    $field,
                }
            }
        }
    };
}

fn content_type_xml() -> String {
    CONTENT_TYPE_XML.to_string()
}

description_content!(QueueContent, queue_description: QueueDescription, "QueueDescription");
description_content!(TopicContent, topic_description: TopicDescription, "TopicDescription");
description_content!(
    SubscriptionContent,
    subscription_description: SubscriptionDescription,
    "SubscriptionDescription"
);
description_content!(RuleContent, rule_description: RuleDescription, "RuleDescription");
description_content!(
    /// Content of the `$namespaceinfo` entry.
    NamespaceContent,
    namespace_info: NamespaceInfo,
    "NamespaceInfo"
);

pub type QueueEnvelope = Envelope<QueueContent>;
pub type TopicEnvelope = Envelope<TopicContent>;
pub type SubscriptionEnvelope = Envelope<SubscriptionContent>;
pub type RuleEnvelope = Envelope<RuleContent>;
pub type NamespaceEnvelope = Envelope<NamespaceContent>;

pub type QueueFeed = Feed<QueueContent>;
pub type TopicFeed = Feed<TopicContent>;
pub type SubscriptionFeed = Feed<SubscriptionContent>;
pub type RuleFeed = Feed<RuleContent>;

/// Message counters reported with runtime properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CountDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_letter_message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_dead_letter_message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_message_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueueDescription {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:i", skip_serializing_if = "Option::is_none")]
    pub xmlns_i: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_in_megabytes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_duplicate_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_lettering_on_message_expiration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_detection_history_time_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delivery_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_batched_operations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous_accessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_rules: Option<AuthorizationRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_ordering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_details: Option<CountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete_on_idle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_partitioning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_availability_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_express: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_dead_lettered_messages_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_message_size_in_kilobytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TopicDescription {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:i", skip_serializing_if = "Option::is_none")]
    pub xmlns_i: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size_in_megabytes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_duplicate_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_detection_history_time_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_batched_operations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtering_messages_before_publishing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous_accessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_rules: Option<AuthorizationRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_ordering: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_details: Option<CountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete_on_idle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_partitioning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_availability_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_subscription_partitioning: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_express: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_message_size_in_kilobytes: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SubscriptionDescription {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:i", skip_serializing_if = "Option::is_none")]
    pub xmlns_i: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message_time_to_live: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_lettering_on_message_expiration: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dead_lettering_on_filter_evaluation_exceptions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_rule_description: Option<RuleDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delivery_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_batched_operations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_delete_on_idle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_dead_lettered_messages_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_details: Option<CountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_availability_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RuleDescription {
    #[serde(rename = "@xmlns", skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(rename = "@xmlns:i", skip_serializing_if = "Option::is_none")]
    pub xmlns_i: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `<AuthorizationRules>` of a queue or topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRules {
    #[serde(rename = "AuthorizationRule", default)]
    pub rules: Vec<AuthorizationRuleDescription>,
}

/// A shared access authorization rule. The service only issues
/// `SharedAccessAuthorizationRule`, keyed by `SharedAccessKey` claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthorizationRuleDescription {
    #[serde(rename(serialize = "@i:type", deserialize = "@type"))]
    pub rule_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<AccessRightsList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRightsList {
    #[serde(rename = "AccessRights", default)]
    pub rights: Vec<String>,
}

/// Namespace level facts returned by `GET /$namespaceinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NamespaceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(rename = "MessagingSKU", skip_serializing_if = "Option::is_none")]
    pub messaging_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_units: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_type: Option<String>,
}

/// Superset of every filter kind, discriminated by `i:type`.
///
/// The decoder sees attributes by local name, so `i:type` arrives as `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilterDescription {
    #[serde(rename(serialize = "@i:type", deserialize = "@type"))]
    pub filter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<KeyValueList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<KeyValueList>,
}

/// Superset of every rule action kind, discriminated by `i:type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ActionDescription {
    #[serde(rename(serialize = "@i:type", deserialize = "@type"))]
    pub action_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_preprocessing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatibility_level: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<KeyValueList>,
}

/// `<Parameters>` / `<Properties>`: a data contract dictionary of string keys
/// to typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValueList {
    #[serde(rename = "KeyValueOfstringanyType", default)]
    pub entries: Vec<KeyValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: TypedValue,
}

/// A value tagged with its XML schema type, e.g. `i:type="l28:string"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename(serialize = "@i:type", deserialize = "@type"))]
    pub value_type: String,
    #[serde(rename = "@xmlns:l28", default, skip_serializing_if = "Option::is_none")]
    pub xmlns_l28: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl TypedValue {
    /// Outbound value tagged with the `l28` prefix bound to the XML schema.
    pub fn schema(type_name: &str, text: impl Into<String>) -> Self {
        Self {
            value_type: format!("l28:{type_name}"),
            xmlns_l28: Some(XML_SCHEMA.to_string()),
            text: text.into(),
        }
    }

    /// Type name without its namespace prefix.
    pub fn type_name(&self) -> &str {
        self.value_type
            .rsplit_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.value_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_value_strips_any_prefix() {
        let value = TypedValue {
            value_type: "d6p1:string".to_string(),
            xmlns_l28: None,
            text: "x".to_string(),
        };
        assert_eq!(value.type_name(), "string");

        let bare = TypedValue {
            value_type: "long".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.type_name(), "long");
    }

    #[test]
    fn envelope_name_comes_from_title() {
        let mut envelope = QueueEnvelope::wrap(QueueContent::new(QueueDescription::default()));
        assert_eq!(envelope.name(), "");
        envelope.title = Some(Title::text("orders"));
        assert_eq!(envelope.name(), "orders");
    }

    #[test]
    fn serializes_queue_envelope_with_namespaces() {
        let description = QueueDescription {
            xmlns: Some(SERVICE_BUS_SCHEMA.to_string()),
            xmlns_i: Some(SCHEMA_INSTANCE.to_string()),
            lock_duration: Some("PT1M0S".to_string()),
            max_delivery_count: Some(10),
            ..Default::default()
        };
        let xml = quick_xml::se::to_string(&QueueEnvelope::wrap(QueueContent::new(description)))
            .expect("serializes");

        assert!(xml.starts_with(r#"<entry xmlns="http://www.w3.org/2005/Atom">"#));
        assert!(xml.contains(r#"<content type="application/xml">"#));
        assert!(xml.contains("<LockDuration>PT1M0S</LockDuration>"));
        assert!(xml.contains("<MaxDeliveryCount>10</MaxDeliveryCount>"));
        assert!(!xml.contains("RequiresSession"));
        let lock = xml.find("LockDuration").expect("lock duration");
        let delivery = xml.find("MaxDeliveryCount").expect("max delivery");
        assert!(lock < delivery);
    }

    /// Content type with no `Default` impl, as a caller defined one may be.
    #[derive(Debug, Deserialize)]
    struct Opaque {
        #[serde(rename = "@type")]
        kind: String,
    }

    fn decode<D: AtomDocument>(xml: &str) -> D {
        quick_xml::de::from_str(xml).expect("decodes")
    }

    #[test]
    fn envelopes_decode_content_without_default() {
        let entry: Envelope<Opaque> = decode(
            r#"<entry xmlns="http://www.w3.org/2005/Atom"><title type="text">a</title><content type="application/xml"/></entry>"#,
        );
        assert_eq!(entry.name(), "a");
        assert_eq!(entry.content.map(|c| c.kind).as_deref(), Some("application/xml"));

        let feed: Feed<Opaque> = decode(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><content type="x"/></entry><entry/></feed>"#,
        );
        assert_eq!(feed.len(), 2);
        assert!(feed.entries[1].content.is_none());
    }

    #[test]
    fn serializes_authorization_rules_between_anonymous_access_and_status() {
        let description = QueueDescription {
            xmlns_i: Some(SCHEMA_INSTANCE.to_string()),
            is_anonymous_accessible: Some(false),
            authorization_rules: Some(AuthorizationRules {
                rules: vec![AuthorizationRuleDescription {
                    rule_type: "SharedAccessAuthorizationRule".to_string(),
                    rights: Some(AccessRightsList {
                        rights: vec!["Send".to_string(), "Listen".to_string()],
                    }),
                    key_name: Some("sender".to_string()),
                    ..Default::default()
                }],
            }),
            status: Some("Active".to_string()),
            ..Default::default()
        };
        let xml = quick_xml::se::to_string_with_root("QueueDescription", &description)
            .expect("serializes");

        assert!(xml.contains(
            r#"<AuthorizationRules><AuthorizationRule i:type="SharedAccessAuthorizationRule"><Rights><AccessRights>Send</AccessRights><AccessRights>Listen</AccessRights></Rights><KeyName>sender</KeyName></AuthorizationRule></AuthorizationRules>"#
        ));
        let anonymous = xml.find("IsAnonymousAccessible").expect("anonymous");
        let rules = xml.find("AuthorizationRules").expect("rules");
        let status = xml.find("<Status>").expect("status");
        assert!(anonymous < rules && rules < status);
    }

    #[test]
    fn serializes_filter_discriminator_with_instance_prefix() {
        let filter = FilterDescription {
            filter_type: "SqlFilter".to_string(),
            sql_expression: Some("a = 1".to_string()),
            compatibility_level: Some(20),
            ..Default::default()
        };
        let xml = quick_xml::se::to_string_with_root("Filter", &filter).expect("serializes");
        assert!(xml.contains(r#"i:type="SqlFilter""#));
        assert!(xml.contains("<SqlExpression>a = 1</SqlExpression>"));
    }
}
