use super::AdminClient;
use super::types::{parse_timestamp, require_name};
use crate::atom::{
    ActionDescription, FilterDescription, KeyValue, KeyValueList, RuleContent, RuleDescription,
    RuleEnvelope, RuleFeed, SCHEMA_INSTANCE, SERVICE_BUS_SCHEMA, TypedValue,
};
use crate::errors::AdminError;
use crate::options::ListOptions;
use crate::pager::Pager;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

/// SQL compatibility level the service expects on filters and actions.
const COMPATIBILITY_LEVEL: i32 = 20;

const TRUE_FILTER: &str = "TrueFilter";
const FALSE_FILTER: &str = "FalseFilter";
const SQL_FILTER: &str = "SqlFilter";
const CORRELATION_FILTER: &str = "CorrelationFilter";
const EMPTY_RULE_ACTION: &str = "EmptyRuleAction";
const SQL_RULE_ACTION: &str = "SqlRuleAction";

/// A parameter or application property value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFilter {
    pub expression: String,
    pub parameters: BTreeMap<String, SqlValue>,
}

impl SqlFilter {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            parameters: BTreeMap::new(),
        }
    }
}

/// Matches messages on system properties and application properties, all
/// of which must be equal for a message to match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationFilter {
    pub correlation_id: Option<String>,
    pub message_id: Option<String>,
    pub to: Option<String>,
    pub reply_to: Option<String>,
    /// Sent as `Label` on the wire
    pub subject: Option<String>,
    pub session_id: Option<String>,
    pub reply_to_session_id: Option<String>,
    pub content_type: Option<String>,
    pub application_properties: BTreeMap<String, SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleFilter {
    True,
    False,
    Sql(SqlFilter),
    Correlation(CorrelationFilter),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRuleAction {
    pub expression: String,
    pub parameters: BTreeMap<String, SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    Empty,
    Sql(SqlRuleAction),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleProperties {
    /// `None` on create means match everything ([`RuleFilter::True`])
    pub filter: Option<RuleFilter>,
    pub action: Option<RuleAction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleItem {
    pub name: String,
    pub properties: RuleProperties,
}

pub type RulePager = Pager<RuleFeed, RuleItem>;

impl AdminClient {
    /// Adds a rule to a subscription.
    ///
    /// # Arguments
    ///
    /// * `topic` - Topic owning the subscription
    /// * `subscription` - Subscription to add the rule to
    /// * `name` - Rule name, unique within the subscription
    /// * `properties` - Filter and action; without a filter the rule matches
    ///   every message
    ///
    /// # Errors
    ///
    /// A 409 response if the rule exists, a 404 response if the subscription
    /// does not.
    pub async fn create_rule(
        &self,
        topic_name: &str,
        subscription_name: &str,
        rule_name: &str,
        properties: Option<RuleProperties>,
    ) -> Result<RuleItem, AdminError> {
        self.put_rule(
            topic_name,
            subscription_name,
            rule_name,
            properties.unwrap_or_default(),
            false,
        )
        .await
    }

    /// Replaces the filter and action of an existing rule.
    pub async fn update_rule(
        &self,
        topic_name: &str,
        subscription_name: &str,
        rule_name: &str,
        properties: RuleProperties,
    ) -> Result<RuleItem, AdminError> {
        self.put_rule(topic_name, subscription_name, rule_name, properties, true)
            .await
    }

    /// Returns `Ok(None)` if the rule does not exist.
    pub async fn get_rule(
        &self,
        topic_name: &str,
        subscription_name: &str,
        rule_name: &str,
    ) -> Result<Option<RuleItem>, AdminError> {
        let path = rule_path(topic_name, subscription_name, rule_name)?;
        self.get_optional::<RuleEnvelope>(&path)
            .await?
            .map(rule_item)
            .transpose()
    }

    /// Removes a rule. A subscription without rules receives no messages.
    pub async fn delete_rule(
        &self,
        topic_name: &str,
        subscription_name: &str,
        rule_name: &str,
    ) -> Result<(), AdminError> {
        let path = rule_path(topic_name, subscription_name, rule_name)?;
        self.delete_entity(&path).await
    }

    /// Pages through the rules of a subscription.
    pub fn list_rules(
        &self,
        topic_name: &str,
        subscription_name: &str,
        options: Option<ListOptions>,
    ) -> RulePager {
        Pager::new(
            self.entity_manager.clone(),
            format!("/{topic_name}/Subscriptions/{subscription_name}/Rules"),
            self.page_size(options),
            RuleFeed::len,
            rule_page,
        )
    }

    async fn put_rule(
        &self,
        topic_name: &str,
        subscription_name: &str,
        rule_name: &str,
        properties: RuleProperties,
        is_update: bool,
    ) -> Result<RuleItem, AdminError> {
        let path = rule_path(topic_name, subscription_name, rule_name)?;
        let middlewares = self.put_middlewares(is_update, &mut None, &mut None);

        let mut description = to_rule_description(rule_name, &properties);
        description.xmlns = Some(SERVICE_BUS_SCHEMA.to_string());
        description.xmlns_i = Some(SCHEMA_INSTANCE.to_string());
        let envelope = RuleEnvelope::wrap(RuleContent::new(description));

        let response: RuleEnvelope = self
            .entity_manager
            .put(&path, &envelope, &middlewares)
            .await?;
        rule_item(response)
    }
}

fn rule_path(topic: &str, subscription: &str, rule: &str) -> Result<String, AdminError> {
    require_name("topic", topic)?;
    require_name("subscription", subscription)?;
    require_name("rule", rule)?;
    Ok(format!("/{topic}/Subscriptions/{subscription}/Rules/{rule}"))
}

fn rule_item(envelope: RuleEnvelope) -> Result<RuleItem, AdminError> {
    let name = envelope.name().to_string();
    let description = envelope
        .content
        .map(|content| content.rule_description)
        .unwrap_or_default();
    Ok(RuleItem {
        name,
        properties: rule_properties(description)?,
    })
}

fn rule_page(feed: RuleFeed) -> Result<Vec<RuleItem>, AdminError> {
    feed.entries.into_iter().map(rule_item).collect()
}

/// Wire form of a rule. A missing filter becomes a `TrueFilter`.
pub(crate) fn to_rule_description(name: &str, properties: &RuleProperties) -> RuleDescription {
    let filter = properties.filter.as_ref().unwrap_or(&RuleFilter::True);
    RuleDescription {
        filter: Some(to_filter_description(filter)),
        action: properties.action.as_ref().map(to_action_description),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

pub(crate) fn rule_properties(description: RuleDescription) -> Result<RuleProperties, AdminError> {
    Ok(RuleProperties {
        filter: description.filter.map(from_filter_description).transpose()?,
        action: description.action.map(from_action_description).transpose()?,
    })
}

fn to_filter_description(filter: &RuleFilter) -> FilterDescription {
    match filter {
        RuleFilter::True => FilterDescription {
            filter_type: TRUE_FILTER.to_string(),
            sql_expression: Some("1=1".to_string()),
            compatibility_level: Some(COMPATIBILITY_LEVEL),
            ..Default::default()
        },
        RuleFilter::False => FilterDescription {
            filter_type: FALSE_FILTER.to_string(),
            sql_expression: Some("1=0".to_string()),
            compatibility_level: Some(COMPATIBILITY_LEVEL),
            ..Default::default()
        },
        RuleFilter::Sql(sql) => FilterDescription {
            filter_type: SQL_FILTER.to_string(),
            sql_expression: Some(sql.expression.clone()),
            compatibility_level: Some(COMPATIBILITY_LEVEL),
            parameters: to_key_value_list(&sql.parameters),
            ..Default::default()
        },
        RuleFilter::Correlation(correlation) => FilterDescription {
            filter_type: CORRELATION_FILTER.to_string(),
            correlation_id: correlation.correlation_id.clone(),
            message_id: correlation.message_id.clone(),
            to: correlation.to.clone(),
            reply_to: correlation.reply_to.clone(),
            label: correlation.subject.clone(),
            session_id: correlation.session_id.clone(),
            reply_to_session_id: correlation.reply_to_session_id.clone(),
            content_type: correlation.content_type.clone(),
            properties: to_key_value_list(&correlation.application_properties),
            ..Default::default()
        },
    }
}

fn from_filter_description(description: FilterDescription) -> Result<RuleFilter, AdminError> {
    match description.filter_type.as_str() {
        TRUE_FILTER => Ok(RuleFilter::True),
        FALSE_FILTER => Ok(RuleFilter::False),
        SQL_FILTER => Ok(RuleFilter::Sql(SqlFilter {
            expression: description.sql_expression.unwrap_or_default(),
            parameters: from_key_value_list(description.parameters)?,
        })),
        CORRELATION_FILTER => Ok(RuleFilter::Correlation(CorrelationFilter {
            correlation_id: description.correlation_id,
            message_id: description.message_id,
            to: description.to,
            reply_to: description.reply_to,
            subject: description.label,
            session_id: description.session_id,
            reply_to_session_id: description.reply_to_session_id,
            content_type: description.content_type,
            application_properties: from_key_value_list(description.properties)?,
        })),
        other => Err(AdminError::UnknownFilterType(other.to_string())),
    }
}

fn to_action_description(action: &RuleAction) -> ActionDescription {
    match action {
        RuleAction::Empty => ActionDescription {
            action_type: EMPTY_RULE_ACTION.to_string(),
            ..Default::default()
        },
        RuleAction::Sql(sql) => ActionDescription {
            action_type: SQL_RULE_ACTION.to_string(),
            sql_expression: Some(sql.expression.clone()),
            compatibility_level: Some(COMPATIBILITY_LEVEL),
            parameters: to_key_value_list(&sql.parameters),
            ..Default::default()
        },
    }
}

fn from_action_description(description: ActionDescription) -> Result<RuleAction, AdminError> {
    match description.action_type.as_str() {
        EMPTY_RULE_ACTION => Ok(RuleAction::Empty),
        SQL_RULE_ACTION => Ok(RuleAction::Sql(SqlRuleAction {
            expression: description.sql_expression.unwrap_or_default(),
            parameters: from_key_value_list(description.parameters)?,
        })),
        other => Err(AdminError::UnknownActionType(other.to_string())),
    }
}

fn to_key_value_list(values: &BTreeMap<String, SqlValue>) -> Option<KeyValueList> {
    if values.is_empty() {
        return None;
    }
    let entries = values
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: to_typed_value(value),
        })
        .collect();
    Some(KeyValueList { entries })
}

fn to_typed_value(value: &SqlValue) -> TypedValue {
    match value {
        SqlValue::String(s) => TypedValue::schema("string", s.as_str()),
        SqlValue::Bool(b) => TypedValue::schema("boolean", b.to_string()),
        SqlValue::Int(i) => TypedValue::schema("long", i.to_string()),
        SqlValue::Float(f) => TypedValue::schema("double", xsd_double(*f)),
        SqlValue::Timestamp(t) => {
            TypedValue::schema("dateTime", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
    }
}

/// Lexical `xs:double`: non-finite values are `INF`, `-INF` and `NaN`.
fn xsd_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        value.to_string()
    }
}

fn from_key_value_list(
    list: Option<KeyValueList>,
) -> Result<BTreeMap<String, SqlValue>, AdminError> {
    list.map(|list| list.entries)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| {
            let value = from_typed_value(&entry.key, &entry.value)?;
            Ok((entry.key, value))
        })
        .collect()
}

fn from_typed_value(key: &str, value: &TypedValue) -> Result<SqlValue, AdminError> {
    let type_name = value.type_name();
    let text = value.text.as_str();
    let invalid = || AdminError::InvalidParameter {
        key: key.to_string(),
        type_name: type_name.to_string(),
        value: text.to_string(),
    };

    match type_name {
        "string" => Ok(SqlValue::String(text.to_string())),
        "boolean" => text.parse().map(SqlValue::Bool).map_err(|_| invalid()),
        "int" | "long" | "short" | "byte" | "unsignedInt" | "unsignedShort" | "unsignedByte" => {
            text.parse().map(SqlValue::Int).map_err(|_| invalid())
        }
        "double" | "float" | "decimal" => text.parse().map(SqlValue::Float).map_err(|_| invalid()),
        "dateTime" => parse_timestamp(text)
            .map(SqlValue::Timestamp)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::deserialize_body;
    use chrono::TimeZone;
    use claims::{assert_matches, assert_ok};

    fn round_trip(properties: &RuleProperties) -> RuleProperties {
        let mut description = to_rule_description("r", properties);
        description.xmlns = Some(SERVICE_BUS_SCHEMA.to_string());
        description.xmlns_i = Some(SCHEMA_INSTANCE.to_string());
        let envelope = RuleEnvelope::wrap(RuleContent::new(description));
        let xml = assert_ok!(quick_xml::se::to_string(&envelope));
        let decoded: RuleEnvelope = assert_ok!(deserialize_body(&xml));
        let description = decoded.content.map(|c| c.rule_description).unwrap_or_default();
        assert_eq!(description.name.as_deref(), Some("r"));
        assert_ok!(rule_properties(description))
    }

    #[test]
    fn missing_filter_is_sent_as_true_filter() {
        let description = to_rule_description("$Default", &RuleProperties::default());
        let filter = description.filter.unwrap_or_default();
        assert_eq!(filter.filter_type, "TrueFilter");
        assert_eq!(filter.sql_expression.as_deref(), Some("1=1"));
        assert_eq!(filter.compatibility_level, Some(20));
        assert_eq!(description.action, None);
    }

    #[test]
    fn correlation_filter_round_trips_typed_properties() {
        let timestamp = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let mut application_properties = BTreeMap::new();
        application_properties.insert("hello".to_string(), SqlValue::from("world"));
        application_properties.insert("enabled".to_string(), SqlValue::from(true));
        application_properties.insert("count".to_string(), SqlValue::from(42i64));
        application_properties.insert("ratio".to_string(), SqlValue::from(1.5f64));
        application_properties.insert("when".to_string(), SqlValue::from(timestamp));

        let properties = RuleProperties {
            filter: Some(RuleFilter::Correlation(CorrelationFilter {
                correlation_id: Some("cid".to_string()),
                subject: Some("label".to_string()),
                content_type: Some("application/json".to_string()),
                application_properties,
                ..Default::default()
            })),
            action: None,
        };

        assert_eq!(round_trip(&properties), properties);
    }

    #[test]
    fn sql_filter_and_action_round_trip() {
        let mut filter = SqlFilter::new("color = @color");
        filter
            .parameters
            .insert("@color".to_string(), SqlValue::from("blue"));
        let mut action_parameters = BTreeMap::new();
        action_parameters.insert("@level".to_string(), SqlValue::Int(3));

        let properties = RuleProperties {
            filter: Some(RuleFilter::Sql(filter)),
            action: Some(RuleAction::Sql(SqlRuleAction {
                expression: "SET level = @level".to_string(),
                parameters: action_parameters,
            })),
        };

        assert_eq!(round_trip(&properties), properties);
    }

    #[test]
    fn false_filter_and_empty_action_round_trip() {
        let properties = RuleProperties {
            filter: Some(RuleFilter::False),
            action: Some(RuleAction::Empty),
        };
        assert_eq!(round_trip(&properties), properties);
    }

    #[test]
    fn decodes_service_rule_entry() {
        let body = r#"<entry xmlns="http://www.w3.org/2005/Atom"><id>https://sbadmin.servicebus.windows.net/t/Subscriptions/s/Rules/r?api-version=2017-04</id><title type="text">r</title><published>2020-01-02T03:04:05Z</published><updated>2020-01-02T03:04:05Z</updated><link rel="self" href="https://sbadmin.servicebus.windows.net/t/Subscriptions/s/Rules/r?api-version=2017-04"/><content type="application/xml"><RuleDescription xmlns="http://schemas.microsoft.com/netservices/2010/10/servicebus/connect" xmlns:i="http://www.w3.org/2001/XMLSchema-instance"><Filter i:type="CorrelationFilter"><CorrelationId>cid</CorrelationId><Properties><KeyValueOfstringanyType><Key>hello</Key><Value xmlns:d6p1="http://www.w3.org/2001/XMLSchema" i:type="d6p1:string">world</Value></KeyValueOfstringanyType><KeyValueOfstringanyType><Key>n</Key><Value xmlns:d6p1="http://www.w3.org/2001/XMLSchema" i:type="d6p1:int">7</Value></KeyValueOfstringanyType></Properties></Filter><Action i:type="EmptyRuleAction"/><CreatedAt>2020-01-02T03:04:05.1Z</CreatedAt><Name>r</Name></RuleDescription></content></entry>"#;

        let envelope: RuleEnvelope = assert_ok!(deserialize_body(body));
        let item = assert_ok!(rule_item(envelope));
        assert_eq!(item.name, "r");
        assert_eq!(item.properties.action, Some(RuleAction::Empty));
        match item.properties.filter {
            Some(RuleFilter::Correlation(filter)) => {
                assert_eq!(filter.correlation_id.as_deref(), Some("cid"));
                assert_eq!(
                    filter.application_properties.get("hello"),
                    Some(&SqlValue::String("world".to_string()))
                );
                assert_eq!(filter.application_properties.get("n"), Some(&SqlValue::Int(7)));
            }
            other => panic!("unexpected filter {other:?}"),
        }
    }

    #[test]
    fn unknown_discriminators_are_errors() {
        let filter = FilterDescription {
            filter_type: "FancyFilter".to_string(),
            ..Default::default()
        };
        assert_matches!(
            from_filter_description(filter),
            Err(AdminError::UnknownFilterType(name)) if name == "FancyFilter"
        );

        let action = ActionDescription {
            action_type: "FancyAction".to_string(),
            ..Default::default()
        };
        assert_matches!(
            from_action_description(action),
            Err(AdminError::UnknownActionType(_))
        );
    }

    #[test]
    fn non_finite_doubles_use_schema_lexical_forms() {
        assert_eq!(to_typed_value(&SqlValue::Float(f64::INFINITY)).text, "INF");
        assert_eq!(to_typed_value(&SqlValue::Float(f64::NEG_INFINITY)).text, "-INF");
        assert_eq!(to_typed_value(&SqlValue::Float(f64::NAN)).text, "NaN");
        assert_eq!(to_typed_value(&SqlValue::Float(2.5)).text, "2.5");

        let decoded = assert_ok!(from_typed_value(
            "k",
            &to_typed_value(&SqlValue::Float(f64::NEG_INFINITY))
        ));
        assert_eq!(decoded, SqlValue::Float(f64::NEG_INFINITY));
        assert_matches!(
            from_typed_value("k", &to_typed_value(&SqlValue::Float(f64::NAN))),
            Ok(SqlValue::Float(f)) if f.is_nan()
        );
    }

    #[test]
    fn malformed_parameter_values_are_errors() {
        let value = TypedValue {
            value_type: "l28:long".to_string(),
            xmlns_l28: None,
            text: "not-a-number".to_string(),
        };
        assert_matches!(
            from_typed_value("k", &value),
            Err(AdminError::InvalidParameter { .. })
        );
    }
}
