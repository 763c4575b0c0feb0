use super::AdminClient;
use super::rule::{RuleItem, rule_properties, to_rule_description};
use super::types::{
    EntityStatus, parse_optional_timestamp, require_name, status_from_wire, status_to_wire,
};
use crate::atom::{
    SCHEMA_INSTANCE, SERVICE_BUS_SCHEMA, SubscriptionContent, SubscriptionDescription,
    SubscriptionEnvelope, SubscriptionFeed, duration_to_iso8601, iso8601_to_duration,
};
use crate::errors::AdminError;
use crate::options::ListOptions;
use crate::pager::Pager;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionProperties {
    pub lock_duration: Option<Duration>,
    pub requires_session: Option<bool>,
    pub default_message_time_to_live: Option<Duration>,
    pub dead_lettering_on_message_expiration: Option<bool>,
    pub dead_lettering_on_filter_evaluation_exceptions: Option<bool>,
    pub max_delivery_count: Option<i32>,
    pub enable_batched_operations: Option<bool>,
    pub status: Option<EntityStatus>,
    pub forward_to: Option<String>,
    pub auto_delete_on_idle: Option<Duration>,
    pub forward_dead_lettered_messages_to: Option<String>,
    pub user_metadata: Option<String>,
    /// Rule installed in place of the implicit `$Default` match-all rule.
    /// Only honoured by create.
    pub default_rule: Option<RuleItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionItem {
    pub topic_name: String,
    pub name: String,
    pub properties: SubscriptionProperties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionRuntimeProperties {
    pub total_message_count: i64,
    pub active_message_count: i64,
    pub dead_letter_message_count: i64,
    pub transfer_message_count: i64,
    pub transfer_dead_letter_message_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRuntimePropertiesItem {
    pub topic_name: String,
    pub name: String,
    pub properties: SubscriptionRuntimeProperties,
}

pub type SubscriptionPager = Pager<SubscriptionFeed, SubscriptionItem>;
pub type SubscriptionRuntimePropertiesPager =
    Pager<SubscriptionFeed, SubscriptionRuntimePropertiesItem>;

impl AdminClient {
    /// Creates a subscription on `topic`.
    ///
    /// # Arguments
    ///
    /// * `topic` - Owning topic
    /// * `name` - Subscription name, unique within the topic
    /// * `properties` - Settings; `default_rule` becomes the subscription's
    ///   first rule, otherwise the service installs a match-all `$Default`
    ///
    /// # Errors
    ///
    /// A 409 response if the subscription exists, a 404 response if the topic
    /// does not.
    pub async fn create_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
        properties: Option<SubscriptionProperties>,
    ) -> Result<SubscriptionItem, AdminError> {
        self.put_subscription(
            topic_name,
            subscription_name,
            properties.unwrap_or_default(),
            false,
        )
        .await
    }

    /// Replaces the properties of an existing subscription. `default_rule` is
    /// ignored; manage rules with [`update_rule`](Self::update_rule).
    pub async fn update_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
        properties: SubscriptionProperties,
    ) -> Result<SubscriptionItem, AdminError> {
        self.put_subscription(topic_name, subscription_name, properties, true)
            .await
    }

    /// Returns `Ok(None)` if the topic or the subscription does not exist.
    pub async fn get_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
    ) -> Result<Option<SubscriptionItem>, AdminError> {
        let path = subscription_path(topic_name, subscription_name)?;
        self.get_optional::<SubscriptionEnvelope>(&path)
            .await?
            .map(|envelope| subscription_item(topic_name, envelope))
            .transpose()
    }

    /// Message counts and timestamps of a subscription.
    pub async fn get_subscription_runtime_properties(
        &self,
        topic_name: &str,
        subscription_name: &str,
    ) -> Result<Option<SubscriptionRuntimePropertiesItem>, AdminError> {
        let path = subscription_path(topic_name, subscription_name)?;
        self.get_optional::<SubscriptionEnvelope>(&path)
            .await?
            .map(|envelope| subscription_runtime_item(topic_name, envelope))
            .transpose()
    }

    /// Deletes a subscription together with its rules and messages.
    pub async fn delete_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
    ) -> Result<(), AdminError> {
        let path = subscription_path(topic_name, subscription_name)?;
        self.delete_entity(&path).await
    }

    /// Pages through the subscriptions of `topic`. Every item carries the
    /// topic name.
    pub fn list_subscriptions(
        &self,
        topic_name: &str,
        options: Option<ListOptions>,
    ) -> SubscriptionPager {
        Pager::new(
            self.entity_manager.clone(),
            format!("/{topic_name}/Subscriptions"),
            self.page_size(options),
            SubscriptionFeed::len,
            subscription_page,
        )
    }

    /// Pages through the runtime properties of the subscriptions of `topic`.
    pub fn list_subscriptions_runtime_properties(
        &self,
        topic_name: &str,
        options: Option<ListOptions>,
    ) -> SubscriptionRuntimePropertiesPager {
        Pager::new(
            self.entity_manager.clone(),
            format!("/{topic_name}/Subscriptions"),
            self.page_size(options),
            SubscriptionFeed::len,
            subscription_runtime_page,
        )
    }

    async fn put_subscription(
        &self,
        topic_name: &str,
        subscription_name: &str,
        mut properties: SubscriptionProperties,
        is_update: bool,
    ) -> Result<SubscriptionItem, AdminError> {
        let path = subscription_path(topic_name, subscription_name)?;
        let middlewares = self.put_middlewares(
            is_update,
            &mut properties.forward_to,
            &mut properties.forward_dead_lettered_messages_to,
        );
        if is_update {
            properties.default_rule = None;
        }
        let envelope =
            SubscriptionEnvelope::wrap(SubscriptionContent::new(to_description(&properties)));

        let response: SubscriptionEnvelope = self
            .entity_manager
            .put(&path, &envelope, &middlewares)
            .await?;
        subscription_item(topic_name, response)
    }
}

fn subscription_path(topic: &str, subscription: &str) -> Result<String, AdminError> {
    require_name("topic", topic)?;
    require_name("subscription", subscription)?;
    Ok(format!("/{topic}/Subscriptions/{subscription}"))
}

/// Topic the entry belongs to, read from its `id`
/// (`https://<host>/<topic>/Subscriptions/<name>?...`).
fn topic_from_id(id: Option<&str>) -> Option<String> {
    let path = id?.split('?').next()?;
    let (before, _) = path.rsplit_once("/Subscriptions/")?;
    before.rsplit('/').next().map(str::to_string)
}

fn to_description(properties: &SubscriptionProperties) -> SubscriptionDescription {
    SubscriptionDescription {
        xmlns: Some(SERVICE_BUS_SCHEMA.to_string()),
        xmlns_i: Some(SCHEMA_INSTANCE.to_string()),
        lock_duration: duration_to_iso8601(properties.lock_duration),
        requires_session: properties.requires_session,
        default_message_time_to_live: duration_to_iso8601(
            properties.default_message_time_to_live,
        ),
        dead_lettering_on_message_expiration: properties.dead_lettering_on_message_expiration,
        dead_lettering_on_filter_evaluation_exceptions: properties
            .dead_lettering_on_filter_evaluation_exceptions,
        default_rule_description: properties
            .default_rule
            .as_ref()
            .map(|rule| to_rule_description(&rule.name, &rule.properties)),
        max_delivery_count: properties.max_delivery_count,
        enable_batched_operations: properties.enable_batched_operations,
        status: status_to_wire(properties.status),
        forward_to: properties.forward_to.clone(),
        auto_delete_on_idle: duration_to_iso8601(properties.auto_delete_on_idle),
        forward_dead_lettered_messages_to: properties.forward_dead_lettered_messages_to.clone(),
        user_metadata: properties.user_metadata.clone(),
        ..Default::default()
    }
}

fn description(envelope: SubscriptionEnvelope) -> (String, SubscriptionDescription) {
    let name = envelope.name().to_string();
    let description = envelope
        .content
        .map(|content| content.subscription_description)
        .unwrap_or_default();
    (name, description)
}

fn subscription_item(
    topic_name: &str,
    envelope: SubscriptionEnvelope,
) -> Result<SubscriptionItem, AdminError> {
    let (name, d) = description(envelope);
    let default_rule = d
        .default_rule_description
        .map(|rule| -> Result<RuleItem, AdminError> {
            Ok(RuleItem {
                name: rule.name.clone().unwrap_or_default(),
                properties: rule_properties(rule)?,
            })
        })
        .transpose()?;

    let properties = SubscriptionProperties {
        lock_duration: iso8601_to_duration(d.lock_duration.as_deref())?,
        requires_session: d.requires_session,
        default_message_time_to_live: iso8601_to_duration(
            d.default_message_time_to_live.as_deref(),
        )?,
        dead_lettering_on_message_expiration: d.dead_lettering_on_message_expiration,
        dead_lettering_on_filter_evaluation_exceptions: d
            .dead_lettering_on_filter_evaluation_exceptions,
        max_delivery_count: d.max_delivery_count,
        enable_batched_operations: d.enable_batched_operations,
        status: status_from_wire(d.status),
        forward_to: d.forward_to,
        auto_delete_on_idle: iso8601_to_duration(d.auto_delete_on_idle.as_deref())?,
        forward_dead_lettered_messages_to: d.forward_dead_lettered_messages_to,
        user_metadata: d.user_metadata,
        default_rule,
    };
    Ok(SubscriptionItem {
        topic_name: topic_name.to_string(),
        name,
        properties,
    })
}

fn subscription_runtime_item(
    topic_name: &str,
    envelope: SubscriptionEnvelope,
) -> Result<SubscriptionRuntimePropertiesItem, AdminError> {
    let (name, d) = description(envelope);
    let counts = d
        .count_details
        .ok_or(AdminError::MissingCountDetails("subscription"))?;

    let properties = SubscriptionRuntimeProperties {
        total_message_count: d.message_count.unwrap_or_default(),
        active_message_count: counts.active_message_count.unwrap_or_default(),
        dead_letter_message_count: counts.dead_letter_message_count.unwrap_or_default(),
        transfer_message_count: counts.transfer_message_count.unwrap_or_default(),
        transfer_dead_letter_message_count: counts
            .transfer_dead_letter_message_count
            .unwrap_or_default(),
        created_at: parse_optional_timestamp(d.created_at.as_deref())?,
        updated_at: parse_optional_timestamp(d.updated_at.as_deref())?,
        accessed_at: parse_optional_timestamp(d.accessed_at.as_deref())?,
    };
    Ok(SubscriptionRuntimePropertiesItem {
        topic_name: topic_name.to_string(),
        name,
        properties,
    })
}

// Feed entries name their topic only through their id.
fn feed_topic(envelope: &SubscriptionEnvelope) -> String {
    topic_from_id(envelope.id.as_deref()).unwrap_or_default()
}

fn subscription_page(feed: SubscriptionFeed) -> Result<Vec<SubscriptionItem>, AdminError> {
    feed.entries
        .into_iter()
        .map(|envelope| {
            let topic = feed_topic(&envelope);
            subscription_item(&topic, envelope)
        })
        .collect()
}

fn subscription_runtime_page(
    feed: SubscriptionFeed,
) -> Result<Vec<SubscriptionRuntimePropertiesItem>, AdminError> {
    feed.entries
        .into_iter()
        .map(|envelope| {
            let topic = feed_topic(&envelope);
            subscription_runtime_item(&topic, envelope)
        })
        .collect()
}
