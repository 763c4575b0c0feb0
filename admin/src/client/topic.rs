use super::AdminClient;
use super::authorization::{
    AuthorizationRule, from_authorization_rules, to_authorization_rules,
};
use super::types::{
    EntityStatus, parse_optional_timestamp, require_name, status_from_wire, status_to_wire,
};
use crate::atom::{
    SCHEMA_INSTANCE, SERVICE_BUS_SCHEMA, TopicContent, TopicDescription, TopicEnvelope,
    TopicFeed, duration_to_iso8601, iso8601_to_duration,
};
use crate::errors::AdminError;
use crate::options::ListOptions;
use crate::pager::Pager;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicProperties {
    pub default_message_time_to_live: Option<Duration>,
    pub max_size_in_megabytes: Option<i32>,
    pub requires_duplicate_detection: Option<bool>,
    pub duplicate_detection_history_time_window: Option<Duration>,
    pub enable_batched_operations: Option<bool>,
    pub status: Option<EntityStatus>,
    pub auto_delete_on_idle: Option<Duration>,
    pub enable_partitioning: Option<bool>,
    pub support_ordering: Option<bool>,
    pub user_metadata: Option<String>,
    pub max_message_size_in_kilobytes: Option<i64>,
    /// Shared access keys scoped to this topic
    pub authorization_rules: Vec<AuthorizationRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicItem {
    pub name: String,
    pub properties: TopicProperties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicRuntimeProperties {
    pub size_in_bytes: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub subscription_count: i32,
    pub scheduled_message_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicRuntimePropertiesItem {
    pub name: String,
    pub properties: TopicRuntimeProperties,
}

pub type TopicPager = Pager<TopicFeed, TopicItem>;
pub type TopicRuntimePropertiesPager = Pager<TopicFeed, TopicRuntimePropertiesItem>;

const TOPICS_PATH: &str = "/$Resources/Topics";

impl AdminClient {
    /// Creates a topic. Fails with a 409 response if it already exists.
    ///
    /// # Arguments
    ///
    /// * `name` - Topic name, unique within the namespace
    /// * `properties` - Settings to apply; `None` takes every service default
    ///
    /// # Errors
    ///
    /// [`AdminError::InvalidArgument`] for an empty name, otherwise whatever
    /// the service or transport reports.
    pub async fn create_topic(
        &self,
        name: &str,
        properties: Option<TopicProperties>,
    ) -> Result<TopicItem, AdminError> {
        self.put_topic(name, properties.unwrap_or_default(), false)
            .await
    }

    /// Replaces the properties of an existing topic. Fields left `None` are
    /// reset to their service defaults, so start from [`get_topic`](Self::get_topic).
    pub async fn update_topic(
        &self,
        name: &str,
        properties: TopicProperties,
    ) -> Result<TopicItem, AdminError> {
        self.put_topic(name, properties, true).await
    }

    /// Returns `Ok(None)` if the topic does not exist.
    pub async fn get_topic(&self, name: &str) -> Result<Option<TopicItem>, AdminError> {
        require_name("topic", name)?;
        self.get_optional::<TopicEnvelope>(&topic_path(name))
            .await?
            .map(topic_item)
            .transpose()
    }

    /// Size, subscription count and timestamps of a topic, or `Ok(None)` if
    /// it does not exist.
    pub async fn get_topic_runtime_properties(
        &self,
        name: &str,
    ) -> Result<Option<TopicRuntimePropertiesItem>, AdminError> {
        require_name("topic", name)?;
        self.get_optional::<TopicEnvelope>(&topic_path(name))
            .await?
            .map(topic_runtime_item)
            .transpose()
    }

    /// Deletes the topic together with its subscriptions and rules.
    pub async fn delete_topic(&self, name: &str) -> Result<(), AdminError> {
        require_name("topic", name)?;
        self.delete_entity(&topic_path(name)).await
    }

    /// Pages through the namespace's topics.
    pub fn list_topics(&self, options: Option<ListOptions>) -> TopicPager {
        Pager::new(
            self.entity_manager.clone(),
            TOPICS_PATH,
            self.page_size(options),
            TopicFeed::len,
            topic_page,
        )
    }

    /// Pages through the runtime properties of every topic.
    pub fn list_topics_runtime_properties(
        &self,
        options: Option<ListOptions>,
    ) -> TopicRuntimePropertiesPager {
        Pager::new(
            self.entity_manager.clone(),
            TOPICS_PATH,
            self.page_size(options),
            TopicFeed::len,
            topic_runtime_page,
        )
    }

    async fn put_topic(
        &self,
        name: &str,
        properties: TopicProperties,
        is_update: bool,
    ) -> Result<TopicItem, AdminError> {
        require_name("topic", name)?;
        let middlewares = self.put_middlewares(is_update, &mut None, &mut None);
        let envelope = TopicEnvelope::wrap(TopicContent::new(to_description(&properties)));

        let response: TopicEnvelope = self
            .entity_manager
            .put(&topic_path(name), &envelope, &middlewares)
            .await?;
        topic_item(response)
    }
}

fn topic_path(name: &str) -> String {
    format!("/{name}")
}

fn to_description(properties: &TopicProperties) -> TopicDescription {
    TopicDescription {
        xmlns: Some(SERVICE_BUS_SCHEMA.to_string()),
        xmlns_i: Some(SCHEMA_INSTANCE.to_string()),
        default_message_time_to_live: duration_to_iso8601(
            properties.default_message_time_to_live,
        ),
        max_size_in_megabytes: properties.max_size_in_megabytes,
        requires_duplicate_detection: properties.requires_duplicate_detection,
        duplicate_detection_history_time_window: duration_to_iso8601(
            properties.duplicate_detection_history_time_window,
        ),
        enable_batched_operations: properties.enable_batched_operations,
        status: status_to_wire(properties.status),
        user_metadata: properties.user_metadata.clone(),
        support_ordering: properties.support_ordering,
        auto_delete_on_idle: duration_to_iso8601(properties.auto_delete_on_idle),
        enable_partitioning: properties.enable_partitioning,
        max_message_size_in_kilobytes: properties.max_message_size_in_kilobytes,
        authorization_rules: to_authorization_rules(&properties.authorization_rules),
        ..Default::default()
    }
}

fn description(envelope: TopicEnvelope) -> (String, TopicDescription) {
    let name = envelope.name().to_string();
    let description = envelope
        .content
        .map(|content| content.topic_description)
        .unwrap_or_default();
    (name, description)
}

fn topic_item(envelope: TopicEnvelope) -> Result<TopicItem, AdminError> {
    let (name, d) = description(envelope);
    let properties = TopicProperties {
        default_message_time_to_live: iso8601_to_duration(
            d.default_message_time_to_live.as_deref(),
        )?,
        max_size_in_megabytes: d.max_size_in_megabytes,
        requires_duplicate_detection: d.requires_duplicate_detection,
        duplicate_detection_history_time_window: iso8601_to_duration(
            d.duplicate_detection_history_time_window.as_deref(),
        )?,
        enable_batched_operations: d.enable_batched_operations,
        status: status_from_wire(d.status),
        auto_delete_on_idle: iso8601_to_duration(d.auto_delete_on_idle.as_deref())?,
        enable_partitioning: d.enable_partitioning,
        support_ordering: d.support_ordering,
        user_metadata: d.user_metadata,
        max_message_size_in_kilobytes: d.max_message_size_in_kilobytes,
        authorization_rules: from_authorization_rules(d.authorization_rules)?,
    };
    Ok(TopicItem { name, properties })
}

fn topic_page(feed: TopicFeed) -> Result<Vec<TopicItem>, AdminError> {
    feed.entries.into_iter().map(topic_item).collect()
}

fn topic_runtime_page(feed: TopicFeed) -> Result<Vec<TopicRuntimePropertiesItem>, AdminError> {
    feed.entries.into_iter().map(topic_runtime_item).collect()
}

fn topic_runtime_item(envelope: TopicEnvelope) -> Result<TopicRuntimePropertiesItem, AdminError> {
    let (name, d) = description(envelope);
    let counts = d
        .count_details
        .ok_or(AdminError::MissingCountDetails("topic"))?;

    let properties = TopicRuntimeProperties {
        size_in_bytes: d.size_in_bytes.unwrap_or_default(),
        created_at: parse_optional_timestamp(d.created_at.as_deref())?,
        updated_at: parse_optional_timestamp(d.updated_at.as_deref())?,
        accessed_at: parse_optional_timestamp(d.accessed_at.as_deref())?,
        subscription_count: d.subscription_count.unwrap_or_default(),
        scheduled_message_count: counts.scheduled_message_count.unwrap_or_default(),
    };
    Ok(TopicRuntimePropertiesItem { name, properties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::deserialize_body;
    use claims::{assert_matches, assert_ok};

    const TOPIC_ENTRY: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom"><id>https://sbadmin.servicebus.windows.net/mytopic?api-version=2017-04</id><title type="text">mytopic</title><published>2020-01-02T03:04:05Z</published><updated>2020-01-02T03:04:05Z</updated><author><name>sbadmin</name></author><link rel="self" href="https://sbadmin.servicebus.windows.net/mytopic?api-version=2017-04"/><content type="application/xml"><TopicDescription xmlns="http://schemas.microsoft.com/netservices/2010/10/servicebus/connect" xmlns:i="http://www.w3.org/2001/XMLSchema-instance"><DefaultMessageTimeToLive>P14D</DefaultMessageTimeToLive><MaxSizeInMegabytes>1024</MaxSizeInMegabytes><RequiresDuplicateDetection>false</RequiresDuplicateDetection><DuplicateDetectionHistoryTimeWindow>PT10M</DuplicateDetectionHistoryTimeWindow><EnableBatchedOperations>true</EnableBatchedOperations><SizeInBytes>0</SizeInBytes><FilteringMessagesBeforePublishing>false</FilteringMessagesBeforePublishing><IsAnonymousAccessible>false</IsAnonymousAccessible><Status>Active</Status><CreatedAt>2020-01-02T03:04:05.23Z</CreatedAt><UpdatedAt>2020-01-02T03:04:05.23Z</UpdatedAt><AccessedAt>0001-01-01T00:00:00Z</AccessedAt><SupportOrdering>true</SupportOrdering><CountDetails xmlns:d2p1="http://schemas.microsoft.com/netservices/2011/06/servicebus"><d2p1:ActiveMessageCount>0</d2p1:ActiveMessageCount><d2p1:DeadLetterMessageCount>0</d2p1:DeadLetterMessageCount><d2p1:ScheduledMessageCount>4</d2p1:ScheduledMessageCount><d2p1:TransferDeadLetterMessageCount>0</d2p1:TransferDeadLetterMessageCount><d2p1:TransferMessageCount>0</d2p1:TransferMessageCount></CountDetails><SubscriptionCount>2</SubscriptionCount><AutoDeleteOnIdle>P10675199DT2H48M5.4775807S</AutoDeleteOnIdle><EnablePartitioning>false</EnablePartitioning><EntityAvailabilityStatus>Available</EntityAvailabilityStatus><EnableSubscriptionPartitioning>false</EnableSubscriptionPartitioning><EnableExpress>false</EnableExpress></TopicDescription></content></entry>"#;

    #[test]
    fn decodes_service_topic_entry() {
        let envelope: TopicEnvelope = assert_ok!(deserialize_body(TOPIC_ENTRY));
        let item = assert_ok!(topic_item(envelope.clone()));

        assert_eq!(item.name, "mytopic");
        assert_eq!(
            item.properties.default_message_time_to_live,
            Some(Duration::from_secs(14 * 86_400))
        );
        assert_eq!(item.properties.support_ordering, Some(true));
        assert_eq!(item.properties.status, Some(EntityStatus::Active));

        let runtime = assert_ok!(topic_runtime_item(envelope));
        assert_eq!(runtime.properties.subscription_count, 2);
        assert_eq!(runtime.properties.scheduled_message_count, 4);
    }

    #[test]
    fn runtime_properties_require_count_details() {
        let envelope = TopicEnvelope::wrap(TopicContent::new(TopicDescription::default()));
        assert_matches!(
            topic_runtime_item(envelope),
            Err(AdminError::MissingCountDetails("topic"))
        );
    }
}
