use super::AdminClient;
use super::authorization::{
    AuthorizationRule, from_authorization_rules, to_authorization_rules,
};
use super::types::{
    EntityStatus, parse_optional_timestamp, require_name, status_from_wire, status_to_wire,
};
use crate::atom::{
    QueueContent, QueueDescription, QueueEnvelope, QueueFeed, SCHEMA_INSTANCE,
    SERVICE_BUS_SCHEMA, duration_to_iso8601, iso8601_to_duration,
};
use crate::errors::AdminError;
use crate::options::ListOptions;
use crate::pager::Pager;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Settable properties of a queue. Unset fields take the service defaults on
/// create.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueProperties {
    pub lock_duration: Option<Duration>,
    pub max_size_in_megabytes: Option<i32>,
    pub requires_duplicate_detection: Option<bool>,
    pub requires_session: Option<bool>,
    pub default_message_time_to_live: Option<Duration>,
    pub dead_lettering_on_message_expiration: Option<bool>,
    pub duplicate_detection_history_time_window: Option<Duration>,
    pub max_delivery_count: Option<i32>,
    pub enable_batched_operations: Option<bool>,
    pub status: Option<EntityStatus>,
    pub auto_delete_on_idle: Option<Duration>,
    pub enable_partitioning: Option<bool>,
    /// Queue or topic receiving this queue's messages; a bare entity name is
    /// resolved against the namespace
    pub forward_to: Option<String>,
    pub forward_dead_lettered_messages_to: Option<String>,
    pub user_metadata: Option<String>,
    pub max_message_size_in_kilobytes: Option<i64>,
    /// Shared access keys scoped to this queue
    pub authorization_rules: Vec<AuthorizationRule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub name: String,
    pub properties: QueueProperties,
}

/// Service computed queue state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueRuntimeProperties {
    pub size_in_bytes: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
    pub total_message_count: i64,
    pub active_message_count: i64,
    pub dead_letter_message_count: i64,
    pub scheduled_message_count: i64,
    pub transfer_dead_letter_message_count: i64,
    pub transfer_message_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueRuntimePropertiesItem {
    pub name: String,
    pub properties: QueueRuntimeProperties,
}

pub type QueuePager = Pager<QueueFeed, QueueItem>;
pub type QueueRuntimePropertiesPager = Pager<QueueFeed, QueueRuntimePropertiesItem>;

const QUEUES_PATH: &str = "/$Resources/Queues";

impl AdminClient {
    /// Creates a queue.
    ///
    /// # Arguments
    ///
    /// * `name` - Queue name, unique within the namespace
    /// * `properties` - Settings to apply; `None` takes every service default.
    ///   Forward targets may be bare entity names and get an extra
    ///   authorization header each.
    ///
    /// # Errors
    ///
    /// A 409 response if the queue already exists, and
    /// [`AdminError::InvalidArgument`] for an empty name.
    pub async fn create_queue(
        &self,
        name: &str,
        properties: Option<QueueProperties>,
    ) -> Result<QueueItem, AdminError> {
        self.put_queue(name, properties.unwrap_or_default(), false)
            .await
    }

    /// Replaces the properties of an existing queue. The request carries
    /// `If-Match: *`, so a missing queue fails with 404 instead of being
    /// created.
    pub async fn update_queue(
        &self,
        name: &str,
        properties: QueueProperties,
    ) -> Result<QueueItem, AdminError> {
        self.put_queue(name, properties, true).await
    }

    /// Returns `Ok(None)` if the queue does not exist.
    pub async fn get_queue(&self, name: &str) -> Result<Option<QueueItem>, AdminError> {
        require_name("queue", name)?;
        self.get_optional::<QueueEnvelope>(&queue_path(name))
            .await?
            .map(queue_item)
            .transpose()
    }

    /// Message counts, size and access timestamps of a queue.
    ///
    /// Returns `Ok(None)` if the queue does not exist.
    ///
    /// # Errors
    ///
    /// [`AdminError::MissingCountDetails`] when the service omits the counters.
    pub async fn get_queue_runtime_properties(
        &self,
        name: &str,
    ) -> Result<Option<QueueRuntimePropertiesItem>, AdminError> {
        require_name("queue", name)?;
        self.get_optional::<QueueEnvelope>(&queue_path(name))
            .await?
            .map(queue_runtime_item)
            .transpose()
    }

    /// Deletes a queue and every message in it.
    ///
    /// # Errors
    ///
    /// A 404 response if the queue does not exist; use
    /// [`not_found`](crate::atom::not_found) to detect it.
    pub async fn delete_queue(&self, name: &str) -> Result<(), AdminError> {
        require_name("queue", name)?;
        self.delete_entity(&queue_path(name)).await
    }

    /// Pages through the namespace's queues.
    ///
    /// # Arguments
    ///
    /// * `options` - Page size override; defaults to the client's page size
    pub fn list_queues(&self, options: Option<ListOptions>) -> QueuePager {
        Pager::new(
            self.entity_manager.clone(),
            QUEUES_PATH,
            self.page_size(options),
            QueueFeed::len,
            queue_page,
        )
    }

    /// Pages through the runtime properties of every queue.
    pub fn list_queues_runtime_properties(
        &self,
        options: Option<ListOptions>,
    ) -> QueueRuntimePropertiesPager {
        Pager::new(
            self.entity_manager.clone(),
            QUEUES_PATH,
            self.page_size(options),
            QueueFeed::len,
            queue_runtime_page,
        )
    }

    async fn put_queue(
        &self,
        name: &str,
        mut properties: QueueProperties,
        is_update: bool,
    ) -> Result<QueueItem, AdminError> {
        require_name("queue", name)?;
        let middlewares = self.put_middlewares(
            is_update,
            &mut properties.forward_to,
            &mut properties.forward_dead_lettered_messages_to,
        );
        let envelope = QueueEnvelope::wrap(QueueContent::new(to_description(&properties)));

        let response: QueueEnvelope = self
            .entity_manager
            .put(&queue_path(name), &envelope, &middlewares)
            .await?;
        queue_item(response)
    }
}

fn queue_path(name: &str) -> String {
    format!("/{name}")
}

fn to_description(properties: &QueueProperties) -> QueueDescription {
    QueueDescription {
        xmlns: Some(SERVICE_BUS_SCHEMA.to_string()),
        xmlns_i: Some(SCHEMA_INSTANCE.to_string()),
        lock_duration: duration_to_iso8601(properties.lock_duration),
        max_size_in_megabytes: properties.max_size_in_megabytes,
        requires_duplicate_detection: properties.requires_duplicate_detection,
        requires_session: properties.requires_session,
        default_message_time_to_live: duration_to_iso8601(
            properties.default_message_time_to_live,
        ),
        dead_lettering_on_message_expiration: properties.dead_lettering_on_message_expiration,
        duplicate_detection_history_time_window: duration_to_iso8601(
            properties.duplicate_detection_history_time_window,
        ),
        max_delivery_count: properties.max_delivery_count,
        enable_batched_operations: properties.enable_batched_operations,
        status: status_to_wire(properties.status),
        forward_to: properties.forward_to.clone(),
        user_metadata: properties.user_metadata.clone(),
        auto_delete_on_idle: duration_to_iso8601(properties.auto_delete_on_idle),
        enable_partitioning: properties.enable_partitioning,
        forward_dead_lettered_messages_to: properties.forward_dead_lettered_messages_to.clone(),
        max_message_size_in_kilobytes: properties.max_message_size_in_kilobytes,
        authorization_rules: to_authorization_rules(&properties.authorization_rules),
        ..Default::default()
    }
}

fn description(envelope: QueueEnvelope) -> (String, QueueDescription) {
    let name = envelope.name().to_string();
    let description = envelope
        .content
        .map(|content| content.queue_description)
        .unwrap_or_default();
    (name, description)
}

fn queue_item(envelope: QueueEnvelope) -> Result<QueueItem, AdminError> {
    let (name, d) = description(envelope);
    let properties = QueueProperties {
        lock_duration: iso8601_to_duration(d.lock_duration.as_deref())?,
        max_size_in_megabytes: d.max_size_in_megabytes,
        requires_duplicate_detection: d.requires_duplicate_detection,
        requires_session: d.requires_session,
        default_message_time_to_live: iso8601_to_duration(
            d.default_message_time_to_live.as_deref(),
        )?,
        dead_lettering_on_message_expiration: d.dead_lettering_on_message_expiration,
        duplicate_detection_history_time_window: iso8601_to_duration(
            d.duplicate_detection_history_time_window.as_deref(),
        )?,
        max_delivery_count: d.max_delivery_count,
        enable_batched_operations: d.enable_batched_operations,
        status: status_from_wire(d.status),
        auto_delete_on_idle: iso8601_to_duration(d.auto_delete_on_idle.as_deref())?,
        enable_partitioning: d.enable_partitioning,
        forward_to: d.forward_to,
        forward_dead_lettered_messages_to: d.forward_dead_lettered_messages_to,
        user_metadata: d.user_metadata,
        max_message_size_in_kilobytes: d.max_message_size_in_kilobytes,
        authorization_rules: from_authorization_rules(d.authorization_rules)?,
    };
    Ok(QueueItem { name, properties })
}

fn queue_page(feed: QueueFeed) -> Result<Vec<QueueItem>, AdminError> {
    feed.entries.into_iter().map(queue_item).collect()
}

fn queue_runtime_page(feed: QueueFeed) -> Result<Vec<QueueRuntimePropertiesItem>, AdminError> {
    feed.entries.into_iter().map(queue_runtime_item).collect()
}

fn queue_runtime_item(envelope: QueueEnvelope) -> Result<QueueRuntimePropertiesItem, AdminError> {
    let (name, d) = description(envelope);
    let counts = d
        .count_details
        .ok_or(AdminError::MissingCountDetails("queue"))?;

    let properties = QueueRuntimeProperties {
        size_in_bytes: d.size_in_bytes.unwrap_or_default(),
        created_at: parse_optional_timestamp(d.created_at.as_deref())?,
        updated_at: parse_optional_timestamp(d.updated_at.as_deref())?,
        accessed_at: parse_optional_timestamp(d.accessed_at.as_deref())?,
        total_message_count: d.message_count.unwrap_or_default(),
        active_message_count: counts.active_message_count.unwrap_or_default(),
        dead_letter_message_count: counts.dead_letter_message_count.unwrap_or_default(),
        scheduled_message_count: counts.scheduled_message_count.unwrap_or_default(),
        transfer_dead_letter_message_count: counts
            .transfer_dead_letter_message_count
            .unwrap_or_default(),
        transfer_message_count: counts.transfer_message_count.unwrap_or_default(),
    };
    Ok(QueueRuntimePropertiesItem { name, properties })
}
