use crate::{EntityArgs, QueueAction, RuleAction, SubscriptionAction, TopicAction};
use admin::{
    AdminClient, CorrelationFilter, QueueProperties, RuleFilter, RuleItem, RuleProperties,
    SqlFilter, SqlRuleAction, SubscriptionProperties, TopicProperties,
};
use anyhow::{Context, anyhow};
use std::time::Duration;

fn show_duration(duration: Option<Duration>) -> String {
    duration
        .map(admin::atom::duration::format_duration)
        .unwrap_or_else(|| "-".to_string())
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl EntityArgs {
    fn apply_to_queue(self, properties: &mut QueueProperties) {
        if self.lock_duration.is_some() {
            properties.lock_duration = self.lock_duration;
        }
        if self.default_message_time_to_live.is_some() {
            properties.default_message_time_to_live = self.default_message_time_to_live;
        }
        if self.auto_delete_on_idle.is_some() {
            properties.auto_delete_on_idle = self.auto_delete_on_idle;
        }
        if self.max_delivery_count.is_some() {
            properties.max_delivery_count = self.max_delivery_count;
        }
        if self.requires_session.is_some() {
            properties.requires_session = self.requires_session;
        }
        if self.forward_to.is_some() {
            properties.forward_to = self.forward_to;
        }
        if self.forward_dead_lettered_messages_to.is_some() {
            properties.forward_dead_lettered_messages_to = self.forward_dead_lettered_messages_to;
        }
        if self.user_metadata.is_some() {
            properties.user_metadata = self.user_metadata;
        }
    }

    fn apply_to_subscription(self, properties: &mut SubscriptionProperties) {
        if self.lock_duration.is_some() {
            properties.lock_duration = self.lock_duration;
        }
        if self.default_message_time_to_live.is_some() {
            properties.default_message_time_to_live = self.default_message_time_to_live;
        }
        if self.auto_delete_on_idle.is_some() {
            properties.auto_delete_on_idle = self.auto_delete_on_idle;
        }
        if self.max_delivery_count.is_some() {
            properties.max_delivery_count = self.max_delivery_count;
        }
        if self.requires_session.is_some() {
            properties.requires_session = self.requires_session;
        }
        if self.forward_to.is_some() {
            properties.forward_to = self.forward_to;
        }
        if self.forward_dead_lettered_messages_to.is_some() {
            properties.forward_dead_lettered_messages_to = self.forward_dead_lettered_messages_to;
        }
        if self.user_metadata.is_some() {
            properties.user_metadata = self.user_metadata;
        }
    }
}

fn print_queue(name: &str, properties: &QueueProperties) {
    println!(
        "{name}\tstatus={}\tlock={}\tttl={}\tmax_delivery={}\tsession={}\tforward_to={}",
        show(properties.status),
        show_duration(properties.lock_duration),
        show_duration(properties.default_message_time_to_live),
        show(properties.max_delivery_count),
        show(properties.requires_session),
        show(properties.forward_to.as_deref()),
    );
}

pub async fn namespace(client: &AdminClient) -> anyhow::Result<()> {
    let properties = client
        .get_namespace_properties()
        .await
        .context("Failed to read namespace properties")?;
    println!(
        "{}	sku={}	messaging_units={}	created={}	modified={}",
        properties.name,
        properties.sku,
        show(properties.messaging_units),
        properties.created_time.to_rfc3339(),
        properties.modified_time.to_rfc3339(),
    );
    Ok(())
}

pub async fn queue(client: &AdminClient, action: QueueAction) -> anyhow::Result<()> {
    match action {
        QueueAction::List { runtime: false } => {
            let mut pager = client.list_queues(None);
            while let Some(page) = pager.next_page().await? {
                for queue in page {
                    print_queue(&queue.name, &queue.properties);
                }
            }
        }
        QueueAction::List { runtime: true } => {
            let mut pager = client.list_queues_runtime_properties(None);
            while let Some(page) = pager.next_page().await? {
                for queue in page {
                    let p = queue.properties;
                    println!(
                        "{}\tactive={}\tdead_letter={}\tscheduled={}\tsize={}",
                        queue.name,
                        p.active_message_count,
                        p.dead_letter_message_count,
                        p.scheduled_message_count,
                        p.size_in_bytes
                    );
                }
            }
        }
        QueueAction::Get { name, runtime: false } => {
            let queue = client
                .get_queue(&name)
                .await?
                .ok_or_else(|| anyhow!("queue '{name}' not found"))?;
            println!("{queue:#?}");
        }
        QueueAction::Get { name, runtime: true } => {
            let queue = client
                .get_queue_runtime_properties(&name)
                .await?
                .ok_or_else(|| anyhow!("queue '{name}' not found"))?;
            println!("{queue:#?}");
        }
        QueueAction::Create {
            name,
            entity,
            max_size_in_megabytes,
            enable_partitioning,
        } => {
            let mut properties = QueueProperties {
                max_size_in_megabytes,
                enable_partitioning,
                ..Default::default()
            };
            entity.apply_to_queue(&mut properties);
            let queue = client.create_queue(&name, Some(properties)).await?;
            log::info!("Created queue {}", queue.name);
            print_queue(&queue.name, &queue.properties);
        }
        QueueAction::Update { name, entity } => {
            let mut properties = client
                .get_queue(&name)
                .await?
                .ok_or_else(|| anyhow!("queue '{name}' not found"))?
                .properties;
            entity.apply_to_queue(&mut properties);
            let queue = client.update_queue(&name, properties).await?;
            print_queue(&queue.name, &queue.properties);
        }
        QueueAction::Delete { name } => {
            client
                .delete_queue(&name)
                .await
                .with_context(|| format!("failed to delete queue '{name}'"))?;
            println!("deleted {name}");
        }
    }
    Ok(())
}

pub async fn topic(client: &AdminClient, action: TopicAction) -> anyhow::Result<()> {
    match action {
        TopicAction::List { runtime: false } => {
            for topic in client.list_topics(None).collect_all().await? {
                let p = topic.properties;
                println!(
                    "{}\tstatus={}\tttl={}\tmax_size_mb={}",
                    topic.name,
                    show(p.status),
                    show_duration(p.default_message_time_to_live),
                    show(p.max_size_in_megabytes)
                );
            }
        }
        TopicAction::List { runtime: true } => {
            for topic in client.list_topics_runtime_properties(None).collect_all().await? {
                let p = topic.properties;
                println!(
                    "{}\tsubscriptions={}\tscheduled={}\tsize={}",
                    topic.name, p.subscription_count, p.scheduled_message_count, p.size_in_bytes
                );
            }
        }
        TopicAction::Get { name, runtime: false } => {
            let topic = client
                .get_topic(&name)
                .await?
                .ok_or_else(|| anyhow!("topic '{name}' not found"))?;
            println!("{topic:#?}");
        }
        TopicAction::Get { name, runtime: true } => {
            let topic = client
                .get_topic_runtime_properties(&name)
                .await?
                .ok_or_else(|| anyhow!("topic '{name}' not found"))?;
            println!("{topic:#?}");
        }
        TopicAction::Create {
            name,
            default_message_time_to_live,
            max_size_in_megabytes,
            support_ordering,
        } => {
            let properties = TopicProperties {
                default_message_time_to_live,
                max_size_in_megabytes,
                support_ordering,
                ..Default::default()
            };
            let topic = client.create_topic(&name, Some(properties)).await?;
            println!("created {}", topic.name);
        }
        TopicAction::Delete { name } => {
            client
                .delete_topic(&name)
                .await
                .with_context(|| format!("failed to delete topic '{name}'"))?;
            println!("deleted {name}");
        }
    }
    Ok(())
}

pub async fn subscription(
    client: &AdminClient,
    topic: &str,
    action: SubscriptionAction,
) -> anyhow::Result<()> {
    match action {
        SubscriptionAction::List { runtime: false } => {
            for subscription in client.list_subscriptions(topic, None).collect_all().await? {
                let p = subscription.properties;
                println!(
                    "{}\tstatus={}\tlock={}\tmax_delivery={}\tforward_to={}",
                    subscription.name,
                    show(p.status),
                    show_duration(p.lock_duration),
                    show(p.max_delivery_count),
                    show(p.forward_to.as_deref())
                );
            }
        }
        SubscriptionAction::List { runtime: true } => {
            let mut pager = client.list_subscriptions_runtime_properties(topic, None);
            for subscription in pager.collect_all().await? {
                let p = subscription.properties;
                println!(
                    "{}\tactive={}\tdead_letter={}\ttotal={}",
                    subscription.name,
                    p.active_message_count,
                    p.dead_letter_message_count,
                    p.total_message_count
                );
            }
        }
        SubscriptionAction::Get { name, runtime: false } => {
            let subscription = client
                .get_subscription(topic, &name)
                .await?
                .ok_or_else(|| anyhow!("subscription '{topic}/{name}' not found"))?;
            println!("{subscription:#?}");
        }
        SubscriptionAction::Get { name, runtime: true } => {
            let subscription = client
                .get_subscription_runtime_properties(topic, &name)
                .await?
                .ok_or_else(|| anyhow!("subscription '{topic}/{name}' not found"))?;
            println!("{subscription:#?}");
        }
        SubscriptionAction::Create {
            name,
            entity,
            filter,
        } => {
            let mut properties = SubscriptionProperties {
                default_rule: filter.map(|expression| RuleItem {
                    name: "$Default".to_string(),
                    properties: RuleProperties {
                        filter: Some(RuleFilter::Sql(SqlFilter::new(expression))),
                        action: None,
                    },
                }),
                ..Default::default()
            };
            entity.apply_to_subscription(&mut properties);
            let subscription = client
                .create_subscription(topic, &name, Some(properties))
                .await?;
            println!("created {}/{}", subscription.topic_name, subscription.name);
        }
        SubscriptionAction::Update { name, entity } => {
            let mut properties = client
                .get_subscription(topic, &name)
                .await?
                .ok_or_else(|| anyhow!("subscription '{topic}/{name}' not found"))?
                .properties;
            entity.apply_to_subscription(&mut properties);
            let subscription = client
                .update_subscription(topic, &name, properties)
                .await?;
            println!("updated {}/{}", subscription.topic_name, subscription.name);
        }
        SubscriptionAction::Delete { name } => {
            client
                .delete_subscription(topic, &name)
                .await
                .with_context(|| format!("failed to delete subscription '{topic}/{name}'"))?;
            println!("deleted {topic}/{name}");
        }
    }
    Ok(())
}

fn describe_filter(filter: Option<&RuleFilter>) -> String {
    match filter {
        None => "-".to_string(),
        Some(RuleFilter::True) => "true".to_string(),
        Some(RuleFilter::False) => "false".to_string(),
        Some(RuleFilter::Sql(sql)) => format!("sql: {}", sql.expression),
        Some(RuleFilter::Correlation(c)) => format!(
            "correlation: id={} subject={}",
            show(c.correlation_id.as_deref()),
            show(c.subject.as_deref())
        ),
    }
}

pub async fn rule(
    client: &AdminClient,
    topic: &str,
    subscription: &str,
    action: RuleAction,
) -> anyhow::Result<()> {
    match action {
        RuleAction::List => {
            for rule in client.list_rules(topic, subscription, None).collect_all().await? {
                println!(
                    "{}\t{}",
                    rule.name,
                    describe_filter(rule.properties.filter.as_ref())
                );
            }
        }
        RuleAction::Get { name } => {
            let rule = client
                .get_rule(topic, subscription, &name)
                .await?
                .ok_or_else(|| anyhow!("rule '{topic}/{subscription}/{name}' not found"))?;
            println!("{rule:#?}");
        }
        RuleAction::Create {
            name,
            sql,
            correlation_id,
            action,
        } => {
            let filter = match (sql, correlation_id) {
                (Some(expression), _) => Some(RuleFilter::Sql(SqlFilter::new(expression))),
                (None, Some(correlation_id)) => Some(RuleFilter::Correlation(CorrelationFilter {
                    correlation_id: Some(correlation_id),
                    ..Default::default()
                })),
                (None, None) => None,
            };
            let properties = RuleProperties {
                filter,
                action: action.map(|expression| {
                    admin::RuleAction::Sql(SqlRuleAction {
                        expression,
                        ..Default::default()
                    })
                }),
            };
            let rule = client
                .create_rule(topic, subscription, &name, Some(properties))
                .await?;
            println!(
                "created {}\t{}",
                rule.name,
                describe_filter(rule.properties.filter.as_ref())
            );
        }
        RuleAction::Delete { name } => {
            client
                .delete_rule(topic, subscription, &name)
                .await
                .with_context(|| format!("failed to delete rule '{name}'"))?;
            println!("deleted {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_args_only_override_given_values() {
        let mut properties = QueueProperties {
            lock_duration: Some(Duration::from_secs(30)),
            max_delivery_count: Some(5),
            ..Default::default()
        };
        EntityArgs {
            max_delivery_count: Some(7),
            ..Default::default()
        }
        .apply_to_queue(&mut properties);

        assert_eq!(properties.lock_duration, Some(Duration::from_secs(30)));
        assert_eq!(properties.max_delivery_count, Some(7));
    }

    #[test]
    fn filters_are_described_compactly() {
        assert_eq!(describe_filter(None), "-");
        assert_eq!(describe_filter(Some(&RuleFilter::True)), "true");
        assert_eq!(
            describe_filter(Some(&RuleFilter::Sql(SqlFilter::new("a = 1")))),
            "sql: a = 1"
        );
    }
}
