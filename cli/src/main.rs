//! `sbadmin`: manage Service Bus queues, topics, subscriptions and rules from
//! the command line.

mod commands;
mod config;
mod env;
mod logger;

use admin::AdminClient;
use admin::atom::duration::parse_duration;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file; `config.toml` is read when present
    #[arg(long, global = true)]
    config: Option<String>,

    /// Items requested per page by list commands
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Namespace name, tier and timestamps
    Namespace,
    /// Queue management
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Topic management
    Topic {
        #[command(subcommand)]
        action: TopicAction,
    },
    /// Subscription management
    Subscription {
        /// Topic owning the subscriptions
        #[arg(long)]
        topic: String,
        #[command(subcommand)]
        action: SubscriptionAction,
    },
    /// Rule management
    Rule {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        subscription: String,
        #[command(subcommand)]
        action: RuleAction,
    },
}

/// Options shared by every `create` and `update` command. Durations are
/// ISO 8601 (`PT30S`, `P14D`).
#[derive(Args, Debug, Default, Clone)]
pub struct EntityArgs {
    #[arg(long, value_parser = parse_duration)]
    pub lock_duration: Option<Duration>,
    #[arg(long, value_parser = parse_duration)]
    pub default_message_time_to_live: Option<Duration>,
    #[arg(long, value_parser = parse_duration)]
    pub auto_delete_on_idle: Option<Duration>,
    #[arg(long)]
    pub max_delivery_count: Option<i32>,
    #[arg(long)]
    pub requires_session: Option<bool>,
    #[arg(long)]
    pub forward_to: Option<String>,
    #[arg(long)]
    pub forward_dead_lettered_messages_to: Option<String>,
    #[arg(long)]
    pub user_metadata: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum QueueAction {
    List {
        /// Show message counts instead of settings
        #[arg(long)]
        runtime: bool,
    },
    Get {
        name: String,
        #[arg(long)]
        runtime: bool,
    },
    Create {
        name: String,
        #[command(flatten)]
        entity: EntityArgs,
        #[arg(long)]
        max_size_in_megabytes: Option<i32>,
        #[arg(long)]
        enable_partitioning: Option<bool>,
    },
    Update {
        name: String,
        #[command(flatten)]
        entity: EntityArgs,
    },
    Delete {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TopicAction {
    List {
        #[arg(long)]
        runtime: bool,
    },
    Get {
        name: String,
        #[arg(long)]
        runtime: bool,
    },
    Create {
        name: String,
        #[arg(long, value_parser = parse_duration)]
        default_message_time_to_live: Option<Duration>,
        #[arg(long)]
        max_size_in_megabytes: Option<i32>,
        #[arg(long)]
        support_ordering: Option<bool>,
    },
    Delete {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubscriptionAction {
    List {
        #[arg(long)]
        runtime: bool,
    },
    Get {
        name: String,
        #[arg(long)]
        runtime: bool,
    },
    Create {
        name: String,
        #[command(flatten)]
        entity: EntityArgs,
        /// SQL filter for the subscription's initial rule
        #[arg(long)]
        filter: Option<String>,
    },
    Update {
        name: String,
        #[command(flatten)]
        entity: EntityArgs,
    },
    Delete {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RuleAction {
    List,
    Get {
        name: String,
    },
    /// Creates a rule; without a filter option it matches every message
    Create {
        name: String,
        /// SQL filter expression
        #[arg(long, conflicts_with = "correlation_id")]
        sql: Option<String>,
        /// Correlation filter on the message correlation id
        #[arg(long)]
        correlation_id: Option<String>,
        /// SQL action run on matching messages
        #[arg(long)]
        action: Option<String>,
    },
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::CliConfig::load(cli.config.as_deref())?.with_page_size(cli.page_size);
    logger::setup_logger(config.logging(), cli.verbose)?;

    let client = AdminClient::from_connection_string(
        &config.connection_string()?,
        config.client_options().clone(),
    )?;
    log::debug!("Connected to {}", client.entity_manager().host());

    match cli.command {
        Command::Namespace => commands::namespace(&client).await,
        Command::Queue { action } => commands::queue(&client, action).await,
        Command::Topic { action } => commands::topic(&client, action).await,
        Command::Subscription { topic, action } => {
            commands::subscription(&client, &topic, action).await
        }
        Command::Rule {
            topic,
            subscription,
            action,
        } => commands::rule(&client, &topic, &subscription, action).await,
    }
}
