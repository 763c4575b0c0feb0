//! # Quetty Admin Library
//!
//! Administration of Azure Service Bus entities through the namespace's ATOM
//! management endpoint: create, read, update, delete and list queues, topics,
//! subscriptions and rules.
//!
//! ## Modules
//!
//! - [`atom`] - Middleware pipeline, entity manager, XML wire model and the
//!   ISO 8601 duration codec
//! - [`auth`] - Connection strings, SAS signing and token caching
//! - [`client`] - The [`AdminClient`] facade and public property types
//! - [`pager`] - `$top`/`$skip` cursor over entity listings
//! - [`options`] - Client and listing options
//! - [`errors`] - Error types returned by the client

pub mod atom;
pub mod auth;
pub mod client;
pub mod errors;
pub mod options;
pub mod pager;

pub use client::{
    AccessRight, AdminClient, AuthorizationRule, CorrelationFilter, EntityStatus,
    NamespaceProperties, QueueItem, QueueProperties,
    QueueRuntimeProperties, QueueRuntimePropertiesItem, RuleAction, RuleFilter, RuleItem,
    RuleProperties, SqlFilter, SqlRuleAction, SqlValue, SubscriptionItem, SubscriptionProperties,
    SubscriptionRuntimeProperties, SubscriptionRuntimePropertiesItem, TopicItem, TopicProperties,
    TopicRuntimeProperties, TopicRuntimePropertiesItem,
};
pub use errors::AdminError;
pub use options::{AdminClientOptions, ListOptions};
pub use pager::Pager;
