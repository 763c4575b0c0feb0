//! Service Bus administration client: create, read, update, delete and list
//! queues, topics, subscriptions and rules.

pub mod authorization;
pub mod namespace;
pub mod queue;
pub mod rule;
pub mod subscription;
pub mod topic;
pub mod types;

use crate::atom::middleware::{IfMatchAny, SupplementaryAuthorization};
use crate::atom::{AtomDocument, EntityManager, Middleware, not_found};
use crate::auth::{CachingTokenProvider, ConnectionString, ConnectionStringProvider, TokenProvider};
use crate::errors::AdminError;
use crate::options::{AdminClientOptions, ListOptions};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use authorization::{AccessRight, AuthorizationRule};
pub use namespace::NamespaceProperties;
pub use queue::{QueueItem, QueueProperties, QueueRuntimeProperties, QueueRuntimePropertiesItem};
pub use rule::{
    CorrelationFilter, RuleAction, RuleFilter, RuleItem, RuleProperties, SqlFilter,
    SqlRuleAction, SqlValue,
};
pub use subscription::{
    SubscriptionItem, SubscriptionProperties, SubscriptionRuntimeProperties,
    SubscriptionRuntimePropertiesItem,
};
pub use topic::{TopicItem, TopicProperties, TopicRuntimeProperties, TopicRuntimePropertiesItem};
pub use types::EntityStatus;

/// Administration client for one Service Bus namespace.
///
/// Cheap to clone; clones share the middleware stack and cancellation token.
///
/// # Examples
///
/// ```no_run
/// use admin::{AdminClient, AdminClientOptions, QueueProperties};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), admin::AdminError> {
/// let client = AdminClient::from_connection_string(
///     "Endpoint=sb://my-ns.servicebus.windows.net/;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=...",
///     AdminClientOptions::default(),
/// )?;
///
/// let queue = client
///     .create_queue(
///         "orders",
///         Some(QueueProperties {
///             lock_duration: Some(Duration::from_secs(45)),
///             ..Default::default()
///         }),
///     )
///     .await?;
/// println!("created {}", queue.name);
///
/// if client.get_queue("missing").await?.is_none() {
///     println!("no such queue");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AdminClient {
    entity_manager: EntityManager,
    options: AdminClientOptions,
}

impl AdminClient {
    /// Creates a client from a `Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...`
    /// connection string. Tokens are signed per entity URL and cached until
    /// shortly before they expire.
    pub fn from_connection_string(
        connection_string: &str,
        options: AdminClientOptions,
    ) -> Result<Self, AdminError> {
        let connection_string: ConnectionString = connection_string.parse()?;
        let endpoint = connection_string.endpoint();
        let provider = ConnectionStringProvider::new(connection_string)?;
        let provider: Arc<dyn TokenProvider> =
            Arc::new(CachingTokenProvider::new(Arc::new(provider)));
        Self::new(&endpoint, provider, options)
    }

    /// Creates a client for `endpoint` (`my-ns.servicebus.windows.net`,
    /// `sb://...` or `https://...`) authorised by `token_provider`.
    pub fn new(
        endpoint: &str,
        token_provider: Arc<dyn TokenProvider>,
        options: AdminClientOptions,
    ) -> Result<Self, AdminError> {
        options.validate()?;
        let entity_manager =
            EntityManager::with_timeout(endpoint, token_provider, options.timeout())?;
        Ok(Self {
            entity_manager,
            options,
        })
    }

    /// Wraps an already configured entity manager.
    pub fn with_entity_manager(
        entity_manager: EntityManager,
        options: AdminClientOptions,
    ) -> Result<Self, AdminError> {
        options.validate()?;
        Ok(Self {
            entity_manager,
            options,
        })
    }

    pub fn entity_manager(&self) -> &EntityManager {
        &self.entity_manager
    }

    pub fn options(&self) -> &AdminClientOptions {
        &self.options
    }

    /// Adds a middleware to every subsequent request of this client.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.entity_manager.use_middleware(middleware);
    }

    /// Cancelling this token aborts in-flight requests and fails later ones.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.entity_manager.cancellation_token()
    }

    fn page_size(&self, options: Option<ListOptions>) -> usize {
        options
            .and_then(|o| o.max_page_size)
            .unwrap_or(self.options.page_size)
    }

    /// GET that maps "entity does not exist" to `Ok(None)`.
    async fn get_optional<D: AtomDocument>(&self, path: &str) -> Result<Option<D>, AdminError> {
        match self.entity_manager.get::<D>(path, &[]).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_entity(&self, path: &str) -> Result<(), AdminError> {
        self.entity_manager.delete(path, &[]).await?;
        Ok(())
    }

    /// Per-call middlewares for a PUT: `If-Match: *` for updates, plus a
    /// supplementary token for each forward target. Targets given as bare
    /// entity names are rewritten to absolute URLs in place.
    fn put_middlewares(
        &self,
        is_update: bool,
        forward_to: &mut Option<String>,
        forward_dead_lettered_messages_to: &mut Option<String>,
    ) -> Vec<Arc<dyn Middleware>> {
        let mut middlewares: Vec<Arc<dyn Middleware>> = Vec::new();
        if is_update {
            middlewares.push(Arc::new(IfMatchAny));
        }
        if let Some(target) = forward_to.as_mut() {
            *target = self.entity_manager.resolve_url(target.as_str());
            middlewares.push(Arc::new(SupplementaryAuthorization::forward_to(
                target.clone(),
                self.entity_manager.token_provider(),
            )));
        }
        if let Some(target) = forward_dead_lettered_messages_to.as_mut() {
            *target = self.entity_manager.resolve_url(target.as_str());
            middlewares.push(Arc::new(SupplementaryAuthorization::forward_dead_letters_to(
                target.clone(),
                self.entity_manager.token_provider(),
            )));
        }
        middlewares
    }
}
