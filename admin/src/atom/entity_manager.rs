use super::errors::{AtomError, ResponseError};
use super::middleware::{
    ApiVersion, AtomContentType, Authorization, DEFAULT_TIMEOUT, Handler, HttpTransport,
    Middleware, Request, RequestTracing, Response, compose,
};
use super::models::{AtomDocument, EMPTY_SERVICE_FEED_TITLE, Feed};
use crate::auth::TokenProvider;
use quick_xml::events::Event;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Client for the ATOM management endpoint of one namespace.
///
/// Every call runs through the configured middleware stack (first registered
/// sees the request first), then through the per-call middlewares, then the
/// transport. Responses with a status of 400 or above become
/// [`AtomError::Response`].
///
/// # Examples
///
/// ```no_run
/// use admin::atom::{EntityManager, QueueEnvelope};
/// use admin::auth::{ConnectionString, ConnectionStringProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cs: ConnectionString = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=k;SharedAccessKey=v".parse()?;
/// let provider = Arc::new(ConnectionStringProvider::new(cs.clone())?);
/// let manager = EntityManager::new(&cs.endpoint(), provider)?;
/// let queue: QueueEnvelope = manager.get("/orders", &[]).await?;
/// println!("{}", queue.name());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EntityManager {
    host: Url,
    token_provider: Arc<dyn TokenProvider>,
    transport: Arc<dyn Handler>,
    middlewares: Vec<Arc<dyn Middleware>>,
    cancellation: CancellationToken,
}

impl EntityManager {
    /// Creates a manager talking to `endpoint` over HTTPS with the default
    /// 60 second timeout.
    pub fn new(endpoint: &str, token_provider: Arc<dyn TokenProvider>) -> Result<Self, AtomError> {
        Self::with_timeout(endpoint, token_provider, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: &str,
        token_provider: Arc<dyn TokenProvider>,
        timeout: Duration,
    ) -> Result<Self, AtomError> {
        let cancellation = CancellationToken::new();
        let transport = HttpTransport::new(timeout)?.with_cancellation(cancellation.clone());
        let mut manager = Self::with_transport(endpoint, token_provider, Arc::new(transport))?;
        manager.cancellation = cancellation;
        Ok(manager)
    }

    /// Creates a manager that sends through `transport` instead of HTTP.
    /// The default middleware stack is still installed.
    pub fn with_transport(
        endpoint: &str,
        token_provider: Arc<dyn TokenProvider>,
        transport: Arc<dyn Handler>,
    ) -> Result<Self, AtomError> {
        let host = normalize_endpoint(endpoint)?;
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(ApiVersion),
            Arc::new(AtomContentType),
            Arc::new(Authorization::new(token_provider.clone())),
            Arc::new(RequestTracing),
        ];

        Ok(Self {
            host,
            token_provider,
            transport,
            middlewares,
            cancellation: CancellationToken::new(),
        })
    }

    /// Appends `middleware` to the stack. Configuration time only: `&mut self`
    /// keeps this from racing with requests on the same manager.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Namespace endpoint, always ending in `/`.
    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        self.token_provider.clone()
    }

    /// Token that aborts in-flight and future HTTP calls of this manager when
    /// cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Absolute URL of `target`. Already absolute URLs are returned as is;
    /// anything else is treated as an entity path in this namespace.
    pub fn resolve_url(&self, target: &str) -> String {
        match Url::parse(target) {
            Ok(url) if url.has_host() => target.to_string(),
            _ => format!("{}{}", self.host, target.trim_start_matches('/')),
        }
    }

    pub async fn get<T: AtomDocument>(
        &self,
        path: &str,
        extra: &[Arc<dyn Middleware>],
    ) -> Result<T, AtomError> {
        let response = self.execute(Method::GET, path, None, extra).await?;
        deserialize_body(&response.body)
    }

    /// GET returning the undecoded response.
    pub async fn get_raw(
        &self,
        path: &str,
        extra: &[Arc<dyn Middleware>],
    ) -> Result<Response, AtomError> {
        self.execute(Method::GET, path, None, extra).await
    }

    pub async fn put<B, T>(
        &self,
        path: &str,
        body: &B,
        extra: &[Arc<dyn Middleware>],
    ) -> Result<T, AtomError>
    where
        B: Serialize + Sync,
        T: AtomDocument,
    {
        let xml =
            quick_xml::se::to_string(body).map_err(|e| AtomError::Serialization(e.to_string()))?;
        let response = self.execute(Method::PUT, path, Some(xml), extra).await?;
        deserialize_body(&response.body)
    }

    pub async fn delete(
        &self,
        path: &str,
        extra: &[Arc<dyn Middleware>],
    ) -> Result<Response, AtomError> {
        self.execute(Method::DELETE, path, None, extra).await
    }

    /// Sends one request through the client stack and then `extra`.
    ///
    /// `extra` runs after the client stack on the request path, so a header it
    /// sets overrides a client middleware header of the same name. Callers
    /// must not rely on the reverse order.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        extra: &[Arc<dyn Middleware>],
    ) -> Result<Response, AtomError> {
        let raw_url = format!("{}{}", self.host, path.trim_start_matches('/'));
        let url = Url::parse(&raw_url).map_err(|e| AtomError::InvalidUrl {
            url: raw_url.clone(),
            reason: e.to_string(),
        })?;

        let mut request = Request::new(method, url);
        request.body = body;

        let handler = compose(compose(self.transport.clone(), extra), &self.middlewares);
        let response = handler.handle(request).await?;

        if response.status.as_u16() >= 400 {
            return Err(AtomError::Response(format_management_error(
                response.status.as_u16(),
                &response.body,
            )));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("host", &self.host.as_str())
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

/// Turns `ns.servicebus.windows.net`, `sb://ns.servicebus.windows.net/` or an
/// HTTP(S) URL into the HTTPS (or given HTTP) root URL of the namespace.
fn normalize_endpoint(endpoint: &str) -> Result<Url, AtomError> {
    let trimmed = endpoint.trim();
    let candidate = match trimmed.split_once("://") {
        Some(("http", _)) | Some(("https", _)) => trimmed.to_string(),
        Some((_, rest)) => format!("https://{rest}"),
        None => format!("https://{trimmed}"),
    };

    let mut url = Url::parse(&candidate).map_err(|e| AtomError::InvalidUrl {
        url: endpoint.to_string(),
        reason: e.to_string(),
    })?;
    if !url.has_host() {
        return Err(AtomError::InvalidUrl {
            url: endpoint.to_string(),
            reason: "endpoint has no host".to_string(),
        });
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ManagementError {
    #[serde(rename = "Code")]
    code: i64,
    #[serde(rename = "Detail", default)]
    detail: String,
}

/// Normalises an error response body.
///
/// A `<Error><Code>..</Code><Detail>..</Detail></Error>` body becomes
/// `error code: <code>, Details: <detail>`; any other body is reported
/// together with the reason it could not be read as one.
pub fn format_management_error(status: u16, body: &str) -> ResponseError {
    let parsed = root_element(body).and_then(|_| {
        quick_xml::de::from_str::<ManagementError>(body)
            .map_err(|e| AtomError::Deserialization(e.to_string()))
    });
    let message = match parsed {
        Ok(error) => format!("error code: {}, Details: {}", error.code, error.detail),
        Err(e) => format!("body:{body} error:{e}"),
    };
    ResponseError {
        status,
        message,
        body: body.to_string(),
    }
}

/// Decodes `body` as `T`.
///
/// When that fails and the body is the service's empty "Publicly Listed
/// Services" feed, the failure becomes [`AtomError::EntityNotFound`].
pub fn deserialize_body<T: AtomDocument>(body: &str) -> Result<T, AtomError> {
    match decode_document::<T>(body) {
        Ok(document) => Ok(document),
        Err(e) if is_empty_service_feed(body) => {
            log::debug!("Empty service feed in place of <{}>: {e}", T::ROOT_ELEMENT);
            Err(AtomError::EntityNotFound)
        }
        Err(e) => Err(e),
    }
}

fn decode_document<T: AtomDocument>(body: &str) -> Result<T, AtomError> {
    let root = root_element(body)?;
    if root != T::ROOT_ELEMENT {
        return Err(AtomError::Deserialization(format!(
            "expected element <{}> but found <{root}>",
            T::ROOT_ELEMENT
        )));
    }
    quick_xml::de::from_str(body).map_err(|e| AtomError::Deserialization(e.to_string()))
}

fn is_empty_service_feed(body: &str) -> bool {
    match decode_document::<Feed<serde::de::IgnoredAny>>(body) {
        Ok(feed) => {
            feed.entries.is_empty()
                && feed
                    .title
                    .is_some_and(|title| title.text == EMPTY_SERVICE_FEED_TITLE)
        }
        Err(_) => false,
    }
}

/// Local name of the document's root element.
fn root_element(body: &str) -> Result<String, AtomError> {
    let mut reader = quick_xml::Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                return Ok(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => {
                return Err(AtomError::Deserialization(
                    "unexpected EOF before root element".to_string(),
                ));
            }
            Ok(_) => continue,
            Err(e) => return Err(AtomError::Deserialization(e.to_string())),
        }
    }
}
