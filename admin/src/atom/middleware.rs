//! Request pipeline for the management endpoint.
//!
//! A [`Handler`] turns a [`Request`] into a [`Response`]. A [`Middleware`]
//! wraps one handler in another, so a chain is built by folding middlewares
//! over the terminal [`HttpTransport`]. The handler a middleware returns sees
//! the request before everything it wraps and the response after it.

use super::errors::AtomError;
use crate::auth::TokenProvider;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Management API version sent with every request.
pub const API_VERSION: &str = "2017-04";
pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml;type=entry;charset=utf-8";
pub const SUPPLEMENTARY_AUTHORIZATION: &str = "ServiceBusSupplementaryAuthorization";
pub const DLQ_SUPPLEMENTARY_AUTHORIZATION: &str = "ServiceBusDlqSupplementaryAuthorization";

/// Timeout applied by [`HttpTransport`] to each round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets `name`, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), AtomError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            AtomError::Configuration(format!("invalid header name {name}: {e}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            AtomError::Configuration(format!("invalid value for header {name}: {e}"))
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    /// Request URL without query or fragment; the audience tokens are scoped to.
    pub fn audience(&self) -> String {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }
}

/// A fully read response. The body is drained by the transport, so dropping a
/// response never leaves a connection half consumed.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, AtomError>;
}

pub trait Middleware: Send + Sync {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

/// Folds `middlewares` over `terminal`; the first middleware ends up outermost.
pub fn compose(terminal: Arc<dyn Handler>, middlewares: &[Arc<dyn Middleware>]) -> Arc<dyn Handler> {
    middlewares
        .iter()
        .rev()
        .fold(terminal, |next, middleware| middleware.transform(next))
}

/// Handler that edits the request and forwards it.
struct RequestEditor<F> {
    edit: F,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl<F> Handler for RequestEditor<F>
where
    F: Fn(&mut Request) -> Result<(), AtomError> + Send + Sync,
{
    async fn handle(&self, mut request: Request) -> Result<Response, AtomError> {
        (self.edit)(&mut request)?;
        self.next.handle(request).await
    }
}

/// Appends `api-version` to the query string.
#[derive(Debug, Clone, Default)]
pub struct ApiVersion;

impl Middleware for ApiVersion {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RequestEditor {
            edit: |request: &mut Request| -> Result<(), AtomError> {
                request
                    .url
                    .query_pairs_mut()
                    .append_pair("api-version", API_VERSION);
                Ok(())
            },
            next,
        })
    }
}

/// Sets the ATOM entry content type on everything but GET and HEAD.
#[derive(Debug, Clone, Default)]
pub struct AtomContentType;

impl Middleware for AtomContentType {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RequestEditor {
            edit: |request: &mut Request| -> Result<(), AtomError> {
                if request.method != Method::GET && request.method != Method::HEAD {
                    request.set_header("Content-Type", ATOM_CONTENT_TYPE)?;
                }
                Ok(())
            },
            next,
        })
    }
}

/// Adds `If-Match: *`, turning a PUT into an update of an existing entity.
#[derive(Debug, Clone, Default)]
pub struct IfMatchAny;

impl Middleware for IfMatchAny {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RequestEditor {
            edit: |request: &mut Request| request.set_header("If-Match", "*"),
            next,
        })
    }
}

/// Sets a fixed header.
#[derive(Debug, Clone)]
pub struct StaticHeader {
    name: String,
    value: String,
}

impl StaticHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Middleware for StaticHeader {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        let name = self.name.clone();
        let value = self.value.clone();
        Arc::new(RequestEditor {
            edit: move |request: &mut Request| request.set_header(&name, &value),
            next,
        })
    }
}

/// Sets `Authorization` to a token scoped to the request URL.
#[derive(Clone)]
pub struct Authorization {
    provider: Arc<dyn TokenProvider>,
}

impl Authorization {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }
}

impl Middleware for Authorization {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TokenHeader {
            header: "Authorization".to_string(),
            audience: None,
            provider: self.provider.clone(),
            next,
        })
    }
}

/// Authorizes a forward target: sets `header` to a token scoped to `audience`
/// (the target entity URL) rather than to the request URL.
#[derive(Clone)]
pub struct SupplementaryAuthorization {
    header: String,
    audience: String,
    provider: Arc<dyn TokenProvider>,
}

impl SupplementaryAuthorization {
    pub fn forward_to(audience: impl Into<String>, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            header: SUPPLEMENTARY_AUTHORIZATION.to_string(),
            audience: audience.into(),
            provider,
        }
    }

    pub fn forward_dead_letters_to(
        audience: impl Into<String>,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            header: DLQ_SUPPLEMENTARY_AUTHORIZATION.to_string(),
            audience: audience.into(),
            provider,
        }
    }
}

impl Middleware for SupplementaryAuthorization {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TokenHeader {
            header: self.header.clone(),
            audience: Some(self.audience.clone()),
            provider: self.provider.clone(),
            next,
        })
    }
}

struct TokenHeader {
    header: String,
    audience: Option<String>,
    provider: Arc<dyn TokenProvider>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for TokenHeader {
    async fn handle(&self, mut request: Request) -> Result<Response, AtomError> {
        let audience = match &self.audience {
            Some(audience) => audience.clone(),
            None => request.audience(),
        };
        let token = self
            .provider
            .get_token(&audience)
            .await
            .map_err(|e| AtomError::Authentication(e.to_string()))?;
        request.set_header(&self.header, &token.header_value())?;
        self.next.handle(request).await
    }
}

/// Runs each request inside a `tracing` span carrying a fresh request id and
/// logs the outcome.
#[derive(Debug, Clone, Default)]
pub struct RequestTracing;

impl Middleware for RequestTracing {
    fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TracingHandler { next })
    }
}

struct TracingHandler {
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for TracingHandler {
    async fn handle(&self, request: Request) -> Result<Response, AtomError> {
        let request_id = uuid::Uuid::new_v4();
        let method = request.method.clone();
        let path = request.url.path().to_string();
        let span = tracing::info_span!(
            "atom_request",
            %request_id,
            %method,
            %path,
            status = tracing::field::Empty,
        );

        let result = self.next.handle(request).instrument(span.clone()).await;
        match &result {
            Ok(response) => {
                span.record("status", response.status.as_u16());
                log::debug!("{method} {path} -> {} ({request_id})", response.status);
            }
            Err(e) => log::warn!("{method} {path} failed ({request_id}): {e}"),
        }
        result
    }
}

/// Terminal handler sending requests with `reqwest`.
///
/// Each call is bounded by the configured timeout and aborted when the
/// cancellation token fires; a token cancelled before the call fails it
/// without touching the network.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
    cancellation: CancellationToken,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, AtomError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AtomError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    fn classify(&self, url: String, error: reqwest::Error) -> AtomError {
        if error.is_timeout() {
            AtomError::Timeout {
                url,
                seconds: self.timeout.as_secs(),
            }
        } else {
            AtomError::Transport { url, source: error }
        }
    }
}

#[async_trait]
impl Handler for HttpTransport {
    async fn handle(&self, request: Request) -> Result<Response, AtomError> {
        let url = request.url.to_string();
        if self.cancellation.is_cancelled() {
            return Err(AtomError::Cancelled { url });
        }

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let exchange = async move {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(Response {
                status,
                headers,
                body,
            })
        };

        tokio::select! {
            result = exchange => result.map_err(|e| self.classify(url, e)),
            () = self.cancellation.cancelled() => Err(AtomError::Cancelled { url }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthToken};
    use claims::{assert_matches, assert_ok};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Handler for Recorder {
        async fn handle(&self, request: Request) -> Result<Response, AtomError> {
            self.requests.lock().unwrap().push(request);
            Ok(Response::new(StatusCode::OK, ""))
        }
    }

    /// Records the order middlewares see the request in.
    struct Mark(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl Middleware for Mark {
        fn transform(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
            let label = self.0;
            let seen = self.1.clone();
            Arc::new(RequestEditor {
                edit: move |_: &mut Request| -> Result<(), AtomError> {
                    seen.lock().unwrap().push(label);
                    Ok(())
                },
                next,
            })
        }
    }

    struct FixedToken;

    #[async_trait]
    impl TokenProvider for FixedToken {
        async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError> {
            Ok(AuthToken {
                token: format!("token-for {audience}"),
                token_type: "SharedAccessSignature".to_string(),
                expires_in_secs: None,
            })
        }
    }

    fn request(method: Method) -> Request {
        Request::new(
            method,
            Url::parse("https://ns.servicebus.windows.net/orders").unwrap(),
        )
    }

    #[tokio::test]
    async fn first_registered_middleware_runs_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Mark("a", seen.clone())),
            Arc::new(Mark("b", seen.clone())),
            Arc::new(Mark("c", seen.clone())),
        ];
        let handler = compose(Arc::new(Recorder::default()), &middlewares);

        assert_ok!(handler.handle(request(Method::GET)).await);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn api_version_is_appended_after_existing_query() {
        let recorder = Arc::new(Recorder::default());
        let handler = ApiVersion.transform(recorder.clone());
        let mut req = request(Method::GET);
        req.url.set_query(Some("$top=10&$skip=10"));

        assert_ok!(handler.handle(req).await);
        let requests = recorder.requests.lock().unwrap();
        assert_eq!(
            requests[0].url.query(),
            Some("$top=10&$skip=10&api-version=2017-04")
        );
    }

    #[tokio::test]
    async fn content_type_only_on_writes() {
        let recorder = Arc::new(Recorder::default());
        let handler = AtomContentType.transform(recorder.clone());

        assert_ok!(handler.handle(request(Method::GET)).await);
        assert_ok!(handler.handle(request(Method::PUT)).await);

        let requests = recorder.requests.lock().unwrap();
        assert!(requests[0].headers.get("content-type").is_none());
        assert_eq!(requests[1].headers["content-type"], ATOM_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn authorization_is_scoped_to_request_url_without_query() {
        let recorder = Arc::new(Recorder::default());
        let provider: Arc<dyn TokenProvider> = Arc::new(FixedToken);
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(ApiVersion),
            Arc::new(Authorization::new(provider)),
        ];
        let handler = compose(recorder.clone(), &middlewares);

        assert_ok!(handler.handle(request(Method::GET)).await);
        let requests = recorder.requests.lock().unwrap();
        assert_eq!(
            requests[0].headers["authorization"],
            "token-for https://ns.servicebus.windows.net/orders"
        );
    }

    #[tokio::test]
    async fn supplementary_authorization_uses_target_audience() {
        let recorder = Arc::new(Recorder::default());
        let provider: Arc<dyn TokenProvider> = Arc::new(FixedToken);
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(SupplementaryAuthorization::forward_to(
                "https://ns.servicebus.windows.net/target",
                provider.clone(),
            )),
            Arc::new(SupplementaryAuthorization::forward_dead_letters_to(
                "https://ns.servicebus.windows.net/dlq-target",
                provider,
            )),
        ];
        let handler = compose(recorder.clone(), &middlewares);

        assert_ok!(handler.handle(request(Method::PUT)).await);
        let requests = recorder.requests.lock().unwrap();
        assert_eq!(
            requests[0].headers[SUPPLEMENTARY_AUTHORIZATION],
            "token-for https://ns.servicebus.windows.net/target"
        );
        assert_eq!(
            requests[0].headers[DLQ_SUPPLEMENTARY_AUTHORIZATION],
            "token-for https://ns.servicebus.windows.net/dlq-target"
        );
    }

    #[tokio::test]
    async fn cancelled_transport_fails_without_sending() {
        let transport = HttpTransport::new(DEFAULT_TIMEOUT).unwrap();
        transport.cancellation_token().cancel();

        let result = transport.handle(request(Method::GET)).await;
        assert_matches!(result, Err(AtomError::Cancelled { .. }));
    }

    #[test]
    fn invalid_header_value_is_rejected() {
        let mut req = request(Method::GET);
        assert_matches!(
            req.set_header("If-Match", "bad\nvalue"),
            Err(AtomError::Configuration(_))
        );
    }
}
