use super::errors::AuthError;
use super::provider::{AuthToken, TokenProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Tokens are refreshed this long before they expire.
const REFRESH_BUFFER: Duration = Duration::from_secs(300);

/// A cached token with expiration tracking.
#[derive(Clone, Debug)]
pub struct CachedToken {
    pub token: AuthToken,
    pub expires_at: Instant,
}

impl CachedToken {
    pub fn new(token: AuthToken, expires_in: Duration) -> Self {
        Self {
            token,
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Whether the token is within the refresh buffer of its expiry.
    pub fn needs_refresh(&self) -> bool {
        Instant::now() + REFRESH_BUFFER >= self.expires_at
    }
}

/// Tokens keyed by audience.
#[derive(Clone, Default)]
pub struct TokenCache {
    cache: Arc<RwLock<HashMap<String, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token for `audience` unless it is due for refresh.
    pub async fn get(&self, audience: &str) -> Option<AuthToken> {
        let cache = self.cache.read().await;
        cache
            .get(audience)
            .filter(|cached| !cached.needs_refresh())
            .map(|cached| cached.token.clone())
    }

    /// Stores `token` for `audience` and drops every expired entry.
    pub async fn set(&self, audience: String, token: CachedToken) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, cached| !cached.is_expired());
        cache.insert(audience, token);
    }

    pub async fn invalidate(&self, audience: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(audience);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }
}

/// Wraps a provider and reuses its tokens per audience until they near expiry.
/// Tokens without a lifetime are never cached.
pub struct CachingTokenProvider {
    inner: Arc<dyn TokenProvider>,
    cache: TokenCache,
}

impl CachingTokenProvider {
    pub fn new(inner: Arc<dyn TokenProvider>) -> Self {
        Self {
            inner,
            cache: TokenCache::new(),
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }
}

#[async_trait]
impl TokenProvider for CachingTokenProvider {
    async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError> {
        if let Some(token) = self.cache.get(audience).await {
            return Ok(token);
        }

        let token = self.inner.get_token(audience).await?;
        if let Some(secs) = token.expires_in_secs {
            log::debug!("Caching token for {audience} ({secs}s)");
            self.cache
                .set(
                    audience.to_string(),
                    CachedToken::new(token.clone(), Duration::from_secs(secs)),
                )
                .await;
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_none, assert_ok, assert_some_eq};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        lifetime: Option<u64>,
    }

    #[async_trait]
    impl TokenProvider for Counting {
        async fn get_token(&self, audience: &str) -> Result<AuthToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthToken::bearer(format!("{audience}#{n}"), self.lifetime))
        }
    }

    fn counting(lifetime: Option<u64>) -> Arc<Counting> {
        Arc::new(Counting {
            calls: AtomicUsize::new(0),
            lifetime,
        })
    }

    #[tokio::test]
    async fn reuses_token_per_audience() {
        let inner = counting(Some(3600));
        let provider = CachingTokenProvider::new(inner.clone());

        let a1 = assert_ok!(provider.get_token("a").await);
        let a2 = assert_ok!(provider.get_token("a").await);
        let b = assert_ok!(provider.get_token("b").await);

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cache().len().await, 2);
    }

    #[tokio::test]
    async fn short_lived_tokens_are_refetched() {
        let inner = counting(Some(60));
        let provider = CachingTokenProvider::new(inner.clone());

        assert_ok!(provider.get_token("a").await);
        assert_ok!(provider.get_token("a").await);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn tokens_without_lifetime_are_not_cached() {
        let inner = counting(None);
        let provider = CachingTokenProvider::new(inner.clone());

        assert_ok!(provider.get_token("a").await);
        assert_eq!(provider.cache().len().await, 0);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let cache = TokenCache::new();
        let token = AuthToken::bearer("t", Some(3600));
        cache
            .set("a".into(), CachedToken::new(token.clone(), Duration::from_secs(3600)))
            .await;
        assert_some_eq!(cache.get("a").await, token);

        cache.invalidate("a").await;
        assert_none!(cache.get("a").await);

        cache
            .set("b".into(), CachedToken::new(token, Duration::from_secs(3600)))
            .await;
        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn set_evicts_expired_tokens() {
        let cache = TokenCache::new();
        let token = AuthToken::bearer("t", Some(3600));
        cache
            .set("stale".into(), CachedToken::new(token.clone(), Duration::ZERO))
            .await;
        cache
            .set("live".into(), CachedToken::new(token.clone(), Duration::from_secs(3600)))
            .await;

        assert_eq!(cache.len().await, 1);
        assert_some_eq!(cache.get("live").await, token);
    }

    #[test]
    fn cached_token_expiry() {
        let token = CachedToken::new(AuthToken::bearer("t", None), Duration::from_secs(0));
        assert!(token.is_expired());
        assert!(token.needs_refresh());
    }
}
