use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::token::AuthToken;
use crate::error::{ApiError, ApiResult};
use crate::sources::auth::{FetchToken, TdxAuthSource, AUTH_PATH};

/// Per-environment bearer token cache.
///
/// `Unauthenticated -> Authenticated` on a successful fetch, back to
/// `Unauthenticated` on invalidation. Concurrent callers that find the cache
/// empty wait on `fetch_gate`, so only one of them talks to the auth endpoint.
#[derive(Debug)]
pub struct AuthTokenManager<S: FetchToken = TdxAuthSource> {
    environment: String,
    source: S,
    cached: RwLock<Option<AuthToken>>,
    fetch_gate: Mutex<()>,
}

impl<S: FetchToken> AuthTokenManager<S> {
    pub fn new(environment: impl Into<String>, source: S) -> Self {
        Self {
            environment: environment.into(),
            source,
            cached: RwLock::new(None),
            fetch_gate: Mutex::new(()),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Current credential as request headers, fetching it first if needed.
    pub async fn get_auth_headers(&self) -> ApiResult<HeaderMap> {
        let token = self.current_token().await?;
        auth_headers(&token, &self.environment)
    }

    /// Cached token, or a freshly fetched one when the cache is empty.
    pub async fn current_token(&self) -> ApiResult<AuthToken> {
        if let Some(token) = self.cached.read().await.clone() {
            return Ok(token);
        }

        let _gate = self.fetch_gate.lock().await;
        // someone else may have finished the fetch while we waited
        if let Some(token) = self.cached.read().await.clone() {
            debug!(environment = %self.environment, "reusing token fetched by a concurrent request");
            return Ok(token);
        }

        let token = self.source.fetch_token().await?;
        *self.cached.write().await = Some(token.clone());
        info!(environment = %self.environment, "auth token acquired");
        Ok(token)
    }

    pub async fn invalidate_token(&self) {
        if self.cached.write().await.take().is_some() {
            info!(environment = %self.environment, "auth token invalidated");
        }
    }

    /// Drops the cached token only if it is still `rejected`.
    /// Returns false when another request already replaced or cleared it.
    pub async fn invalidate_if_current(&self, rejected: &AuthToken) -> bool {
        let mut cached = self.cached.write().await;
        match cached.as_ref() {
            Some(current) if current == rejected => {
                *cached = None;
                info!(environment = %self.environment, "auth token invalidated after rejection");
                true
            }
            _ => {
                debug!(environment = %self.environment, "rejected token already replaced");
                false
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.cached.read().await.is_some()
    }
}

pub fn auth_headers(token: &AuthToken, environment: &str) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&token.bearer()).map_err(|e| ApiError::Auth {
        endpoint: format!("POST {}", AUTH_PATH),
        status: None,
        message: format!("token for '{}' is not a valid header value: {}", environment, e),
    })?;
    headers.insert(AUTHORIZATION, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingSource {
        fetches: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FetchToken for CountingSource {
        async fn fetch_token(&self) -> ApiResult<AuthToken> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            if self.fail {
                return Err(ApiError::Auth {
                    endpoint: "POST /api/auth".into(),
                    status: Some(403),
                    message: "bad credentials".into(),
                });
            }
            Ok(AuthToken::new(format!("token-{}", n + 1)))
        }
    }

    fn manager(fail: bool) -> (Arc<AuthTokenManager<CountingSource>>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            fetches: fetches.clone(),
            fail,
        };
        (Arc::new(AuthTokenManager::new("test", source)), fetches)
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_fetch() {
        let (manager, fetches) = manager(false);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.current_token().await }));
        }
        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.value(), "token-1");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn headers_carry_bearer_token() {
        let (manager, _) = manager(false);
        let headers = manager.get_auth_headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer token-1");
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (manager, fetches) = manager(false);
        manager.current_token().await.unwrap();
        manager.current_token().await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        manager.invalidate_token().await;
        assert!(!manager.is_authenticated().await);
        let token = manager.current_token().await.unwrap();
        assert_eq!(token.value(), "token-2");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_rejection_does_not_drop_fresh_token() {
        let (manager, fetches) = manager(false);
        let first = manager.current_token().await.unwrap();

        assert!(manager.invalidate_if_current(&first).await);
        let second = manager.current_token().await.unwrap();

        // a second request that was rejected with the old token
        assert!(!manager.invalidate_if_current(&first).await);
        assert_eq!(manager.current_token().await.unwrap(), second);
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_empty() {
        let (manager, fetches) = manager(true);
        let err = manager.get_auth_headers().await.unwrap_err();
        assert!(matches!(err, ApiError::Auth { status: Some(403), .. }));
        assert!(!manager.is_authenticated().await);

        manager.get_auth_headers().await.unwrap_err();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
