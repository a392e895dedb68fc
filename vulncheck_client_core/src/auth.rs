//! Credential exchange and token caching
//!
//! The API issues short-lived bearer tokens in exchange for a long-lived
//! secret key. One live token is cached per secret; the cache deadline is
//! the server-reported expiry minus a safety margin, so a token is never
//! handed out with only a sliver of life left.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::Deserialize;
use tokio::sync::RwLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::request::{api_url, body_detail};

/// Route under the versioned base URL that exchanges a secret for a token
pub const AUTH_ROUTE: &str = "access_token";

/// Seconds subtracted from the server-reported expiry before caching
const EXPIRY_SAFETY_MARGIN_SECS: i64 = 10;

/// A long-lived API secret key
///
/// The value is zeroed on drop and never appears in debug output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    inner: String,
}

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Access the underlying value
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Check whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A short-lived bearer credential with its absolute expiry
#[derive(Clone, PartialEq)]
pub struct AuthToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl AuthToken {
    /// Create a token from its opaque value and expiry instant
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// The opaque token value
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The server-reported expiry instant
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// The `Authorization` header value for this token
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// How long this token may stay cached from `now`, margin applied
    ///
    /// `None` means the token is already inside the safety margin and must
    /// not be cached.
    pub fn cache_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        let usable = self.expires_at - now - chrono::Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS);
        if usable > chrono::Duration::zero() {
            usable.to_std().ok()
        } else {
            None
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expiration_utc: DateTime<Utc>,
}

struct CachedToken {
    token: AuthToken,
    deadline: Instant,
}

/// Per-secret cache of live bearer tokens
///
/// The cache is owned by whichever executor it is injected into; separate
/// executors with separate caches never share tokens.
pub struct TokenCache {
    http: reqwest::Client,
    entries: RwLock<HashMap<String, CachedToken>>,
}

impl TokenCache {
    /// Create a cache that performs exchanges over the given HTTP client
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a live token for the secret, exchanging only on miss or expiry
    ///
    /// Concurrent misses for the same key may each perform an exchange;
    /// the last response wins and tokens are interchangeable.
    // TODO: coalesce concurrent misses behind a single in-flight exchange.
    pub async fn get_token(&self, secret_key: &Secret, base_url: &str) -> Result<AuthToken> {
        if let Some(token) = self.cached(secret_key.expose()).await {
            trace!("token cache hit");
            return Ok(token);
        }

        debug!("token cache miss; exchanging credential");
        let token = self.exchange(secret_key, base_url).await?;
        match token.cache_ttl(Utc::now()) {
            Some(ttl) => {
                let mut entries = self.entries.write().await;
                entries.insert(
                    secret_key.expose().to_string(),
                    CachedToken {
                        token: token.clone(),
                        deadline: Instant::now() + ttl,
                    },
                );
                debug!("cached token for {}s", ttl.as_secs());
            }
            None => {
                warn!("token already inside expiry margin; not caching");
            }
        }
        Ok(token)
    }

    /// Drop all cached tokens
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of live cache entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check whether the cache holds no tokens
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn cached(&self, key: &str) -> Option<AuthToken> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.deadline > Instant::now())
            .map(|entry| entry.token.clone())
    }

    async fn exchange(&self, secret_key: &Secret, base_url: &str) -> Result<AuthToken> {
        let url = api_url(base_url, AUTH_ROUTE);
        let response = self
            .http
            .post(&url)
            .form(&[("secret_key", secret_key.expose())])
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            warn!("credential exchange rejected ({status})");
            return Err(Error::authentication(
                status.as_u16(),
                format!(
                    "Credential exchange rejected. Validate your API key. ({})",
                    body_detail(&raw)
                ),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&raw).map_err(|_| {
            Error::authentication(
                status.as_u16(),
                "Malformed token response from the access_token route",
            )
        })?;
        Ok(AuthToken::new(parsed.access_token, parsed.expiration_utc))
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("super-sensitive");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-sensitive"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AuthToken::new("opaque-token", Utc::now());
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("opaque-token"));
    }

    #[test]
    fn test_bearer_format() {
        let token = AuthToken::new("abc123", Utc::now());
        assert_eq!(token.bearer(), "Bearer abc123");
    }

    #[test]
    fn test_cache_ttl_subtracts_margin() {
        let now = Utc::now();
        let token = AuthToken::new("t", now + chrono::Duration::seconds(70));
        let ttl = token.cache_ttl(now).unwrap();
        assert_eq!(ttl.as_secs(), 60);
    }

    #[test]
    fn test_cache_ttl_inside_margin_is_none() {
        let now = Utc::now();
        let token = AuthToken::new("t", now + chrono::Duration::seconds(5));
        assert!(token.cache_ttl(now).is_none());
    }

    #[test]
    fn test_cache_ttl_in_past_is_none() {
        let now = Utc::now();
        let token = AuthToken::new("t", now - chrono::Duration::seconds(30));
        assert!(token.cache_ttl(now).is_none());
    }

    #[test]
    fn test_expiration_parses_iso8601() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"access_token": "tok", "expiration_utc": "2030-01-02T03:04:05Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.access_token, "tok");
        assert_eq!(parsed.expiration_utc.to_rfc3339(), "2030-01-02T03:04:05+00:00");
    }
}
