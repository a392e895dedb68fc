//! Request descriptors and the authenticated executor
//!
//! The executor owns URL construction, bearer-token injection, outcome
//! classification, and the single-hop pagination rule. Every request flows
//! through here; the batch layer never touches HTTP directly.

use log::{debug, trace, warn};
use reqwest::{StatusCode, header};
use serde_json::Value;

use crate::auth::{AuthToken, Secret, TokenCache};
use crate::error::{Error, Result};
use crate::json_path;
use crate::{ClientConfig, USER_AGENT};

/// Fixed version segment between the base URL and every route
pub const API_VERSION_SEGMENT: &str = "v3";

/// Path of the continuation cursor within a response body
pub const CURSOR_PATH: &str = "data.next";

/// Path of the result array within a response body
pub const RESULTS_PATH: &str = "data.results";

/// Query parameter carrying the continuation cursor on the follow-up page
pub const CONTINUATION_PAGE_PARAM: &str = "from";

/// A continuation is followed only when the first page holds at most this
/// many items
pub const CONTINUATION_MAX_FIRST_PAGE: usize = 30;

/// Marker the API places in 400 bodies for non-routable address lookups
const NON_ROUTABLE_MARKER: &str = "not a valid routable";

/// Build the full URL for a route, tolerant of stray slashes
pub(crate) fn api_url(base_url: &str, route: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        API_VERSION_SEGMENT,
        route.trim_start_matches('/')
    )
}

/// Pull a human-readable detail out of an error response body
pub(crate) fn body_detail(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// One API request: route, query, optional body, and the correlation id
/// that ties its result back to the entity that prompted it
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    correlation_id: Option<String>,
    method: reqwest::Method,
    route: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestDescriptor {
    /// Create a GET descriptor for a route
    pub fn get(route: impl Into<String>) -> Self {
        Self::with_method(reqwest::Method::GET, route)
    }

    /// Create a POST descriptor for a route
    pub fn post(route: impl Into<String>) -> Self {
        Self::with_method(reqwest::Method::POST, route)
    }

    fn with_method(method: reqwest::Method, route: impl Into<String>) -> Self {
        Self {
            correlation_id: None,
            method,
            route: route.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set the correlation id carried through to the result
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header, overriding executor defaults of the same name
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The correlation id, when one was set
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// The HTTP method
    pub fn method(&self) -> &reqwest::Method {
        &self.method
    }

    /// The route under the versioned base URL
    pub fn route(&self) -> &str {
        &self.route
    }

    /// The query parameters
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The extra headers
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The JSON body, when one was attached
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Classified outcome of one executed descriptor
///
/// `body: None` is the empty outcome (404, or the non-routable 400 case);
/// `limit_hit` marks a 429 carried as data rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub correlation_id: Option<String>,
    pub status: u16,
    pub body: Option<Value>,
    pub limit_hit: bool,
}

impl RawResult {
    /// A result with a payload
    pub fn found(correlation_id: Option<String>, status: u16, body: Value) -> Self {
        Self {
            correlation_id,
            status,
            body: Some(body),
            limit_hit: false,
        }
    }

    /// An empty result (no data for the queried value)
    pub fn empty(correlation_id: Option<String>, status: u16) -> Self {
        Self {
            correlation_id,
            status,
            body: None,
            limit_hit: false,
        }
    }

    /// A rate-limited result
    pub fn limit(correlation_id: Option<String>, status: u16) -> Self {
        Self {
            correlation_id,
            status,
            body: None,
            limit_hit: true,
        }
    }
}

#[derive(Debug)]
enum Disposition {
    Payload(Value),
    Empty,
}

fn classify_response(status: StatusCode, raw: &str) -> Result<Disposition> {
    match status.as_u16() {
        200..=299 => {
            if raw.trim().is_empty() {
                return Ok(Disposition::Payload(Value::Null));
            }
            serde_json::from_str(raw)
                .map(Disposition::Payload)
                .map_err(|_| Error::unexpected(status.as_u16(), "Response body is not valid JSON"))
        }
        404 => Ok(Disposition::Empty),
        400 => {
            let detail = body_detail(raw);
            if detail.contains(NON_ROUTABLE_MARKER) {
                Ok(Disposition::Empty)
            } else {
                Err(Error::bad_request(detail))
            }
        }
        401 | 403 => Err(Error::authentication(
            status.as_u16(),
            format!(
                "You do not have permission to access the VulnCheck API. Validate your API key. ({})",
                body_detail(raw)
            ),
        )),
        429 => Err(Error::RateLimited),
        500..=599 => Err(Error::server(status.as_u16(), body_detail(raw))),
        other => Err(Error::unexpected(other, body_detail(raw))),
    }
}

fn continuation_cursor(body: &Value) -> Option<String> {
    match json_path::get_path(body, CURSOR_PATH)? {
        Value::String(cursor) if !cursor.is_empty() => Some(cursor.clone()),
        Value::Number(offset) => Some(offset.to_string()),
        _ => None,
    }
}

fn merge_pages(first: &mut Value, second: &Value) {
    let mut merged = json_path::get_path(first, RESULTS_PATH)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if let Some(more) = json_path::get_path(second, RESULTS_PATH).and_then(Value::as_array) {
        merged.extend(more.iter().cloned());
    }
    if let Some(data) = first.get_mut("data").and_then(Value::as_object_mut) {
        data.insert("results".to_string(), Value::Array(merged));
        // The merged body keeps the second page's cursor; it is never
        // followed, but callers can see the result was truncated.
        let next = json_path::get_path(second, CURSOR_PATH)
            .cloned()
            .unwrap_or(Value::Null);
        data.insert("next".to_string(), next);
    }
}

struct PageOutcome {
    status: u16,
    body: Option<Value>,
    limit_hit: bool,
}

/// Authenticated request executor bound to one base URL and secret key
pub struct RequestExecutor {
    http: reqwest::Client,
    base_url: String,
    secret_key: Secret,
    tokens: TokenCache,
}

impl RequestExecutor {
    /// Create an executor with its own token cache
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let tokens = TokenCache::new(http.clone());
        Self::assemble(config, http, tokens)
    }

    /// Create an executor around an injected token cache
    pub fn with_token_cache(config: &ClientConfig, tokens: TokenCache) -> Result<Self> {
        let http = build_http_client(config)?;
        Self::assemble(config, http, tokens)
    }

    fn assemble(config: &ClientConfig, http: reqwest::Client, tokens: TokenCache) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            secret_key: Secret::new(config.api_key.clone()),
            tokens,
        })
    }

    /// The base URL this executor is bound to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token cache backing this executor
    pub fn token_cache(&self) -> &TokenCache {
        &self.tokens
    }

    /// Get a live bearer token for the configured secret
    pub async fn get_token(&self) -> Result<AuthToken> {
        self.tokens.get_token(&self.secret_key, &self.base_url).await
    }

    /// Execute a descriptor, consulting the token cache first
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<RawResult> {
        let token = self.get_token().await?;
        self.execute_with_token(descriptor, &token).await
    }

    /// Execute a descriptor with an explicit bearer token
    ///
    /// Follows at most one continuation: the cursor at `data.next` is
    /// resubmitted as the `from` parameter only when the first page holds
    /// at most [`CONTINUATION_MAX_FIRST_PAGE`] items, and the two pages'
    /// result arrays are concatenated.
    pub async fn execute_with_token(
        &self,
        descriptor: &RequestDescriptor,
        token: &AuthToken,
    ) -> Result<RawResult> {
        let correlation_id = descriptor.correlation_id().map(str::to_string);
        let first = self.send_once(descriptor, token, None).await?;
        if first.limit_hit {
            return Ok(RawResult::limit(correlation_id, first.status));
        }
        let Some(mut body) = first.body else {
            return Ok(RawResult::empty(correlation_id, first.status));
        };

        if let Some(cursor) = continuation_cursor(&body) {
            let first_count = json_path::array_len_at(&body, RESULTS_PATH);
            if first_count <= CONTINUATION_MAX_FIRST_PAGE {
                debug!(
                    "following continuation for {} ({} item(s) on first page)",
                    descriptor.route(),
                    first_count
                );
                let second = self.send_once(descriptor, token, Some(&cursor)).await?;
                if second.limit_hit {
                    // Keep the first page; the marker tells the caller the
                    // continuation was cut off by the lookup limit.
                    return Ok(RawResult {
                        correlation_id,
                        status: second.status,
                        body: Some(body),
                        limit_hit: true,
                    });
                }
                if let Some(second_body) = second.body {
                    merge_pages(&mut body, &second_body);
                }
            } else {
                debug!(
                    "skipping continuation for {} (first page has {} items)",
                    descriptor.route(),
                    first_count
                );
            }
        }

        Ok(RawResult::found(correlation_id, first.status, body))
    }

    async fn send_once(
        &self,
        descriptor: &RequestDescriptor,
        token: &AuthToken,
        cursor: Option<&str>,
    ) -> Result<PageOutcome> {
        let url = api_url(&self.base_url, descriptor.route());
        let mut request = self
            .http
            .request(descriptor.method().clone(), url.as_str())
            .header(header::AUTHORIZATION, token.bearer());
        if !descriptor.query().is_empty() {
            request = request.query(descriptor.query());
        }
        if let Some(cursor) = cursor {
            request = request.query(&[(CONTINUATION_PAGE_PARAM, cursor)]);
        }
        for (name, value) in descriptor.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = descriptor.body() {
            request = request.json(body);
        }

        trace!("{} {}", descriptor.method(), url);
        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        match classify_response(status, &raw) {
            Ok(Disposition::Payload(body)) => Ok(PageOutcome {
                status: status.as_u16(),
                body: Some(body),
                limit_hit: false,
            }),
            Ok(Disposition::Empty) => {
                debug!("{} returned no data ({})", descriptor.route(), status);
                Ok(PageOutcome {
                    status: status.as_u16(),
                    body: None,
                    limit_hit: false,
                })
            }
            Err(Error::RateLimited) => {
                warn!("lookup limit reached on {}", descriptor.route());
                Ok(PageOutcome {
                    status: status.as_u16(),
                    body: None,
                    limit_hit: true,
                })
            }
            Err(err) => Err(err),
        }
    }
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(client)
}
