// crates/posture-graph/src/client.rs
// ============================================================================
// Module: Graph Client
// Description: Cached, paginating, retrying client for the tenant object API.
// Purpose: Satisfy check data requests with bounded upstream load.
// Dependencies: posture-core, reqwest, tokio, tracing
// ============================================================================

//! ## Overview
//! [`GraphClient`] resolves an [`ApiRequest`] against the session's API origin.
//! Cacheable reads are answered from the [`CacheStore`] when present. Misses go
//! to the network: transient statuses and transport failures are retried per
//! [`RetryPolicy`], and collection responses are paged by following
//! `@odata.nextLink` until it is absent.
//!
//! Security posture: response bodies are untrusted and size limited; the
//! bearer credential is only attached to URLs on the session origin.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use posture_core::ApiError;
use posture_core::ApiRequest;
use posture_core::ApiResponse;
use posture_core::ApiVersion;
use posture_core::CacheStats;
use posture_core::CacheStore;
use posture_core::CancellationToken;
use posture_core::ClearScope;
use posture_core::HttpMethod;
use posture_core::MemoryCacheStore;
use posture_core::ObjectSource;
use reqwest::Client;
use reqwest::Method;
use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::RETRY_AFTER;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::retry::RetryPolicy;
use crate::retry::is_retryable_status;
use crate::session::Session;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default maximum number of pages followed for one collection.
pub const DEFAULT_MAX_PAGES: u32 = 1_000;
/// Default maximum response body size per page.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("posture/", env!("CARGO_PKG_VERSION"));
/// Continuation link property on collection pages.
const NEXT_LINK_FIELD: &str = "@odata.nextLink";
/// Collection item property on collection pages.
const COLLECTION_FIELD: &str = "value";
/// Maximum characters of an upstream error message kept in errors.
const MAX_ERROR_MESSAGE_CHARS: usize = 512;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Graph client configuration.
///
/// # Invariants
/// - `max_pages >= 1`, `timeout_ms >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphClientConfig {
    /// Version stamped on requests built by [`GraphClient::read`].
    pub api_version: ApiVersion,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Backoff policy for transient failures.
    pub retry: RetryPolicy,
    /// Maximum pages followed for one collection.
    pub max_pages: u32,
    /// Maximum body size accepted per response.
    pub max_response_bytes: usize,
    /// Allow a cleartext `http` API origin (local test doubles only).
    pub allow_http: bool,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::V1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
            max_pages: DEFAULT_MAX_PAGES,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            allow_http: false,
        }
    }
}

/// Client construction errors.
#[derive(Debug, Error)]
pub enum GraphClientError {
    /// The API origin is unusable.
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(String),
    /// The configuration is unusable.
    #[error("invalid graph client config: {0}")]
    InvalidConfig(String),
    /// The HTTP client could not be built.
    #[error("http client build failed: {0}")]
    HttpClient(String),
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// API client bound to one session.
pub struct GraphClient {
    /// Connection context.
    session: Session,
    /// Client configuration.
    config: GraphClientConfig,
    /// Shared HTTP client.
    http: Client,
    /// Response cache for cacheable reads.
    cache: Arc<dyn CacheStore>,
}

impl GraphClient {
    /// Builds a client with a fresh in-memory cache.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError`] when the configuration is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(session: Session, config: GraphClientConfig) -> Result<Self, GraphClientError> {
        if config.timeout_ms == 0 {
            return Err(GraphClientError::InvalidConfig("timeout_ms must be positive".to_string()));
        }
        if config.max_pages == 0 {
            return Err(GraphClientError::InvalidConfig("max_pages must be positive".to_string()));
        }
        if config.retry.max_attempts == 0 {
            return Err(GraphClientError::InvalidConfig(
                "retry.max_attempts must be positive".to_string(),
            ));
        }
        match session.base_url().scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            other => {
                return Err(GraphClientError::InvalidBaseUrl(format!(
                    "unsupported scheme {other}"
                )));
            }
        }
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| GraphClientError::HttpClient(err.to_string()))?;
        Ok(Self {
            session,
            config,
            http,
            cache: Arc::new(MemoryCacheStore::new()),
        })
    }

    /// Replaces the cache store, for sharing one cache across clients.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the session this client is bound to.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Builds a cacheable read targeting the configured API version.
    #[must_use]
    pub fn read(&self, path: impl Into<String>) -> ApiRequest {
        ApiRequest {
            version: self.config.api_version,
            ..ApiRequest::get(path)
        }
    }

    /// Returns the cache store.
    #[must_use]
    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// Returns cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Invalidates cached responses and returns how many were removed.
    pub fn clear_cache(&self, scope: &ClearScope) -> usize {
        let removed = self.cache.clear(scope);
        debug!(removed, "api cache cleared");
        removed
    }

    /// Verifies the credential and API reachability with an uncached read.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the tenant object cannot be read.
    pub async fn check_connection(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        let request = ApiRequest::get("organization").with_select(["id"]).bypass_cache();
        self.fetch(&request, cancel).await.map(|_| ())
    }

    /// Resolves the absolute URL for a request.
    fn request_url(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let path = request.normalized_path();
        if path.is_empty() {
            return Err(ApiError::InvalidRequest("resource path is empty".to_string()));
        }
        if path.contains("://") || path.contains('?') || path.contains('#') {
            return Err(ApiError::InvalidRequest(format!(
                "resource path must be relative without query: {path}"
            )));
        }
        if path.split('/').any(|segment| segment == ".." || segment == "." || segment.is_empty()) {
            return Err(ApiError::InvalidRequest(format!("resource path is not canonical: {path}")));
        }
        let mut url = self
            .session
            .base_url()
            .join(&format!("{}/{path}", request.version.as_str()))
            .map_err(|err| ApiError::InvalidRequest(err.to_string()))?;
        let pairs = request.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(name, value)| (name.as_str(), value.as_str())));
        }
        Ok(url)
    }

    /// Validates a continuation link against the session origin.
    fn next_link_url(&self, link: &str) -> Result<Url, String> {
        let url = Url::parse(link).map_err(|err| format!("invalid next link: {err}"))?;
        let base = self.session.base_url();
        let same_origin = url.scheme() == base.scheme()
            && url.host_str() == base.host_str()
            && url.port_or_known_default() == base.port_or_known_default();
        if !same_origin {
            return Err("next link origin does not match the api origin".to_string());
        }
        Ok(url)
    }

    /// Executes a request, following pages for collection reads.
    async fn execute(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.request_url(request)?;
        let first = self.send_with_retry(request.method, url, request.body.as_ref(), cancel).await?;
        if !request.method.is_read() {
            return Ok(ApiResponse {
                value: first,
                pages: 1,
                from_cache: false,
            });
        }
        match split_page(first) {
            PageBody::Single(value) => Ok(ApiResponse {
                value,
                pages: 1,
                from_cache: false,
            }),
            PageBody::Collection {
                items,
                next,
            } => self.collect_pages(items, next, cancel).await,
        }
    }

    /// Follows continuation links after the first collection page.
    async fn collect_pages(
        &self,
        mut items: Vec<Value>,
        mut next: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        let mut pages: u32 = 1;
        while let Some(link) = next.take() {
            if pages >= self.config.max_pages {
                return Err(ApiError::PartialFetch {
                    pages,
                    items,
                    reason: format!("page limit of {} reached", self.config.max_pages),
                });
            }
            let url = match self.next_link_url(&link) {
                Ok(url) => url,
                Err(reason) => {
                    return Err(ApiError::PartialFetch {
                        pages,
                        items,
                        reason,
                    });
                }
            };
            match self.send_with_retry(HttpMethod::Get, url, None, cancel).await {
                Ok(body) => match split_page(body) {
                    PageBody::Collection {
                        items: page_items,
                        next: page_next,
                    } => {
                        items.extend(page_items);
                        pages = pages.saturating_add(1);
                        next = page_next;
                        debug!(pages, items = items.len(), "collection page fetched");
                    }
                    PageBody::Single(_) => {
                        return Err(ApiError::PartialFetch {
                            pages,
                            items,
                            reason: "continuation page is not a collection".to_string(),
                        });
                    }
                },
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(err) => {
                    warn!(pages, error = %err, "pagination interrupted");
                    return Err(ApiError::PartialFetch {
                        pages,
                        items,
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(ApiResponse {
            value: Value::Array(items),
            pages,
            from_cache: false,
        })
    }

    /// Sends one logical request, retrying transient failures.
    async fn send_with_retry(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Value, ApiError> {
        let policy = self.config.retry;
        let mut attempts: u32 = 0;
        let mut refreshed = false;
        loop {
            if cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            match self.attempt(method, &url, body, cancel).await {
                Ok(value) => return Ok(value),
                Err(AttemptFailure::Fatal(err)) => return Err(err),
                Err(AttemptFailure::Unauthorized(message)) => {
                    if refreshed {
                        return Err(ApiError::Status {
                            status: 401,
                            message,
                        });
                    }
                    refreshed = true;
                    debug!("credential rejected; refreshing once");
                    self.session
                        .credential()
                        .refresh()
                        .await
                        .map_err(|err| ApiError::Credential(err.to_string()))?;
                }
                Err(AttemptFailure::Transient {
                    reason,
                    retry_after,
                }) => {
                    attempts = attempts.saturating_add(1);
                    if !policy.allows_retry(attempts) {
                        warn!(attempts, reason = %reason, "api retries exhausted");
                        return Err(ApiError::Unavailable {
                            attempts,
                            reason,
                        });
                    }
                    let delay = policy.delay_for(attempts, retry_after);
                    warn!(
                        attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        reason = %reason,
                        "transient api failure; backing off"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(ApiError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Performs a single HTTP exchange and classifies the outcome.
    async fn attempt(
        &self,
        method: HttpMethod,
        url: &Url,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Value, AttemptFailure> {
        let headers = self.headers(body.is_some()).await.map_err(AttemptFailure::Fatal)?;
        let mut builder = self.http.request(reqwest_method(method), url.clone()).headers(headers);
        if let Some(body) = body {
            let payload = serde_json::to_vec(body).map_err(|err| {
                AttemptFailure::Fatal(ApiError::InvalidRequest(format!(
                    "request body serialization failed: {err}"
                )))
            })?;
            builder = builder.body(payload);
        }
        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AttemptFailure::Fatal(ApiError::Cancelled)),
            sent = builder.send() => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(err) if err.is_builder() => {
                return Err(AttemptFailure::Fatal(ApiError::Transport(err.to_string())));
            }
            Err(err) if method.is_read() || err.is_connect() => {
                return Err(AttemptFailure::Transient {
                    reason: format!("transport error: {err}"),
                    retry_after: None,
                });
            }
            Err(err) => {
                return Err(AttemptFailure::Fatal(ApiError::Transport(err.to_string())));
            }
        };
        let status = response.status().as_u16();
        let retry_after = retry_after_header(response.headers());
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AttemptFailure::Fatal(ApiError::Cancelled)),
            read = read_body_with_limit(response, self.config.max_response_bytes) => read,
        };
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(ApiError::Transport(reason)) if method.is_read() => {
                return Err(AttemptFailure::Transient {
                    reason,
                    retry_after: None,
                });
            }
            Err(err) => return Err(AttemptFailure::Fatal(err)),
        };
        if (200 .. 300).contains(&status) {
            return decode_body(&bytes).map_err(AttemptFailure::Fatal);
        }
        let message = error_message(&bytes);
        if status == 401 {
            return Err(AttemptFailure::Unauthorized(message));
        }
        if is_retryable_status(method, status) {
            return Err(AttemptFailure::Transient {
                reason: format!("status {status}: {message}"),
                retry_after,
            });
        }
        Err(AttemptFailure::Fatal(ApiError::Status {
            status,
            message,
        }))
    }

    /// Builds request headers including the bearer credential.
    async fn headers(&self, has_body: bool) -> Result<HeaderMap, ApiError> {
        let token = self
            .session
            .credential()
            .token()
            .await
            .map_err(|err| ApiError::Credential(err.to_string()))?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.secret()))
            .map_err(|_| ApiError::Credential("invalid bearer token header".to_string()))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(headers)
    }
}

#[async_trait]
impl ObjectSource for GraphClient {
    async fn fetch(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let cacheable = request.is_cacheable();
        let key = request.cache_key();
        if cacheable && let Some(value) = self.cache.get(&key) {
            debug!(cache_key = %key, "api cache hit");
            return Ok(ApiResponse {
                value,
                pages: 0,
                from_cache: true,
            });
        }
        let response = self.execute(request, cancel).await?;
        if cacheable {
            self.cache.set(&key, response.value.clone());
        }
        Ok(response)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Outcome of a failed single exchange.
enum AttemptFailure {
    /// Retryable condition.
    Transient {
        /// Description of the condition.
        reason: String,
        /// Server-requested delay, when supplied.
        retry_after: Option<Duration>,
    },
    /// The credential was rejected.
    Unauthorized(String),
    /// Terminal failure.
    Fatal(ApiError),
}

/// Shape of a decoded response body.
enum PageBody {
    /// Collection page with its continuation link.
    Collection {
        /// Items on this page.
        items: Vec<Value>,
        /// Link to the next page, when present.
        next: Option<String>,
    },
    /// Non-collection payload.
    Single(Value),
}

/// Splits a body into collection items and continuation, when it is a collection.
fn split_page(body: Value) -> PageBody {
    match body {
        Value::Object(mut object)
            if object.get(COLLECTION_FIELD).is_some_and(Value::is_array) =>
        {
            let next = object.remove(NEXT_LINK_FIELD).and_then(|link| match link {
                Value::String(link) => Some(link),
                _ => None,
            });
            let items = match object.remove(COLLECTION_FIELD) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            PageBody::Collection {
                items,
                next,
            }
        }
        other => PageBody::Single(other),
    }
}

/// Maps the request method onto the HTTP client method.
fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Parses a delta-seconds `Retry-After` header.
fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Decodes a success body; an empty body decodes to `null`.
fn decode_body(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Extracts `error.message` from an error body, falling back to the raw text.
fn error_message(bytes: &[u8]) -> String {
    let structured = serde_json::from_slice::<Value>(bytes).ok().and_then(|body| {
        body.pointer("/error/message").and_then(Value::as_str).map(str::to_string)
    });
    let message = structured.unwrap_or_else(|| String::from_utf8_lossy(bytes).trim().to_string());
    if message.is_empty() {
        return "no error message".to_string();
    }
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut body = Vec::new();
    while let Some(chunk) =
        response.chunk().await.map_err(|err| ApiError::Transport(err.to_string()))?
    {
        let next_total = body.len().saturating_add(chunk.len());
        if next_total > limit {
            return Err(ApiError::Decode(format!(
                "response exceeds size limit ({next_total} > {limit})"
            )));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
