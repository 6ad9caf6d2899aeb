// crates/posture-core/src/model/request.rs
// ============================================================================
// Module: Posture API Requests
// Description: Logical resource requests and responses for the object-graph API.
// Purpose: Describe reads and mutations independent of the transport.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`ApiRequest`] names a resource path plus query options. Reads are
//! cacheable unless they opt out; mutations never are. The cache key is
//! derived from the API version, the normalized path, and the sorted query
//! parameters, so two requests that would hit the same URL share one entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Request Options
// ============================================================================

/// Object-graph API version segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Stable API surface (`v1.0`).
    #[default]
    #[serde(rename = "v1.0")]
    V1,
    /// Preview API surface (`beta`).
    #[serde(rename = "beta")]
    Beta,
}

impl ApiVersion {
    /// Returns the URL path segment for the version.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1.0",
            Self::Beta => "beta",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Idempotent read.
    #[default]
    Get,
    /// Create or invoke.
    Post,
    /// Partial update.
    Patch,
    /// Removal.
    Delete,
}

impl HttpMethod {
    /// Returns true for methods that do not mutate remote state.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::Get)
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Logical request against the object-graph API.
///
/// # Invariants
/// - `path` is relative to the versioned base URL; leading slashes are ignored.
/// - Mutating requests are never cached regardless of `bypass_cache`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Resource path relative to the versioned base (for example `identity/conditionalAccess/policies`).
    pub path: String,
    /// API version segment.
    pub version: ApiVersion,
    /// HTTP method.
    pub method: HttpMethod,
    /// Optional `$filter` expression.
    pub filter: Option<String>,
    /// Optional `$select` projection.
    pub select: Vec<String>,
    /// Additional query parameters.
    pub params: BTreeMap<String, String>,
    /// Optional JSON body for mutating requests.
    pub body: Option<Value>,
    /// Skip the cache for this read.
    pub bypass_cache: bool,
}

impl ApiRequest {
    /// Creates a cacheable read request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: ApiVersion::V1,
            method: HttpMethod::Get,
            filter: None,
            select: Vec::new(),
            params: BTreeMap::new(),
            body: None,
            bypass_cache: false,
        }
    }

    /// Creates a mutating request with an optional body.
    #[must_use]
    pub fn mutate(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            body,
            ..Self::get(path)
        }
    }

    /// Targets the preview API surface.
    #[must_use]
    pub const fn beta(mut self) -> Self {
        self.version = ApiVersion::Beta;
        self
    }

    /// Sets the `$filter` expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the `$select` projection.
    #[must_use]
    pub fn with_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a query parameter, replacing any previous value for the name.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Forces a network call even when a cached value exists.
    #[must_use]
    pub const fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    /// Returns true when the response may be served from or stored in the cache.
    #[must_use]
    pub const fn is_cacheable(&self) -> bool {
        self.method.is_read() && !self.bypass_cache
    }

    /// Returns the path without leading or trailing slashes.
    #[must_use]
    pub fn normalized_path(&self) -> &str {
        self.path.trim_matches('/')
    }

    /// Returns every query parameter sorted by name, including `$filter` and `$select`.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.params.clone();
        if let Some(filter) = &self.filter {
            pairs.insert("$filter".to_string(), filter.clone());
        }
        if !self.select.is_empty() {
            pairs.insert("$select".to_string(), self.select.join(","));
        }
        pairs.into_iter().collect()
    }

    /// Returns the cache key composed of version, path, and sorted query parameters.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let query = self
            .query_pairs()
            .into_iter()
            .map(|(name, value)| {
                format!("{}={}", escape_key_part(&name), escape_key_part(&value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/{}?{query}", self.version.as_str(), self.normalized_path())
    }
}

/// Escapes the key delimiters so distinct parameter sets never share a key.
fn escape_key_part(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '&' => escaped.push_str("%26"),
            '=' => escaped.push_str("%3D"),
            other => escaped.push(other),
        }
    }
    escaped
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Response returned by an object source.
///
/// # Invariants
/// - Collection responses hold every page concatenated in server order as an array.
/// - `pages` is zero when the value was served from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Response payload (an array for collections, an object otherwise).
    pub value: Value,
    /// Number of network pages fetched to build the payload.
    pub pages: u32,
    /// True when the payload came from the cache.
    pub from_cache: bool,
}

impl ApiResponse {
    /// Returns collection items, or the single object as a one-element slice.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        match &self.value {
            Value::Array(items) => items,
            Value::Null => &[],
            other => std::slice::from_ref(other),
        }
    }
}
