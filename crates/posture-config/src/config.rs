// crates/posture-config/src/config.rs
// ============================================================================
// Module: Posture Configuration
// Description: Configuration loading and validation for posture runs.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: posture-core, posture-graph, posture-runner, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to the runtime defaults of the crate
//! it configures; any value present must validate or the load fails.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use posture_core::ApiVersion;
use posture_core::CategoryTag;
use posture_core::CheckId;
use posture_core::ComparisonPolicy;
use posture_core::TenantId;
use posture_graph::CredentialProvider;
use posture_graph::GraphClientConfig;
use posture_graph::RetryPolicy;
use posture_graph::Session;
use posture_runner::CheckSelection;
use posture_runner::FileRunEventSink;
use posture_runner::NoopRunEventSink;
use posture_runner::OrchestratorConfig;
use posture_runner::RunEventSink;
use posture_runner::StderrRunEventSink;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default config file name.
pub const DEFAULT_CONFIG_NAME: &str = "posture.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "POSTURE_CONFIG";
/// Default API origin.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com";
/// Maximum size of the config file in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a full path.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the API origin.
const MAX_BASE_URL_LENGTH: usize = 2048;
/// Maximum per-request timeout in milliseconds.
const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;
/// Maximum pages followed for one collection.
const MAX_PAGES_LIMIT: u32 = 100_000;
/// Maximum length of the `User-Agent` value.
const MAX_USER_AGENT_LENGTH: usize = 256;
/// Maximum attempts per request including the first.
const MAX_RETRY_ATTEMPTS: u32 = 10;
/// Maximum single backoff delay in milliseconds.
const MAX_RETRY_DELAY_MS: u64 = 300_000;
/// Maximum concurrently executing checks.
const MAX_CONCURRENCY: usize = 64;
/// Maximum per-check timeout in milliseconds.
const MAX_CHECK_TIMEOUT_MS: u64 = 3_600_000;
/// Maximum whole-run budget in milliseconds.
const MAX_RUN_TIMEOUT_MS: u64 = 86_400_000;
/// Maximum entries in one selection list.
const MAX_SELECTION_ENTRIES: usize = 1024;
/// Maximum length of one selection entry.
const MAX_SELECTOR_LENGTH: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Parsed and validated `posture.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostureConfig {
    /// API client settings.
    #[serde(default)]
    pub graph: GraphConfig,
    /// Orchestrator limits.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Check selection filters.
    #[serde(default)]
    pub selection: CheckSelection,
    /// Run comparison policy.
    #[serde(default)]
    pub comparison: ComparisonPolicy,
    /// Run event sink.
    #[serde(default)]
    pub events: EventsConfig,
}

impl PostureConfig {
    /// Loads and validates configuration.
    ///
    /// The path argument wins, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        self.runner.validate()?;
        validate_selection(&self.selection)?;
        self.events.validate()
    }

    /// Returns the API client configuration.
    #[must_use]
    pub fn graph_client_config(&self) -> GraphClientConfig {
        self.graph.client_config()
    }

    /// Builds the session for the configured origin and tenant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the origin is rejected.
    pub fn session(&self, credential: Arc<dyn CredentialProvider>) -> Result<Session, ConfigError> {
        self.graph.session(credential)
    }

    /// Returns the orchestrator limits.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        self.runner.orchestrator_config()
    }

    /// Returns the check selection.
    #[must_use]
    pub const fn check_selection(&self) -> &CheckSelection {
        &self.selection
    }

    /// Returns the comparison policy.
    #[must_use]
    pub const fn comparison_policy(&self) -> ComparisonPolicy {
        self.comparison
    }

    /// Opens the configured run event sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the event file cannot be opened.
    pub fn event_sink(&self) -> Result<Arc<dyn RunEventSink>, ConfigError> {
        self.events.build_sink()
    }
}

// ============================================================================
// SECTION: Graph
// ============================================================================

/// `[graph]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// API origin, without the version segment.
    pub base_url: String,
    /// Tenant attached to the session.
    pub tenant_id: Option<TenantId>,
    /// Version stamped on client-built reads.
    pub api_version: ApiVersion,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum pages followed for one collection.
    pub max_pages: u32,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Allow a cleartext `http` origin.
    pub allow_http: bool,
    /// `[graph.retry]` backoff policy.
    pub retry: RetryPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let client = GraphClientConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tenant_id: None,
            api_version: client.api_version,
            timeout_ms: client.timeout_ms,
            max_pages: client.max_pages,
            user_agent: client.user_agent,
            allow_http: client.allow_http,
            retry: client.retry,
        }
    }
}

impl GraphConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("graph.base_url must be non-empty".to_string()));
        }
        if base_url.len() > MAX_BASE_URL_LENGTH {
            return Err(ConfigError::Invalid("graph.base_url exceeds max length".to_string()));
        }
        let secure = base_url.starts_with("https://");
        let cleartext = base_url.starts_with("http://");
        if !secure && !(cleartext && self.allow_http) {
            return Err(ConfigError::Invalid("graph.base_url must use https".to_string()));
        }
        if let Some(tenant_id) = &self.tenant_id
            && tenant_id.as_str().trim().is_empty()
        {
            return Err(ConfigError::Invalid("graph.tenant_id must be non-empty".to_string()));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "graph.timeout_ms must be between 1 and {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.max_pages == 0 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "graph.max_pages must be between 1 and {MAX_PAGES_LIMIT}"
            )));
        }
        let user_agent = self.user_agent.trim();
        if user_agent.is_empty() {
            return Err(ConfigError::Invalid("graph.user_agent must be non-empty".to_string()));
        }
        if user_agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid("graph.user_agent exceeds max length".to_string()));
        }
        if user_agent.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(
                "graph.user_agent must not contain control characters".to_string(),
            ));
        }
        validate_retry(&self.retry)
    }

    /// Converts the section into client settings.
    fn client_config(&self) -> GraphClientConfig {
        GraphClientConfig {
            api_version: self.api_version,
            timeout_ms: self.timeout_ms,
            user_agent: self.user_agent.trim().to_string(),
            retry: self.retry,
            max_pages: self.max_pages,
            allow_http: self.allow_http,
            ..GraphClientConfig::default()
        }
    }

    /// Builds the session for this section.
    fn session(&self, credential: Arc<dyn CredentialProvider>) -> Result<Session, ConfigError> {
        let session = Session::new(self.base_url.trim(), credential)
            .map_err(|err| ConfigError::Invalid(format!("graph.base_url: {err}")))?;
        Ok(match &self.tenant_id {
            Some(tenant_id) => session.with_tenant(tenant_id.clone()),
            None => session,
        })
    }
}

/// Validates the `[graph.retry]` section.
fn validate_retry(retry: &RetryPolicy) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 || retry.max_attempts > MAX_RETRY_ATTEMPTS {
        return Err(ConfigError::Invalid(format!(
            "graph.retry.max_attempts must be between 1 and {MAX_RETRY_ATTEMPTS}"
        )));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        return Err(ConfigError::Invalid(
            "graph.retry.max_delay_ms must be at least base_delay_ms".to_string(),
        ));
    }
    if retry.max_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(ConfigError::Invalid(format!(
            "graph.retry.max_delay_ms must be at most {MAX_RETRY_DELAY_MS}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// `[runner]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum checks executing at once.
    pub concurrency: usize,
    /// Time limit for one check in milliseconds.
    pub check_timeout_ms: u64,
    /// Optional budget for the whole run in milliseconds.
    pub run_timeout_ms: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let defaults = OrchestratorConfig::default();
        Self {
            concurrency: defaults.concurrency,
            check_timeout_ms: duration_ms(defaults.check_timeout),
            run_timeout_ms: defaults.run_timeout.map(duration_ms),
        }
    }
}

impl RunnerConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "runner.concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if self.check_timeout_ms == 0 || self.check_timeout_ms > MAX_CHECK_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "runner.check_timeout_ms must be between 1 and {MAX_CHECK_TIMEOUT_MS}"
            )));
        }
        if let Some(run_timeout_ms) = self.run_timeout_ms
            && (run_timeout_ms == 0 || run_timeout_ms > MAX_RUN_TIMEOUT_MS)
        {
            return Err(ConfigError::Invalid(format!(
                "runner.run_timeout_ms must be between 1 and {MAX_RUN_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Converts the section into orchestrator limits.
    const fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            concurrency: self.concurrency,
            check_timeout: Duration::from_millis(self.check_timeout_ms),
            run_timeout: match self.run_timeout_ms {
                Some(run_timeout_ms) => Some(Duration::from_millis(run_timeout_ms)),
                None => None,
            },
        }
    }
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Validates the `[selection]` section.
fn validate_selection(selection: &CheckSelection) -> Result<(), ConfigError> {
    validate_selectors("selection.ids", selection.ids.iter().map(CheckId::as_str))?;
    validate_selectors(
        "selection.categories",
        selection.categories.iter().map(CategoryTag::as_str),
    )?;
    validate_selectors("selection.include_tags", selection.include_tags.iter().map(String::as_str))?;
    validate_selectors("selection.exclude_tags", selection.exclude_tags.iter().map(String::as_str))?;
    validate_selectors("selection.exclude_ids", selection.exclude_ids.iter().map(CheckId::as_str))?;
    let overlap: BTreeSet<&str> = selection
        .ids
        .intersection(&selection.exclude_ids)
        .map(CheckId::as_str)
        .collect();
    if !overlap.is_empty() {
        let names: Vec<&str> = overlap.into_iter().collect();
        return Err(ConfigError::Invalid(format!(
            "selection.ids and selection.exclude_ids overlap: {}",
            names.join(", ")
        )));
    }
    Ok(())
}

/// Validates one selection list.
fn validate_selectors<'a>(
    field: &str,
    values: impl ExactSizeIterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    if values.len() > MAX_SELECTION_ENTRIES {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds {MAX_SELECTION_ENTRIES} entries"
        )));
    }
    for value in values {
        if value.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
        }
        if value.len() > MAX_SELECTOR_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} entry exceeds max length")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Destination for run events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `events.path`.
    File,
    /// Events are discarded.
    #[serde(rename = "none")]
    Disabled,
}

/// `[events]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Sink kind.
    pub sink: EventSinkKind,
    /// Event log path, required for the file sink.
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, Some(path)) => {
                validate_path_string("events.path", &path.to_string_lossy())
            }
            (EventSinkKind::File, None) => Err(ConfigError::Invalid(
                "events.path is required when events.sink = \"file\"".to_string(),
            )),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "events.path requires events.sink = \"file\"".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }

    /// Opens the sink.
    fn build_sink(&self) -> Result<Arc<dyn RunEventSink>, ConfigError> {
        match self.sink {
            EventSinkKind::Stderr => Ok(Arc::new(StderrRunEventSink)),
            EventSinkKind::Disabled => Ok(Arc::new(NoopRunEventSink)),
            EventSinkKind::File => {
                let path = self.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("events.path is required for the file sink".to_string())
                })?;
                let sink = FileRunEventSink::new(path)
                    .map_err(|err| ConfigError::Io(format!("events.path: {err}")))?;
                Ok(Arc::new(sink))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, the environment, or the default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path value.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if Path::new(trimmed)
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid(format!("{field} path component too long")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions on known-good inputs."
    )]

    use super::*;

    /// Verifies an explicit path wins over the environment and default.
    #[test]
    fn explicit_path_is_used_verbatim() {
        let resolved = resolve_path(Some(Path::new("conf/custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("conf/custom.toml"));
    }

    /// Verifies configured path values are length checked.
    #[test]
    fn path_strings_are_bounded() {
        assert!(validate_path_string("events.path", "logs/events.jsonl").is_ok());
        assert!(validate_path_string("events.path", "   ").is_err());
        let long_component = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = validate_path_string("events.path", &long_component).unwrap_err();
        assert!(err.to_string().contains("path component too long"));
    }

    /// Verifies default durations survive the millisecond round trip.
    #[test]
    fn runner_defaults_match_orchestrator_defaults() {
        assert_eq!(RunnerConfig::default().orchestrator_config(), OrchestratorConfig::default());
    }
}
