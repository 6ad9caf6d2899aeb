// crates/posture-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Loading guards, section validation, and runtime conversions.
// Purpose: Ensure config input handling is strict and fail-closed.
// Dependencies: posture-config, posture-core, posture-graph, posture-runner, tempfile
// ============================================================================

//! ## Overview
//! Writes `posture.toml` fixtures to temporary files and checks that loading
//! either yields the expected runtime settings or fails with a named field.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use posture_config::ConfigError;
use posture_config::DEFAULT_BASE_URL;
use posture_config::EventSinkKind;
use posture_config::PostureConfig;
use posture_core::ApiVersion;
use posture_core::CategoryTag;
use posture_core::CheckId;
use posture_core::ComparisonPolicy;
use posture_core::RunId;
use posture_core::TenantId;
use posture_graph::GraphClientConfig;
use posture_graph::StaticCredential;
use posture_runner::OrchestratorConfig;
use posture_runner::RunEvent;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a config fixture to a temporary file.
fn fixture(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Loads a fixture and returns the invalid-config message.
fn invalid(contents: &str) -> String {
    let file = fixture(contents);
    match PostureConfig::load(Some(file.path())) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

// ============================================================================
// SECTION: Load Guards
// ============================================================================

/// Verifies overlong paths and components are rejected before any read.
#[test]
fn load_rejects_oversized_paths() {
    let long_path = "a/".repeat(2_100);
    let err = PostureConfig::load(Some(Path::new(&long_path))).unwrap_err();
    assert!(err.to_string().contains("config path exceeds max length"));

    let long_component = "a".repeat(300);
    let err = PostureConfig::load(Some(Path::new(&long_component))).unwrap_err();
    assert!(err.to_string().contains("config path component too long"));
}

/// Verifies a missing file is an I/O error.
#[test]
fn load_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = PostureConfig::load(Some(&dir.path().join("posture.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

/// Verifies size and encoding limits.
#[test]
fn load_rejects_oversized_and_non_utf8_files() {
    let mut big = NamedTempFile::new().unwrap();
    big.write_all(&vec![b'#'; 1_048_577]).unwrap();
    let err = PostureConfig::load(Some(big.path())).unwrap_err();
    assert!(err.to_string().contains("config file exceeds size limit"));

    let mut binary = NamedTempFile::new().unwrap();
    binary.write_all(&[0xFF, 0xFE, 0xFF]).unwrap();
    let err = PostureConfig::load(Some(binary.path())).unwrap_err();
    assert!(err.to_string().contains("config file must be utf-8"));
}

/// Verifies malformed TOML and unknown enum values are parse errors.
#[test]
fn load_reports_parse_errors() {
    for contents in ["[runner\nconcurrency = 2", "[events]\nsink = \"syslog\"\n"] {
        let file = fixture(contents);
        let err = PostureConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{contents}: {err}");
    }
}

// ============================================================================
// SECTION: Defaults And Conversions
// ============================================================================

/// Verifies an empty file yields the runtime defaults of every crate.
#[test]
fn empty_file_uses_runtime_defaults() {
    let file = fixture("");
    let config = PostureConfig::load(Some(file.path())).unwrap();

    assert_eq!(config, PostureConfig::default());
    assert_eq!(config.graph.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.graph_client_config(), GraphClientConfig::default());
    assert_eq!(config.orchestrator_config(), OrchestratorConfig::default());
    assert_eq!(config.comparison_policy(), ComparisonPolicy::default());
    assert!(config.check_selection().ids.is_empty());
    assert_eq!(config.events.sink, EventSinkKind::Stderr);
}

/// Verifies every section converts into the owning crate's settings.
#[test]
fn full_file_converts_into_runtime_settings() {
    let file = fixture(
        r#"
[graph]
base_url = "https://graph.example.test/root"
tenant_id = "contoso"
api_version = "beta"
timeout_ms = 10000
max_pages = 25
user_agent = "posture-audit/1"

[graph.retry]
max_attempts = 3
base_delay_ms = 100
max_delay_ms = 2000

[runner]
concurrency = 4
check_timeout_ms = 30000
run_timeout_ms = 600000

[selection]
categories = ["entra"]
include_tags = ["baseline"]
exclude_ids = ["MT.1002"]

[comparison]
skipped_is_failure = true
error_is_failure = false

[events]
sink = "none"
"#,
    );
    let config = PostureConfig::load(Some(file.path())).unwrap();

    let client = config.graph_client_config();
    assert_eq!(client.api_version, ApiVersion::Beta);
    assert_eq!(client.timeout_ms, 10_000);
    assert_eq!(client.max_pages, 25);
    assert_eq!(client.user_agent, "posture-audit/1");
    assert_eq!(client.retry.max_attempts, 3);
    assert_eq!(client.retry.base_delay_ms, 100);
    assert_eq!(client.retry.max_delay_ms, 2_000);
    assert!(!client.allow_http);

    let session = config.session(Arc::new(StaticCredential::new("token"))).unwrap();
    assert_eq!(session.base_url().as_str(), "https://graph.example.test/root/");
    assert_eq!(session.tenant_id(), Some(&TenantId::new("contoso")));

    assert_eq!(
        config.orchestrator_config(),
        OrchestratorConfig {
            concurrency: 4,
            check_timeout: Duration::from_secs(30),
            run_timeout: Some(Duration::from_secs(600)),
        }
    );

    let selection = config.check_selection();
    assert!(selection.categories.contains(&CategoryTag::new("entra")));
    assert!(selection.include_tags.contains("baseline"));
    assert!(selection.exclude_ids.contains(&CheckId::new("MT.1002")));

    assert_eq!(
        config.comparison_policy(),
        ComparisonPolicy {
            skipped_is_failure: true,
            error_is_failure: false,
        }
    );
    assert_eq!(config.events.sink, EventSinkKind::Disabled);
    config.event_sink().unwrap().record(&RunEvent::run_started(&RunId::new("r"), 0, 4));
}

/// Verifies a partial retry table keeps the remaining defaults.
#[test]
fn partial_retry_section_keeps_defaults() {
    let file = fixture("[graph.retry]\nmax_attempts = 2\n");
    let config = PostureConfig::load(Some(file.path())).unwrap();
    let defaults = GraphClientConfig::default().retry;
    assert_eq!(config.graph.retry.max_attempts, 2);
    assert_eq!(config.graph.retry.base_delay_ms, defaults.base_delay_ms);
    assert_eq!(config.graph.retry.max_delay_ms, defaults.max_delay_ms);
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

/// Verifies the API origin must be https unless cleartext is opted into.
#[test]
fn graph_origin_requires_https() {
    let message = invalid("[graph]\nbase_url = \"http://127.0.0.1:8080\"\n");
    assert!(message.contains("graph.base_url must use https"), "{message}");

    let file = fixture("[graph]\nbase_url = \"http://127.0.0.1:8080\"\nallow_http = true\n");
    let config = PostureConfig::load(Some(file.path())).unwrap();
    assert!(config.graph_client_config().allow_http);

    let message = invalid("[graph]\nbase_url = \"\"\n");
    assert!(message.contains("graph.base_url must be non-empty"), "{message}");
}

/// Verifies an origin that passes the scheme check but cannot form a session.
#[test]
fn unusable_origin_fails_at_session_build() {
    let file = fixture("[graph]\nbase_url = \"https://graph.example.test/?x=1\"\n");
    let config = PostureConfig::load(Some(file.path())).unwrap();
    let err = config.session(Arc::new(StaticCredential::new("token"))).unwrap_err();
    assert!(err.to_string().contains("graph.base_url"));
}

/// Verifies client limits are bounded.
#[test]
fn graph_limits_are_bounded() {
    assert!(invalid("[graph]\ntimeout_ms = 0\n").contains("graph.timeout_ms"));
    assert!(invalid("[graph]\nmax_pages = 0\n").contains("graph.max_pages"));
    assert!(invalid("[graph]\nuser_agent = \" \"\n").contains("graph.user_agent"));
    assert!(invalid("[graph]\ntenant_id = \"\"\n").contains("graph.tenant_id"));
}

/// Verifies retry attempts and delay ordering.
#[test]
fn retry_policy_is_bounded() {
    assert!(invalid("[graph.retry]\nmax_attempts = 0\n").contains("graph.retry.max_attempts"));
    assert!(invalid("[graph.retry]\nmax_attempts = 11\n").contains("graph.retry.max_attempts"));
    let message = invalid("[graph.retry]\nbase_delay_ms = 5000\nmax_delay_ms = 1000\n");
    assert!(message.contains("must be at least base_delay_ms"), "{message}");
}

/// Verifies runner limits are bounded.
#[test]
fn runner_limits_are_bounded() {
    assert!(invalid("[runner]\nconcurrency = 0\n").contains("runner.concurrency"));
    assert!(invalid("[runner]\nconcurrency = 65\n").contains("runner.concurrency"));
    assert!(invalid("[runner]\ncheck_timeout_ms = 0\n").contains("runner.check_timeout_ms"));
    assert!(invalid("[runner]\nrun_timeout_ms = 0\n").contains("runner.run_timeout_ms"));

    let file = fixture("[runner]\nconcurrency = 64\n");
    assert_eq!(PostureConfig::load(Some(file.path())).unwrap().runner.concurrency, 64);
}

/// Verifies contradictory or blank selection entries are rejected.
#[test]
fn selection_entries_are_validated() {
    let message = invalid("[selection]\nids = [\"MT.1\", \"MT.2\"]\nexclude_ids = [\"MT.2\"]\n");
    assert!(message.contains("overlap: MT.2"), "{message}");
    assert!(invalid("[selection]\ninclude_tags = [\"\"]\n").contains("selection.include_tags"));
}

// ============================================================================
// SECTION: Event Sinks
// ============================================================================

/// Verifies the file sink needs a path and a path needs the file sink.
#[test]
fn event_path_matches_sink_kind() {
    assert!(invalid("[events]\nsink = \"file\"\n").contains("events.path is required"));
    let message = invalid("[events]\nsink = \"stderr\"\npath = \"events.jsonl\"\n");
    assert!(message.contains("events.path requires"), "{message}");
}

/// Verifies the configured file sink appends run events.
#[test]
fn file_event_sink_writes_to_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("events.jsonl");
    let file = fixture(&format!("[events]\nsink = \"file\"\npath = {:?}\n", log.to_string_lossy()));
    let config = PostureConfig::load(Some(file.path())).unwrap();

    let sink = config.event_sink().unwrap();
    sink.record(&RunEvent::run_started(&RunId::new("run-7"), 3, 2));

    let contents = std::fs::read_to_string(&log).unwrap();
    assert!(contents.contains("\"event\":\"run_started\""));
    assert!(contents.contains("\"run_id\":\"run-7\""));
}

/// Verifies an unopenable event path surfaces as an I/O error.
#[test]
fn unopenable_event_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("missing").join("events.jsonl");
    let file = fixture(&format!("[events]\nsink = \"file\"\npath = {:?}\n", log.to_string_lossy()));
    let config = PostureConfig::load(Some(file.path())).unwrap();
    assert!(matches!(config.event_sink().err().unwrap(), ConfigError::Io(_)));
}
