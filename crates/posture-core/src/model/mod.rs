// crates/posture-core/src/model/mod.rs
// ============================================================================
// Module: Posture Model Types
// Description: Canonical identifiers, timestamps, results, and API requests.
// Purpose: Provide stable, serializable types shared by every Posture crate.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types are the plain-data contract between the orchestrator, the API
//! client, and external report renderers. They carry no behavior beyond
//! construction helpers and derived keys.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod request;
pub mod result;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::CategoryTag;
pub use identifiers::CheckId;
pub use identifiers::RunId;
pub use identifiers::TenantId;
pub use request::ApiRequest;
pub use request::ApiResponse;
pub use request::ApiVersion;
pub use request::HttpMethod;
pub use result::CheckResult;
pub use result::CheckStatus;
pub use result::EvidenceRecord;
pub use result::Severity;
pub use result::SkipReason;
pub use time::Timestamp;
