// crates/posture-config/src/lib.rs
// ============================================================================
// Module: Posture Config Library
// Description: Canonical config model and validation for posture runs.
// Purpose: Single source of truth for posture.toml semantics.
// Dependencies: posture-core, posture-graph, posture-runner, serde, toml
// ============================================================================

//! ## Overview
//! `posture-config` loads `posture.toml`, validates it fail-closed, and
//! converts each section into the runtime configuration of the crate that
//! owns it.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
