// crates/posture-graph/src/credential.rs
// ============================================================================
// Module: Credential Providers
// Description: Opaque bearer credential supply for the API client.
// Purpose: Decouple token acquisition from request execution.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! The client treats credentials as a black box that produces a bearer token
//! and can be asked to refresh it once the API rejects it as expired. Token
//! acquisition itself (device code, client secret, managed identity) lives
//! outside this crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bearer token value. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw bearer token.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw token for the `Authorization` header.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Credential provider errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The provider could not produce a token.
    #[error("credential unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Provider Trait
// ============================================================================

/// Source of bearer credentials, refreshable on expiry.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a currently valid bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no token can be produced.
    async fn token(&self) -> Result<AccessToken, CredentialError>;

    /// Invalidates the current token so the next [`Self::token`] call acquires a new one.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when the refresh cannot be performed.
    async fn refresh(&self) -> Result<(), CredentialError>;
}

/// Provider returning a fixed token; refresh is a no-op.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    /// Fixed token.
    token: AccessToken,
}

impl StaticCredential {
    /// Creates a provider for a fixed token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn token(&self) -> Result<AccessToken, CredentialError> {
        if self.token.secret().is_empty() {
            return Err(CredentialError::Unavailable("static token is empty".to_string()));
        }
        Ok(self.token.clone())
    }

    async fn refresh(&self) -> Result<(), CredentialError> {
        Ok(())
    }
}
