// crates/posture-graph/src/session.rs
// ============================================================================
// Module: API Session
// Description: Explicit connection context handed to the API client.
// Purpose: Bundle API origin, tenant, and credential without global state.
// Dependencies: crate::credential, posture-core, reqwest
// ============================================================================

//! ## Overview
//! A [`Session`] is constructed by the host after authentication and passed to
//! [`crate::GraphClient::new`]. Nothing in this crate keeps a "current
//! connection"; two sessions can coexist in one process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use posture_core::TenantId;
use reqwest::Url;

use crate::client::GraphClientError;
use crate::credential::CredentialProvider;

// ============================================================================
// SECTION: Session
// ============================================================================

/// Connection context for one tenant.
///
/// # Invariants
/// - `base_url` ends with `/` so versioned paths join beneath it.
#[derive(Clone)]
pub struct Session {
    /// API origin (for example `https://graph.microsoft.com/`).
    base_url: Url,
    /// Tenant under assessment, when known.
    tenant_id: Option<TenantId>,
    /// Bearer credential provider.
    credential: Arc<dyn CredentialProvider>,
}

impl Session {
    /// Creates a session for the given API origin.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError::InvalidBaseUrl`] when the URL cannot be parsed
    /// or carries a query, fragment, or embedded credentials.
    pub fn new(
        base_url: &str,
        credential: Arc<dyn CredentialProvider>,
    ) -> Result<Self, GraphClientError> {
        let mut url =
            Url::parse(base_url).map_err(|err| GraphClientError::InvalidBaseUrl(err.to_string()))?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(GraphClientError::InvalidBaseUrl("base url must have a host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(GraphClientError::InvalidBaseUrl(
                "base url must not carry a query or fragment".to_string(),
            ));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(GraphClientError::InvalidBaseUrl(
                "base url credentials are not allowed".to_string(),
            ));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            tenant_id: None,
            credential,
        })
    }

    /// Attaches the tenant identifier.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Returns the API origin.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the tenant identifier, when known.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// Returns the credential provider.
    #[must_use]
    pub fn credential(&self) -> &dyn CredentialProvider {
        self.credential.as_ref()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}
