// crates/posture-runner/src/registry.rs
// ============================================================================
// Module: Check Registry
// Description: Explicit registration and selection of check definitions.
// Purpose: Replace name-based discovery with a typed, duplicate-free catalog.
// Dependencies: posture-core, serde, thiserror
// ============================================================================

//! ## Overview
//! Hosts register every check up front. [`CheckRegistry::select`] returns the
//! subset chosen by a [`CheckSelection`] in registration order, ready to hand
//! to the orchestrator.
//! Invariants:
//! - Identifiers are unique within a registry.
//! - Definitions are immutable once registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use posture_core::CategoryTag;
use posture_core::CheckId;
use posture_core::Severity;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::probe::CheckContext;
use crate::probe::CheckProbe;
use crate::probe::CheckVerdict;
use crate::probe::FnProbe;
use crate::probe::ProbeError;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Registered compliance check.
#[derive(Clone)]
pub struct CheckDefinition {
    /// Unique identifier.
    pub id: CheckId,
    /// Display name.
    pub name: String,
    /// Category tag.
    pub category: CategoryTag,
    /// Severity of a failure.
    pub severity: Severity,
    /// Free-form tags used for selection.
    pub tags: BTreeSet<String>,
    /// Longer description for reports.
    pub description: String,
    /// Executable body.
    pub probe: Arc<dyn CheckProbe>,
}

impl CheckDefinition {
    /// Creates a definition without tags or description.
    #[must_use]
    pub fn new(
        id: impl Into<CheckId>,
        name: impl Into<String>,
        category: impl Into<CategoryTag>,
        severity: Severity,
        probe: Arc<dyn CheckProbe>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            severity,
            tags: BTreeSet::new(),
            description: String::new(),
            probe,
        }
    }

    /// Adds selection tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Filter applied by [`CheckRegistry::select`].
///
/// Empty include lists match everything; exclusions always win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSelection {
    /// Only these identifiers, when non-empty.
    pub ids: BTreeSet<CheckId>,
    /// Only these categories, when non-empty.
    pub categories: BTreeSet<CategoryTag>,
    /// Only checks carrying at least one of these tags, when non-empty.
    pub include_tags: BTreeSet<String>,
    /// Drop checks carrying any of these tags.
    pub exclude_tags: BTreeSet<String>,
    /// Drop these identifiers.
    pub exclude_ids: BTreeSet<CheckId>,
}

impl CheckSelection {
    /// Returns true when the definition passes every filter.
    #[must_use]
    pub fn matches(&self, definition: &CheckDefinition) -> bool {
        if self.exclude_ids.contains(&definition.id) {
            return false;
        }
        if definition.tags.iter().any(|tag| self.exclude_tags.contains(tag)) {
            return false;
        }
        if !self.ids.is_empty() && !self.ids.contains(&definition.id) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&definition.category) {
            return false;
        }
        self.include_tags.is_empty()
            || definition.tags.iter().any(|tag| self.include_tags.contains(tag))
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A check with the same identifier is already registered.
    #[error("check already registered: {0}")]
    Duplicate(CheckId),
    /// A selection names identifiers that are not registered.
    #[error("unknown check ids: {0}")]
    Unknown(String),
}

/// Ordered catalog of check definitions.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    /// Definitions in registration order.
    definitions: Vec<Arc<CheckDefinition>>,
    /// Identifier to position in `definitions`.
    index: BTreeMap<CheckId, usize>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the identifier is taken.
    pub fn register(&mut self, definition: CheckDefinition) -> Result<(), RegistryError> {
        if self.index.contains_key(&definition.id) {
            return Err(RegistryError::Duplicate(definition.id));
        }
        self.index.insert(definition.id.clone(), self.definitions.len());
        self.definitions.push(Arc::new(definition));
        Ok(())
    }

    /// Registers an async closure as a check.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the identifier is taken.
    pub fn register_fn<F, Fut>(
        &mut self,
        id: impl Into<CheckId>,
        name: impl Into<String>,
        category: impl Into<CategoryTag>,
        severity: Severity,
        func: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CheckVerdict, ProbeError>> + Send + 'static,
    {
        let probe: Arc<dyn CheckProbe> = Arc::new(FnProbe::new(func));
        self.register(CheckDefinition::new(id, name, category, severity, probe))
    }

    /// Returns the definition for an identifier.
    #[must_use]
    pub fn get(&self, id: &CheckId) -> Option<&Arc<CheckDefinition>> {
        self.index.get(id).and_then(|position| self.definitions.get(*position))
    }

    /// Returns every definition in registration order.
    #[must_use]
    pub fn all(&self) -> &[Arc<CheckDefinition>] {
        &self.definitions
    }

    /// Returns the number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the selected definitions in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unknown`] when the selection names identifiers
    /// that are not registered.
    pub fn select(
        &self,
        selection: &CheckSelection,
    ) -> Result<Vec<Arc<CheckDefinition>>, RegistryError> {
        let unknown: Vec<&str> = selection
            .ids
            .iter()
            .filter(|id| !self.index.contains_key(*id))
            .map(CheckId::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(RegistryError::Unknown(unknown.join(", ")));
        }
        Ok(self
            .definitions
            .iter()
            .filter(|definition| selection.matches(definition))
            .cloned()
            .collect())
    }
}
