//! Status definitions and the ordered status catalog

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a status is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Derived from scenario completion
    #[default]
    Automatic,
    /// Assigned by an editor; never overwritten by derivation
    Manual,
}

/// A lifecycle status an item can hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    /// Unique status name
    pub name: String,
    /// Human readable label
    pub label: String,
    /// Scenarios that must be 100% complete, in order
    #[serde(default)]
    pub scenarios: Vec<String>,
    /// Automatic or manual
    #[serde(default)]
    pub kind: StatusKind,
}

impl StatusDefinition {
    /// Automatic status requiring the given scenarios
    #[must_use]
    pub fn automatic<S>(name: impl Into<String>, label: impl Into<String>, scenarios: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            name: name.into(),
            label: label.into(),
            scenarios: scenarios.into_iter().map(Into::into).collect(),
            kind: StatusKind::Automatic,
        }
    }

    /// Manually assigned status
    #[must_use]
    pub fn manual(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            scenarios: Vec::new(),
            kind: StatusKind::Manual,
        }
    }

    /// Automatic with at least one required scenario
    #[inline]
    #[must_use]
    pub fn is_gated(&self) -> bool {
        self.kind == StatusKind::Automatic && !self.scenarios.is_empty()
    }
}

/// Ordered list of statuses for one item type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCatalog {
    statuses: Vec<StatusDefinition>,
}

impl StatusCatalog {
    /// Build catalog, checking names are unique and required scenarios are declared
    ///
    /// # Errors
    /// - `ModelError::DuplicateStatus` on repeated names
    /// - `ModelError::UndeclaredScenario` if a status requires an unknown scenario
    pub fn new(statuses: Vec<StatusDefinition>, scenarios: &[String]) -> Result<Self, ModelError> {
        let catalog = Self { statuses };
        catalog.check(scenarios)?;
        Ok(catalog)
    }

    /// Re-run catalog checks, e.g. after deserialization
    ///
    /// # Errors
    /// Same as [`StatusCatalog::new`]
    pub fn check(&self, scenarios: &[String]) -> Result<(), ModelError> {
        let mut names = BTreeSet::new();
        for status in &self.statuses {
            if !names.insert(status.name.as_str()) {
                return Err(ModelError::DuplicateStatus(status.name.clone()));
            }
            if let Some(missing) = status.scenarios.iter().find(|s| !scenarios.contains(s)) {
                return Err(ModelError::UndeclaredScenario {
                    status: status.name.clone(),
                    scenario: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up status by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StatusDefinition> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// Iterate in declared order
    pub fn iter(&self) -> impl Iterator<Item = &StatusDefinition> {
        self.statuses.iter()
    }

    /// Number of statuses
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// True when no statuses are declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
