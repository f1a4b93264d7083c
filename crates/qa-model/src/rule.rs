//! Validation rule associations
//!
//! A [`ValidationRule`] only states *which* attributes are governed in
//! *which* scenarios. How an attribute is checked is the validator's concern.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Immutable association of governed attributes and applicable scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    attributes: Vec<String>,
    scenarios: BTreeSet<String>,
}

impl ValidationRule {
    /// Create rule; duplicate attribute names are dropped, first occurrence wins
    #[must_use]
    pub fn new<A, S>(attributes: A, scenarios: S) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let attributes = attributes
            .into_iter()
            .map(Into::into)
            .filter(|a: &String| seen.insert(a.clone()))
            .collect();
        Self {
            attributes,
            scenarios: scenarios.into_iter().map(Into::into).collect(),
        }
    }

    /// Governed attributes in declaration order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Scenarios the rule applies to
    #[inline]
    #[must_use]
    pub fn scenarios(&self) -> &BTreeSet<String> {
        &self.scenarios
    }

    /// Whether the rule applies in `scenario`
    #[inline]
    #[must_use]
    pub fn applies_to(&self, scenario: &str) -> bool {
        self.scenarios.contains(scenario)
    }

    /// Whether the rule governs `attribute`
    #[inline]
    #[must_use]
    pub fn governs(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}
