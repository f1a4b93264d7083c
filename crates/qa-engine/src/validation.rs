//! Attribute validation capability
//!
//! The engine does not know how attributes are checked. It hands a snapshot
//! (with the target scenario already active) and a subset of attributes to an
//! [`AttributeValidator`] and reads back which of them failed.

use qa_model::Item;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Outcome of validating a subset of attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    failed: BTreeSet<String>,
}

impl ValidationReport {
    /// Report with no failures
    #[inline]
    #[must_use]
    pub fn passed() -> Self {
        Self::default()
    }

    /// Record a failed attribute
    pub fn fail(&mut self, attribute: impl Into<String>) {
        self.failed.insert(attribute.into());
    }

    /// True when nothing failed
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failed.is_empty()
    }

    /// Attributes that failed
    #[inline]
    #[must_use]
    pub fn failed_attributes(&self) -> &BTreeSet<String> {
        &self.failed
    }
}

impl FromIterator<String> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            failed: iter.into_iter().collect(),
        }
    }
}

/// Validates attributes of an item snapshot
///
/// Implementations read the active scenario from [`Item::scenario`] and may
/// record errors on the snapshot. They must be `Sync`: large attribute sets
/// are validated in parallel, each unit on its own snapshot clone.
pub trait AttributeValidator: Send + Sync {
    /// Validate `attributes` on `item` under its active scenario
    fn validate(&self, item: &mut Item, attributes: &[String]) -> ValidationReport;
}

impl<V: AttributeValidator + ?Sized> AttributeValidator for Arc<V> {
    fn validate(&self, item: &mut Item, attributes: &[String]) -> ValidationReport {
        (**self).validate(item, attributes)
    }
}
