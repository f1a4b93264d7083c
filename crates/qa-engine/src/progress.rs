//! Validation progress calculation
//!
//! Validates each governed attribute of a scenario individually on an
//! isolated snapshot and turns the invalid count into a 0..=100 percentage.

use crate::error::{QaError, QaResult};
use crate::validation::AttributeValidator;
use indexmap::IndexSet;
use qa_model::{rounded_percentage, ContentView, Item};
use rayon::prelude::*;

/// Which content progress is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgressMode {
    /// Language-resolved content with source-language fallback
    #[default]
    Validation,
    /// Only content actually edited in the language
    Translation,
}

impl ProgressMode {
    /// Content view the snapshot is taken with
    #[inline]
    #[must_use]
    pub fn view(self) -> ContentView {
        match self {
            Self::Validation => ContentView::WithFallback,
            Self::Translation => ContentView::Edited,
        }
    }

    /// Short name used in cache scopes and logs
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Translation => "translation",
        }
    }
}

/// Counts invalid attributes and computes progress
#[derive(Clone, Copy)]
pub struct ProgressCalculator<'a> {
    validator: &'a dyn AttributeValidator,
    parallel_threshold: usize,
}

impl<'a> ProgressCalculator<'a> {
    /// Create calculator; attribute sets larger than `parallel_threshold`
    /// are validated in parallel
    #[inline]
    #[must_use]
    pub fn new(validator: &'a dyn AttributeValidator, parallel_threshold: usize) -> Self {
        Self {
            validator,
            parallel_threshold,
        }
    }

    /// Count governed attributes that fail validation in `scenario`
    ///
    /// `snapshot` is never modified; each validation runs on a copy with the
    /// scenario activated, so recorded errors stay out of the caller's item.
    #[must_use]
    pub fn invalid_fields(&self, snapshot: &Item, scenario: &str, attributes: &IndexSet<String>) -> usize {
        let mut base = snapshot.clone();
        base.set_scenario(scenario);

        if attributes.len() > self.parallel_threshold {
            let attributes: Vec<&String> = attributes.iter().collect();
            return attributes
                .par_iter()
                .filter(|attribute| {
                    let mut unit = base.clone();
                    !self
                        .validator
                        .validate(&mut unit, std::slice::from_ref(**attribute))
                        .is_valid()
                })
                .count();
        }

        attributes
            .iter()
            .filter(|attribute| {
                base.clear_errors();
                !self
                    .validator
                    .validate(&mut base, std::slice::from_ref(*attribute))
                    .is_valid()
            })
            .count()
    }

    /// Percentage of `total` attributes that are valid
    ///
    /// # Errors
    /// `QaError::NoAssociatedRules` when `total` is zero
    pub fn percentage(scenario: &str, total: usize, invalid: usize) -> QaResult<u8> {
        rounded_percentage(total.saturating_sub(invalid), total).ok_or_else(|| {
            QaError::NoAssociatedRules {
                scenario: scenario.to_string(),
            }
        })
    }
}
