//! Automatic status determination
//!
//! Statuses are walked in declared order. Each automatic status with required
//! scenarios is a gate: when one fails, the walk stops and the last status
//! reached is the answer. Later statuses are never evaluated, so progress is
//! only computed for the scenarios the walk actually reaches.

use crate::error::{QaError, QaResult};
use qa_model::{StatusCatalog, StatusDefinition, StatusKind};

/// Whether a current status may be replaced by automatic determination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// No current status
    Unset,
    /// Current status name is not in the catalog; treated like unset
    Unknown,
    /// Current status is automatic
    Automatic,
    /// Current status is manual; must be kept
    Blocked,
}

impl Overwrite {
    /// True unless blocked by a manual status
    #[inline]
    #[must_use]
    pub fn allowed(self) -> bool {
        self != Self::Blocked
    }
}

/// Evaluates a status catalog against scenario progress
#[derive(Debug, Clone, Copy)]
pub struct StatusEngine<'a> {
    catalog: &'a StatusCatalog,
}

impl<'a> StatusEngine<'a> {
    /// Create engine over `catalog`
    #[inline]
    #[must_use]
    pub fn new(catalog: &'a StatusCatalog) -> Self {
        Self { catalog }
    }

    /// Look up status or fail
    ///
    /// # Errors
    /// `QaError::UnknownStatus` if not in the catalog
    pub fn status(&self, name: &str) -> QaResult<&'a StatusDefinition> {
        self.catalog
            .get(name)
            .ok_or_else(|| QaError::UnknownStatus(name.to_string()))
    }

    /// True when every required scenario of `status` is 100% complete
    ///
    /// Stops at the first incomplete scenario. A status without required
    /// scenarios is vacuously valid.
    ///
    /// # Errors
    /// Propagates errors from `progress`
    pub fn is_complete<F>(status: &StatusDefinition, progress: &mut F) -> QaResult<bool>
    where
        F: FnMut(&str) -> QaResult<u8>,
    {
        for scenario in &status.scenarios {
            if progress(scenario)? != 100 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// [`StatusEngine::is_complete`] by status name
    ///
    /// # Errors
    /// `QaError::UnknownStatus`, or errors from `progress`
    pub fn valid_status<F>(&self, name: &str, mut progress: F) -> QaResult<bool>
    where
        F: FnMut(&str) -> QaResult<u8>,
    {
        Self::is_complete(self.status(name)?, &mut progress)
    }

    /// Walk statuses in order and return the last one reached
    ///
    /// Gated statuses (automatic with scenarios) stop the walk when
    /// incomplete. Manual statuses and ungated automatic statuses are not
    /// checked but become the candidate when reached.
    ///
    /// # Errors
    /// Propagates errors from `progress`
    pub fn determine<F>(&self, mut progress: F) -> QaResult<Option<&'a StatusDefinition>>
    where
        F: FnMut(&str) -> QaResult<u8>,
    {
        let mut last_valid = None;
        for status in self.catalog.iter() {
            if status.is_gated() && !Self::is_complete(status, &mut progress)? {
                tracing::debug!(status = %status.name, "status gate not met");
                break;
            }
            last_valid = Some(status);
        }
        Ok(last_valid)
    }

    /// Classify whether `current` may be overwritten
    #[must_use]
    pub fn overwrite(&self, current: Option<&str>) -> Overwrite {
        match current {
            None => Overwrite::Unset,
            Some(name) => match self.catalog.get(name) {
                None => Overwrite::Unknown,
                Some(status) if status.kind == StatusKind::Manual => Overwrite::Blocked,
                Some(_) => Overwrite::Automatic,
            },
        }
    }

    /// Human readable label of `name`
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&'a str> {
        self.catalog.get(name).map(|s| s.label.as_str())
    }
}
