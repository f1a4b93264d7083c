//! QA state records
//!
//! One [`QaState`] exists per item (or per item and language when the item
//! type keeps per-language state). It holds the current status, per-scenario
//! progress, manually tracked flags, and per-attribute review marks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier assigned by the persistence gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QaStateId(pub u64);

impl fmt::Display for QaStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `round(100 * part / total)` with halves rounded away from zero
///
/// Returns `None` when `total` is zero; an empty denominator has no
/// meaningful percentage.
#[must_use]
pub fn rounded_percentage(part: usize, total: usize) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let part = part.min(total) as u128;
    let total = total as u128;
    // (200p + t) / 2t == floor(100p/t + 1/2)
    let value = (200 * part + total) / (2 * total);
    u8::try_from(value).ok()
}

/// Persisted QA state of one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaState {
    /// Gateway identifier, `None` until created
    #[serde(default)]
    pub id: Option<QaStateId>,
    /// Current status name
    #[serde(default)]
    pub status: Option<String>,
    /// Validation progress per scenario, 0..=100
    #[serde(default)]
    pub progress: BTreeMap<String, u8>,
    /// Progress per scenario over edited (non-fallback) translations
    #[serde(default)]
    pub translation_progress: BTreeMap<String, u8>,
    /// Manually tracked flags; `None` means not yet decided
    #[serde(default)]
    pub manual_flags: BTreeMap<String, Option<bool>>,
    /// Per-attribute approval marks
    #[serde(default)]
    pub approved: BTreeMap<String, Option<bool>>,
    /// Per-attribute proofreading marks
    #[serde(default)]
    pub proofed: BTreeMap<String, Option<bool>>,
    /// Share of QA attributes approved
    #[serde(default)]
    pub approval_progress: Option<u8>,
    /// Share of QA attributes proofed
    #[serde(default)]
    pub proofing_progress: Option<u8>,
}

impl QaState {
    /// Fresh state with the given flags undecided
    #[must_use]
    pub fn with_flags<I>(flags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            manual_flags: flags.into_iter().map(|f| (f.into(), None)).collect(),
            ..Self::default()
        }
    }

    /// Progress of a scenario, if computed
    #[inline]
    #[must_use]
    pub fn progress_of(&self, scenario: &str) -> Option<u8> {
        self.progress.get(scenario).copied()
    }

    /// Recompute approval and proofing shares over `qa_attributes`
    pub fn update_review_progress<'a, I>(&mut self, qa_attributes: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut total = 0usize;
        let mut approved = 0usize;
        let mut proofed = 0usize;
        for attribute in qa_attributes {
            total += 1;
            if self.approved.get(attribute) == Some(&Some(true)) {
                approved += 1;
            }
            if self.proofed.get(attribute) == Some(&Some(true)) {
                proofed += 1;
            }
        }
        self.approval_progress = rounded_percentage(approved, total);
        self.proofing_progress = rounded_percentage(proofed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn percentage_rounds_half_away_from_zero() {
        assert_eq!(rounded_percentage(1, 8), Some(13)); // 12.5
        assert_eq!(rounded_percentage(3, 8), Some(38)); // 37.5
        assert_eq!(rounded_percentage(1, 3), Some(33));
        assert_eq!(rounded_percentage(2, 3), Some(67));
        assert_eq!(rounded_percentage(2, 5), Some(40));
        assert_eq!(rounded_percentage(0, 4), Some(0));
        assert_eq!(rounded_percentage(4, 4), Some(100));
        assert_eq!(rounded_percentage(0, 0), None);
    }

    #[test]
    fn review_progress() {
        let mut state = QaState::default();
        state.approved.insert("title".into(), Some(true));
        state.approved.insert("body".into(), Some(false));
        state.proofed.insert("title".into(), None);
        let attrs = vec!["title".to_string(), "body".to_string(), "slug".to_string()];

        state.update_review_progress(&attrs);
        assert_eq!(state.approval_progress, Some(33));
        assert_eq!(state.proofing_progress, Some(0));

        state.update_review_progress(&Vec::<String>::new());
        assert_eq!(state.approval_progress, None);
    }

    #[test]
    fn state_json_roundtrip_keeps_values() {
        let mut state = QaState::with_flags(["previewing_welcome"]);
        state.id = Some(QaStateId(4));
        state.status = Some("draft".into());
        state.progress.insert("draft".into(), 100);
        state.progress.insert("reviewable".into(), 67);

        let json = serde_json::to_string(&state).unwrap();
        let decoded: QaState = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.manual_flags["previewing_welcome"], None);
    }

    proptest! {
        #[test]
        fn percentage_stays_in_range(part in 0usize..10_000, total in 1usize..10_000) {
            let value = rounded_percentage(part, total).unwrap();
            prop_assert!(value <= 100);
            let exact = 100.0 * (part.min(total) as f64) / (total as f64);
            prop_assert!((f64::from(value) - exact).abs() <= 0.5 + 1e-9);
        }
    }
}
