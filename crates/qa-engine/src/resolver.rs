//! Scenario attribute resolution
//!
//! Maps a scenario to the deduplicated attributes governed by every rule
//! applicable to it. Resolution depends only on the rule registry, never on
//! attribute values.

use crate::error::{QaError, QaResult};
use indexmap::IndexSet;
use qa_model::{Item, ValidationRule};
use std::sync::Arc;

/// Source of validation rules for an item
pub trait RuleRegistry: Send + Sync {
    /// Rules exposed for `item`
    fn rules_of(&self, item: &Item) -> Vec<ValidationRule>;
}

impl<R: RuleRegistry + ?Sized> RuleRegistry for Arc<R> {
    fn rules_of(&self, item: &Item) -> Vec<ValidationRule> {
        (**self).rules_of(item)
    }
}

/// Resolves governed attributes per scenario
#[derive(Clone, Copy)]
pub struct ScenarioResolver<'a> {
    registry: &'a dyn RuleRegistry,
    scenarios: &'a [String],
}

impl<'a> ScenarioResolver<'a> {
    /// Create resolver over the known, ordered scenarios
    #[inline]
    #[must_use]
    pub fn new(registry: &'a dyn RuleRegistry, scenarios: &'a [String]) -> Self {
        Self { registry, scenarios }
    }

    /// Check that `scenario` is declared
    ///
    /// # Errors
    /// `QaError::UnknownScenario` otherwise
    pub fn ensure_known(&self, scenario: &str) -> QaResult<()> {
        if self.scenarios.iter().any(|s| s == scenario) {
            Ok(())
        } else {
            Err(QaError::UnknownScenario(scenario.to_string()))
        }
    }

    /// Attributes governed in `scenario`, or across all scenarios for `None`
    ///
    /// Order follows rule declaration order; duplicates keep their first
    /// position.
    ///
    /// # Errors
    /// `QaError::UnknownScenario` for undeclared scenarios
    pub fn attributes_for(&self, item: &Item, scenario: Option<&str>) -> QaResult<IndexSet<String>> {
        if let Some(scenario) = scenario {
            self.ensure_known(scenario)?;
        }

        let rules = self.registry.rules_of(item);
        let mut attributes = IndexSet::new();
        for rule in &rules {
            let applies = match scenario {
                Some(scenario) => rule.applies_to(scenario),
                None => self.scenarios.iter().any(|s| rule.applies_to(s)),
            };
            if applies {
                attributes.extend(rule.attributes().iter().cloned());
            }
        }

        tracing::debug!(
            item = %item.identity_key(),
            scenario = scenario.unwrap_or("*"),
            count = attributes.len(),
            "resolved qa attributes"
        );
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<ValidationRule>);

    impl RuleRegistry for Fixed {
        fn rules_of(&self, _item: &Item) -> Vec<ValidationRule> {
            self.0.clone()
        }
    }

    fn scenarios() -> Vec<String> {
        vec!["draft".into(), "reviewable".into(), "publishable".into()]
    }

    fn registry() -> Fixed {
        Fixed(vec![
            ValidationRule::new(["title", "slug"], ["draft", "reviewable"]),
            ValidationRule::new(["body", "title"], ["reviewable"]),
            ValidationRule::new(["legacy_code"], ["import"]),
        ])
    }

    #[test]
    fn unions_and_deduplicates() {
        let registry = registry();
        let scenarios = scenarios();
        let resolver = ScenarioResolver::new(&registry, &scenarios);
        let item = Item::new("article");

        let draft = resolver.attributes_for(&item, Some("draft")).unwrap();
        assert_eq!(draft.iter().collect::<Vec<_>>(), ["title", "slug"]);

        let reviewable = resolver.attributes_for(&item, Some("reviewable")).unwrap();
        assert_eq!(reviewable.iter().collect::<Vec<_>>(), ["title", "slug", "body"]);
    }

    #[test]
    fn known_scenario_without_rules_is_empty() {
        let registry = registry();
        let scenarios = scenarios();
        let resolver = ScenarioResolver::new(&registry, &scenarios);
        let attrs = resolver.attributes_for(&Item::new("article"), Some("publishable")).unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn unknown_scenario_is_error() {
        let registry = registry();
        let scenarios = scenarios();
        let resolver = ScenarioResolver::new(&registry, &scenarios);
        let err = resolver.attributes_for(&Item::new("article"), Some("import")).unwrap_err();
        assert!(matches!(err, QaError::UnknownScenario(s) if s == "import"));
    }

    #[test]
    fn aggregate_mode_unions_known_scenarios() {
        let registry = registry();
        let scenarios = scenarios();
        let resolver = ScenarioResolver::new(&registry, &scenarios);
        let all = resolver.attributes_for(&Item::new("article"), None).unwrap();
        // Rules for undeclared scenarios do not contribute
        assert_eq!(all.iter().collect::<Vec<_>>(), ["title", "slug", "body"]);
    }
}
