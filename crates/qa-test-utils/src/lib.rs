//! Testing utilities for the QA workspace
//!
//! Shared fixtures for the article item type, plus validators whose
//! outcome and call count tests can control.

#![allow(missing_docs)]

use qa_engine::{
    AttributeValidator, Check, InMemoryGateway, ItemTypeConfig, QaEngine, QaStateGateway, RuleRegistry, RuleSpec,
    ValidationReport,
};
use qa_model::{Item, StatusCatalog, StatusDefinition, ValidationRule};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn article_scenarios() -> Vec<String> {
    vec!["draft".into(), "reviewable".into(), "publishable".into()]
}

/// `temporary`, `draft`, `reviewable`, `publishable`, then manual `archived`
///
/// `archived` sits after every gate, so a fully complete article is
/// determined as `archived` and keeps it on later refreshes.
pub fn article_statuses() -> StatusCatalog {
    StatusCatalog::new(
        vec![
            StatusDefinition::automatic("temporary", "Temporary", Vec::<String>::new()),
            StatusDefinition::automatic("draft", "Draft", ["draft"]),
            StatusDefinition::automatic("reviewable", "Reviewable", ["draft", "reviewable"]),
            StatusDefinition::automatic("publishable", "Publishable", ["draft", "reviewable", "publishable"]),
            StatusDefinition::manual("archived", "Archived"),
        ],
        &article_scenarios(),
    )
    .unwrap()
}

pub fn article_rules() -> Vec<RuleSpec> {
    vec![
        RuleSpec::new(["title", "slug"], ["draft", "reviewable", "publishable"], Check::Required),
        RuleSpec::new(["slug"], ["reviewable"], Check::Pattern { pattern: "^[a-z0-9-]+$".into() }),
        RuleSpec::new(["body"], ["reviewable", "publishable"], Check::Required),
        RuleSpec::new(["title"], ["reviewable"], Check::Length { min: Some(3), max: Some(80) }),
        RuleSpec::new(["teaser", "image", "category"], ["publishable"], Check::Required),
        RuleSpec::new(
            ["category"],
            ["publishable"],
            Check::OneOf { values: vec!["news".into(), "feature".into()] },
        ),
    ]
}

pub fn article_config() -> ItemTypeConfig {
    ItemTypeConfig::new("article", "en", article_scenarios())
        .with_statuses(article_statuses())
        .with_rules(article_rules())
        .with_manual_flags(["previewing_welcome", "candidate_for_public_status"])
        .with_translatable(["title", "body", "teaser"])
}

/// Article passing `draft` and `reviewable`, with nothing for `publishable`
pub fn reviewable_article(pk: i64) -> Item {
    Item::new("article")
        .with_id(pk)
        .with_attribute("title", "Spring fair")
        .with_attribute("slug", "spring-fair")
        .with_attribute("body", "The fair opens on Saturday.")
}

pub fn article_engine(gateway: Arc<dyn QaStateGateway>) -> QaEngine {
    QaEngine::new(article_config(), gateway).unwrap()
}

pub fn in_memory_article_engine() -> (QaEngine, Arc<InMemoryGateway>) {
    let gateway = Arc::new(InMemoryGateway::new());
    (article_engine(gateway.clone()), gateway)
}

/// Registry returning the same rules for every item
#[derive(Debug, Clone, Default)]
pub struct FixedRegistry(pub Vec<ValidationRule>);

impl RuleRegistry for FixedRegistry {
    fn rules_of(&self, _item: &Item) -> Vec<ValidationRule> {
        self.0.clone()
    }
}

/// Registry with `count` attributes per scenario, named `{scenario}_{n}`
pub fn numbered_registry(scenarios: &[String], count: usize) -> FixedRegistry {
    FixedRegistry(
        scenarios
            .iter()
            .map(|s| ValidationRule::new((1..=count).map(|n| format!("{s}_{n}")), [s.clone()]))
            .collect(),
    )
}

/// Fails a fixed set of attributes per scenario, regardless of values
#[derive(Debug, Clone, Default)]
pub struct ScriptedValidator {
    failing: BTreeMap<String, BTreeSet<String>>,
}

impl ScriptedValidator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing<I>(mut self, scenario: &str, attributes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.failing
            .entry(scenario.to_string())
            .or_default()
            .extend(attributes.into_iter().map(Into::into));
        self
    }
}

impl AttributeValidator for ScriptedValidator {
    fn validate(&self, item: &mut Item, attributes: &[String]) -> ValidationReport {
        let mut report = ValidationReport::passed();
        let Some(failing) = item.scenario().and_then(|s| self.failing.get(s)).cloned() else {
            return report;
        };
        for attribute in attributes.iter().filter(|a| failing.contains(*a)) {
            item.add_error(attribute.clone(), "scripted failure");
            report.fail(attribute.clone());
        }
        report
    }
}

/// Counts attribute validations performed by the wrapped validator
#[derive(Clone)]
pub struct CountingValidator {
    inner: Arc<dyn AttributeValidator>,
    calls: Arc<AtomicUsize>,
}

impl CountingValidator {
    pub fn new(inner: Arc<dyn AttributeValidator>) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Attributes validated so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

impl AttributeValidator for CountingValidator {
    fn validate(&self, item: &mut Item, attributes: &[String]) -> ValidationReport {
        self.calls.fetch_add(attributes.len(), Ordering::SeqCst);
        self.inner.validate(item, attributes)
    }
}
