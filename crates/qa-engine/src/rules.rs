//! Declarative rule set
//!
//! [`RuleSet`] is built from configuration and serves as both the rule
//! registry and the validator for an item type. Each rule names its
//! attributes, the scenarios it applies in, and one check.

use crate::error::ConfigError;
use crate::resolver::RuleRegistry;
use crate::validation::{AttributeValidator, ValidationReport};
use qa_model::{AttributeValue, Item, ValidationRule};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Check applied to each governed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Value must not be blank
    Required,
    /// Text length or list size bounds
    Length {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    /// Scalar value must match the regex
    Pattern { pattern: String },
    /// Scalar value must be one of the listed values
    OneOf { values: Vec<String> },
    /// Governed, but never fails
    Safe,
}

/// One configured rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Governed attributes
    pub attributes: Vec<String>,
    /// Scenarios the rule applies in
    #[serde(alias = "scenarios")]
    pub on: Vec<String>,
    /// Check to apply
    #[serde(flatten)]
    pub check: Check,
    /// Custom error message
    #[serde(default)]
    pub message: Option<String>,
}

impl RuleSpec {
    /// Create rule
    #[must_use]
    pub fn new<A, S>(attributes: A, on: S, check: Check) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            on: on.into_iter().map(Into::into).collect(),
            check,
            message: None,
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledCheck {
    Required,
    Length { min: Option<usize>, max: Option<usize> },
    Pattern(Regex),
    OneOf(Vec<String>),
    Safe,
}

impl CompiledCheck {
    fn compile(check: &Check) -> Result<Self, ConfigError> {
        Ok(match check {
            Check::Required => Self::Required,
            Check::Length { min, max } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(ConfigError::Invalid(format!(
                            "length check has min {min} greater than max {max}"
                        )));
                    }
                }
                Self::Length { min: *min, max: *max }
            }
            Check::Pattern { pattern } => Self::Pattern(Regex::new(pattern).map_err(|source| {
                ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?),
            Check::OneOf { values } => Self::OneOf(values.clone()),
            Check::Safe => Self::Safe,
        })
    }

    /// `None` when the value passes, otherwise the default failure message
    fn failure(&self, value: &AttributeValue) -> Option<String> {
        if let Self::Required = self {
            return value.is_blank().then(|| "cannot be blank".to_string());
        }
        // Non-required checks accept blank values
        if value.is_blank() {
            return None;
        }
        match self {
            Self::Required | Self::Safe => None,
            Self::Length { min, max } => {
                let Some(len) = value.length() else {
                    return Some("has no length".to_string());
                };
                match (min, max) {
                    (Some(min), _) if len < *min => Some(format!("is too short (minimum is {min})")),
                    (_, Some(max)) if len > *max => Some(format!("is too long (maximum is {max})")),
                    _ => None,
                }
            }
            Self::Pattern(regex) => match value.as_scalar_text() {
                Some(text) if regex.is_match(&text) => None,
                _ => Some("is invalid".to_string()),
            },
            Self::OneOf(values) => match value.as_scalar_text() {
                Some(text) if values.contains(&text) => None,
                _ => Some("is not in the list".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ValidationRule,
    check: CompiledCheck,
    message: Option<String>,
}

/// Compiled rules for one item type
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile rule specs
    ///
    /// # Errors
    /// - `ConfigError::InvalidPattern` if a pattern does not compile
    /// - `ConfigError::Invalid` for empty attribute or scenario lists
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, ConfigError> {
        let rules = specs
            .iter()
            .map(|spec| {
                if spec.attributes.is_empty() {
                    return Err(ConfigError::Invalid("rule governs no attributes".into()));
                }
                if spec.on.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "rule for {:?} applies to no scenarios",
                        spec.attributes
                    )));
                }
                Ok(CompiledRule {
                    rule: ValidationRule::new(spec.attributes.iter().cloned(), spec.on.iter().cloned()),
                    check: CompiledCheck::compile(&spec.check)?,
                    message: spec.message.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when there are no rules
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleRegistry for RuleSet {
    fn rules_of(&self, _item: &Item) -> Vec<ValidationRule> {
        self.rules.iter().map(|r| r.rule.clone()).collect()
    }
}

impl AttributeValidator for RuleSet {
    fn validate(&self, item: &mut Item, attributes: &[String]) -> ValidationReport {
        let mut report = ValidationReport::passed();
        let Some(scenario) = item.scenario().map(str::to_string) else {
            return report;
        };

        for compiled in self.rules.iter().filter(|r| r.rule.applies_to(&scenario)) {
            for attribute in attributes.iter().filter(|a| compiled.rule.governs(a)) {
                let value = item.attribute_or_null(attribute);
                if let Some(default_message) = compiled.check.failure(&value) {
                    let message = compiled.message.clone().unwrap_or(default_message);
                    item.add_error(attribute.clone(), message);
                    report.fail(attribute.clone());
                }
            }
        }
        report
    }
}
