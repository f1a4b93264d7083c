//! QA configuration
//!
//! Item types are registered explicitly: each entry names its scenarios,
//! status catalog, manual flags, translatable attributes and rules. A
//! [`QaConfig`] is loaded from YAML or TOML and validated as a whole before
//! any engine is built from it.

use crate::error::ConfigError;
use crate::rules::{RuleSet, RuleSpec};
use qa_model::{Language, StatusCatalog};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Cache sizing and parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries per cache namespace
    pub max_capacity: u64,
    /// Attribute count above which validation runs in parallel
    pub parallel_threshold: usize,
}

impl Default for CacheConfig {
    /// 10,000 entries per namespace, parallel above 64 attributes
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            parallel_threshold: 64,
        }
    }
}

/// QA setup of one item type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTypeConfig {
    /// Item type identifier
    pub name: String,
    /// Table name, used to derive the state link attribute
    pub table: String,
    /// Language content is authored in
    pub source_language: Language,
    /// Ordered scenarios
    pub scenarios: Vec<String>,
    /// Ordered statuses
    #[serde(default)]
    pub statuses: StatusCatalog,
    /// Flags tracked by hand on the QA state
    #[serde(default)]
    pub manual_flags: Vec<String>,
    /// Attributes that carry per-language content
    #[serde(default)]
    pub translatable_attributes: BTreeSet<String>,
    /// One QA state per language instead of one per item
    #[serde(default)]
    pub per_language_state: bool,
    /// Also compute progress over edited translations on refresh
    #[serde(default)]
    pub track_translation_progress: bool,
    /// Validation rules
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl ItemTypeConfig {
    /// Minimal item type with the given scenarios
    #[must_use]
    pub fn new<S>(name: impl Into<String>, source_language: impl Into<Language>, scenarios: S) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
    {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            source_language: source_language.into(),
            scenarios: scenarios.into_iter().map(Into::into).collect(),
            statuses: StatusCatalog::default(),
            manual_flags: Vec::new(),
            translatable_attributes: BTreeSet::new(),
            per_language_state: false,
            track_translation_progress: false,
            rules: Vec::new(),
        }
    }

    /// With status catalog
    #[must_use]
    pub fn with_statuses(mut self, statuses: StatusCatalog) -> Self {
        self.statuses = statuses;
        self
    }

    /// With rule specs
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<RuleSpec>) -> Self {
        self.rules = rules;
        self
    }

    /// With manual flags
    #[must_use]
    pub fn with_manual_flags<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.manual_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// With translatable attributes
    #[must_use]
    pub fn with_translatable<I>(mut self, attributes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.translatable_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Enable per-language state records
    #[must_use]
    pub fn with_per_language_state(mut self, enabled: bool) -> Self {
        self.per_language_state = enabled;
        self
    }

    /// Enable translation progress tracking
    #[must_use]
    pub fn with_translation_progress(mut self, enabled: bool) -> Self {
        self.track_translation_progress = enabled;
        self
    }

    /// Check names, catalog and rules
    ///
    /// # Errors
    /// - `ConfigError::Invalid` for empty or duplicate scenario names and
    ///   rules referencing undeclared scenarios
    /// - `ConfigError::Model` for catalog problems
    /// - `ConfigError::InvalidPattern` for bad regexes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("item type has an empty name".into()));
        }
        let mut seen = BTreeSet::new();
        for scenario in &self.scenarios {
            if scenario.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "item type '{}' declares an empty scenario name",
                    self.name
                )));
            }
            if !seen.insert(scenario.as_str()) {
                return Err(ConfigError::Model(qa_model::ModelError::DuplicateScenario(
                    scenario.clone(),
                )));
            }
        }
        self.statuses.check(&self.scenarios)?;

        for rule in &self.rules {
            if let Some(missing) = rule.on.iter().find(|s| !self.scenarios.contains(s)) {
                return Err(ConfigError::Invalid(format!(
                    "rule for {:?} in item type '{}' references undeclared scenario '{missing}'",
                    rule.attributes, self.name
                )));
            }
        }
        RuleSet::compile(&self.rules)?;
        Ok(())
    }

    /// Compile the configured rules
    ///
    /// # Errors
    /// Same as [`RuleSet::compile`]
    pub fn rule_set(&self) -> Result<RuleSet, ConfigError> {
        RuleSet::compile(&self.rules)
    }

    /// Item attribute holding the QA state id
    ///
    /// `{table}_qa_state_id`, suffixed with `_{lang}` for per-language state.
    #[must_use]
    pub fn state_link_attribute(&self, language: &Language) -> String {
        if self.per_language_state {
            format!("{}_qa_state_id_{language}", self.table)
        } else {
            format!("{}_qa_state_id", self.table)
        }
    }
}

/// Top-level QA configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaConfig {
    /// Cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Registered item types
    #[serde(default)]
    pub item_types: Vec<ItemTypeConfig>,
}

impl QaConfig {
    /// Load from a `.yaml`, `.yml` or `.toml` file
    ///
    /// # Errors
    /// IO, parse or validation failures
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "toml" => Self::from_toml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Parse and validate YAML
    ///
    /// # Errors
    /// Parse or validation failures
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Parse or validation failures
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every item type and name uniqueness
    ///
    /// # Errors
    /// First validation failure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = BTreeSet::new();
        for item_type in &self.item_types {
            if !names.insert(item_type.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "item type '{}' is registered twice",
                    item_type.name
                )));
            }
            item_type.validate()?;
        }
        Ok(())
    }

    /// Configuration registered for `name`
    ///
    /// # Errors
    /// `ConfigError::UnknownItemType` if not registered
    pub fn item_type(&self, name: &str) -> Result<&ItemTypeConfig, ConfigError> {
        self.item_types
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::UnknownItemType(name.to_string()))
    }
}
