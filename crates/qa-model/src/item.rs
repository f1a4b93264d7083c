//! Items under quality assurance
//!
//! An [`Item`] is the subject record: an ordered attribute bag, optional
//! per-language edited content, an identity, and links to its QA state
//! records. Validation side effects (active scenario, recorded errors) live
//! on the item too, which is why progress calculation always works on a
//! snapshot rather than the caller's instance.

use crate::hash::{AttributeHash, HashError};
use crate::state::QaStateId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single attribute value
///
/// Deserialized untagged, so plain JSON values map directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Integer(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Ordered list of values
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// True for null, whitespace-only text and empty lists
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) => false,
        }
    }

    /// Scalar rendering used by pattern and membership checks
    #[must_use]
    pub fn as_scalar_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Length in characters for text, element count for lists
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::Text(s) => Some(s.chars().count()),
            Self::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Language code such as `en` or `sv`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Create language code
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Code as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Whether the item has been persisted yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemIdentity {
    /// Not yet saved
    #[default]
    New,
    /// Saved with this primary key
    Persisted(i64),
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Persisted(pk) => write!(f, "{pk}"),
        }
    }
}

/// Which content a language-specific snapshot exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentView {
    /// Missing translations inherit the source-language value
    #[default]
    WithFallback,
    /// Only content actually edited in the language; missing translations read as null
    Edited,
}

/// The record whose QA lifecycle is tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    item_type: String,
    #[serde(default)]
    identity: ItemIdentity,
    #[serde(default)]
    attributes: IndexMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    translations: BTreeMap<Language, IndexMap<String, AttributeValue>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    qa_state_links: BTreeMap<String, QaStateId>,
    #[serde(skip)]
    scenario: Option<String>,
    #[serde(skip)]
    errors: IndexMap<String, Vec<String>>,
}

impl Item {
    /// Create a new, unsaved item of the given type
    #[must_use]
    pub fn new(item_type: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            identity: ItemIdentity::New,
            attributes: IndexMap::new(),
            translations: BTreeMap::new(),
            qa_state_links: BTreeMap::new(),
            scenario: None,
            errors: IndexMap::new(),
        }
    }

    /// With persisted primary key
    #[inline]
    #[must_use]
    pub fn with_id(mut self, pk: i64) -> Self {
        self.identity = ItemIdentity::Persisted(pk);
        self
    }

    /// With attribute value
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// With edited content for a language
    #[inline]
    #[must_use]
    pub fn with_translation(
        mut self,
        language: impl Into<Language>,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.set_translation(language, name, value);
        self
    }

    /// Item type identifier
    #[inline]
    #[must_use]
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// Persistence identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> ItemIdentity {
        self.identity
    }

    /// Attribute value, if set
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attribute value, null when unset
    #[must_use]
    pub fn attribute_or_null(&self, name: &str) -> AttributeValue {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    /// All attributes in declaration order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, AttributeValue> {
        &self.attributes
    }

    /// Set attribute value
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Set edited content for a language
    pub fn set_translation(
        &mut self,
        language: impl Into<Language>,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) {
        self.translations
            .entry(language.into())
            .or_default()
            .insert(name.into(), value.into());
    }

    /// Edited content for a language, if any
    #[must_use]
    pub fn translation(&self, language: &Language, name: &str) -> Option<&AttributeValue> {
        self.translations.get(language).and_then(|t| t.get(name))
    }

    /// Active validation scenario
    #[inline]
    #[must_use]
    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    /// Set active validation scenario
    pub fn set_scenario(&mut self, scenario: impl Into<String>) {
        self.scenario = Some(scenario.into());
    }

    /// Record a validation error against an attribute
    pub fn add_error(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(attribute.into())
            .or_default()
            .push(message.into());
    }

    /// Forget errors recorded by earlier validations
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Recorded validation errors
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &IndexMap<String, Vec<String>> {
        &self.errors
    }

    /// True when validation recorded no errors
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// QA state linked under the given link attribute
    #[inline]
    #[must_use]
    pub fn qa_state_link(&self, link_attribute: &str) -> Option<QaStateId> {
        self.qa_state_links.get(link_attribute).copied()
    }

    /// Link a QA state record
    pub fn set_qa_state_link(&mut self, link_attribute: impl Into<String>, id: QaStateId) {
        self.qa_state_links.insert(link_attribute.into(), id);
    }

    /// Stable identity string: `{item_type}#{pk|new}`
    #[must_use]
    pub fn identity_key(&self) -> String {
        format!("{}#{}", self.item_type, self.identity)
    }

    /// Hash of attribute and translation content
    ///
    /// # Errors
    /// Returns error if attribute values cannot be serialized
    pub fn content_hash(&self) -> Result<AttributeHash, HashError> {
        AttributeHash::of_serializable(&(&self.attributes, &self.translations))
    }

    /// Isolated copy with language-resolved content and no recorded state
    ///
    /// For the source language, or when no attributes are translatable, this
    /// is a plain copy. Otherwise each translatable attribute is replaced by
    /// the language's edited value; under [`ContentView::WithFallback`] a
    /// missing translation keeps the source value, under
    /// [`ContentView::Edited`] it becomes null.
    #[must_use]
    pub fn snapshot(
        &self,
        language: &Language,
        source_language: &Language,
        translatable: &BTreeSet<String>,
        view: ContentView,
    ) -> Item {
        let mut snapshot = self.clone();
        snapshot.scenario = None;
        snapshot.clear_errors();

        if language == source_language || translatable.is_empty() {
            return snapshot;
        }

        for name in translatable {
            match (self.translation(language, name), view) {
                (Some(value), _) => {
                    snapshot.attributes.insert(name.clone(), value.clone());
                }
                (None, ContentView::Edited) => {
                    snapshot.attributes.insert(name.clone(), AttributeValue::Null);
                }
                (None, ContentView::WithFallback) => {}
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn translatable() -> BTreeSet<String> {
        ["title".to_string()].into_iter().collect()
    }

    #[test]
    fn blank_values() {
        assert!(AttributeValue::Null.is_blank());
        assert!(AttributeValue::from("  ").is_blank());
        assert!(AttributeValue::List(vec![]).is_blank());
        assert!(!AttributeValue::from(0).is_blank());
        assert!(!AttributeValue::from(false).is_blank());
    }

    #[test]
    fn untagged_json_values() {
        let item: Item = serde_json::from_str(
            r#"{"item_type":"article","identity":{"persisted":7},
                "attributes":{"title":"Hi","views":3,"tags":["a"],"teaser":null}}"#,
        )
        .unwrap();
        assert_eq!(item.identity(), ItemIdentity::Persisted(7));
        assert_eq!(item.attribute("title"), Some(&AttributeValue::from("Hi")));
        assert_eq!(item.attribute("views"), Some(&AttributeValue::Integer(3)));
        assert_eq!(item.attribute("teaser"), Some(&AttributeValue::Null));
        assert_eq!(item.attribute("tags").and_then(AttributeValue::length), Some(1));
    }

    #[test]
    fn snapshot_is_isolated() {
        let mut item = Item::new("article").with_attribute("title", "Hello");
        item.set_scenario("draft");
        item.add_error("title", "too short");

        let en = Language::new("en");
        let mut snapshot = item.snapshot(&en, &en, &translatable(), ContentView::WithFallback);
        assert_eq!(snapshot.scenario(), None);
        assert!(!snapshot.has_errors());

        snapshot.add_error("title", "other");
        snapshot.set_attribute("title", "changed");
        assert_eq!(item.errors()["title"], vec!["too short".to_string()]);
        assert_eq!(item.attribute("title"), Some(&AttributeValue::from("Hello")));
    }

    #[test]
    fn snapshot_fallback_and_edited_views() {
        let item = Item::new("article")
            .with_attribute("title", "Hello")
            .with_attribute("body", "Text");
        let en = Language::new("en");
        let sv = Language::new("sv");

        let fallback = item.snapshot(&sv, &en, &translatable(), ContentView::WithFallback);
        assert_eq!(fallback.attribute("title"), Some(&AttributeValue::from("Hello")));

        let edited = item.snapshot(&sv, &en, &translatable(), ContentView::Edited);
        assert_eq!(edited.attribute("title"), Some(&AttributeValue::Null));
        // Non-translatable attributes are untouched
        assert_eq!(edited.attribute("body"), Some(&AttributeValue::from("Text")));

        let translated = item.with_translation("sv", "title", "Hej");
        let edited = translated.snapshot(&sv, &en, &translatable(), ContentView::Edited);
        assert_eq!(edited.attribute("title"), Some(&AttributeValue::from("Hej")));
    }

    #[test]
    fn content_hash_ignores_validation_state() {
        let item = Item::new("article").with_attribute("title", "Hello");
        let mut validated = item.clone();
        validated.set_scenario("draft");
        validated.add_error("title", "bad");
        assert_eq!(item.content_hash().unwrap(), validated.content_hash().unwrap());

        let edited = item.clone().with_attribute("title", "Hello!");
        assert_ne!(item.content_hash().unwrap(), edited.content_hash().unwrap());
    }

    #[test]
    fn identity_key_format() {
        assert_eq!(Item::new("article").identity_key(), "article#new");
        assert_eq!(Item::new("article").with_id(12).identity_key(), "article#12");
    }
}
