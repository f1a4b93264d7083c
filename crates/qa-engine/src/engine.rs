//! QA engine for one item type
//!
//! [`QaEngine`] owns the collaborators of an item type (rule registry,
//! validator, state gateway, language context) together with its memo
//! cache, and exposes progress, status and refresh operations over items.
//!
//! A refresh computes everything first and writes the QA state once at the
//! end; an error at any step leaves the stored state untouched.

use crate::cache::{ExecutionKey, MemoCache, OwnerKey};
use crate::config::{ItemTypeConfig, QaConfig};
use crate::error::{ConfigError, QaError, QaResult};
use crate::gateway::QaStateGateway;
use crate::language::{LanguageContext, LanguageGuard, SharedLanguage};
use crate::progress::{ProgressCalculator, ProgressMode};
use crate::resolver::{RuleRegistry, ScenarioResolver};
use crate::status::{Overwrite, StatusEngine};
use crate::validation::AttributeValidator;
use indexmap::IndexSet;
use qa_model::{AttributeHash, Item, Language, ModelError, QaState, StatusDefinition, StatusKind};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Default attribute count above which validation runs in parallel
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// What a refresh covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Scenarios to recompute; `None` means all declared scenarios
    pub scenarios: Option<Vec<String>>,
    /// Language to compute in; `None` means the current language
    pub language: Option<Language>,
}

impl RefreshOptions {
    /// All scenarios in the current language
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to `scenarios`
    #[must_use]
    pub fn with_scenarios<I>(mut self, scenarios: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.scenarios = Some(scenarios.into_iter().map(Into::into).collect());
        self
    }

    /// Compute as if editing in `language`
    #[must_use]
    pub fn with_language(mut self, language: impl Into<Language>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Result of a successful refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// State as written through the gateway
    pub state: QaState,
    /// Language the refresh ran in
    pub language: Language,
    /// How the previous status was treated
    pub overwrite: Overwrite,
}

/// Progress, status and refresh operations for one item type
pub struct QaEngine {
    config: Arc<ItemTypeConfig>,
    registry: Arc<dyn RuleRegistry>,
    validator: Arc<dyn AttributeValidator>,
    gateway: Arc<dyn QaStateGateway>,
    language: Arc<dyn LanguageContext>,
    cache: MemoCache,
    registry_scope: String,
    parallel_threshold: usize,
}

impl fmt::Debug for QaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QaEngine")
            .field("item_type", &self.config.name)
            .field("language", &self.language.current())
            .field("cache", &self.cache)
            .field("registry_scope", &self.registry_scope)
            .field("parallel_threshold", &self.parallel_threshold)
            .finish_non_exhaustive()
    }
}

impl QaEngine {
    /// Build engine from item type configuration
    ///
    /// The configured rules serve as both registry and validator; the
    /// language context starts at the source language. Engines built from
    /// equal scenarios and rules resolve attribute sets under the same cache
    /// scope, so they may share a cache.
    ///
    /// # Errors
    /// Returns error if the configuration does not validate
    pub fn new(config: ItemTypeConfig, gateway: Arc<dyn QaStateGateway>) -> Result<Self, ConfigError> {
        config.validate()?;
        let rules = Arc::new(config.rule_set()?);
        let rules_hash =
            AttributeHash::of_serializable(&(&config.scenarios, &config.rules)).map_err(ModelError::from)?;
        let language = Arc::new(SharedLanguage::new(config.source_language.clone()));
        Ok(Self {
            registry_scope: format!("rules:{rules_hash}"),
            config: Arc::new(config),
            registry: rules.clone(),
            validator: rules,
            gateway,
            language,
            cache: MemoCache::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        })
    }

    /// Build engine for a registered item type, applying cache settings
    ///
    /// # Errors
    /// `ConfigError::UnknownItemType`, or validation failures
    pub fn from_config(
        config: &QaConfig,
        item_type: &str,
        gateway: Arc<dyn QaStateGateway>,
    ) -> Result<Self, ConfigError> {
        let item_config = config.item_type(item_type)?.clone();
        Ok(Self::new(item_config, gateway)?
            .with_cache(&MemoCache::new(config.cache.max_capacity))
            .with_parallel_threshold(config.cache.parallel_threshold))
    }

    /// Use a custom rule registry
    ///
    /// Attribute sets resolved by a custom registry are cached under a scope
    /// private to this engine.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn RuleRegistry>) -> Self {
        self.registry = registry;
        self.registry_scope = format!("registry:{}", Uuid::new_v4().simple());
        self
    }

    /// Use a custom attribute validator
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn AttributeValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Use a shared language context
    #[must_use]
    pub fn with_language(mut self, language: Arc<dyn LanguageContext>) -> Self {
        self.language = language;
        self
    }

    /// Share cached values with `cache`, keeping an own execution token
    #[must_use]
    pub fn with_cache(mut self, cache: &MemoCache) -> Self {
        self.cache = cache.fork();
        self
    }

    /// Set parallel validation threshold
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Item type configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ItemTypeConfig {
        &self.config
    }

    /// Memo cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Currently active language
    #[inline]
    #[must_use]
    pub fn current_language(&self) -> Language {
        self.language.current()
    }

    fn status_engine(&self) -> StatusEngine<'_> {
        StatusEngine::new(&self.config.statuses)
    }

    fn calculator(&self) -> ProgressCalculator<'_> {
        ProgressCalculator::new(self.validator.as_ref(), self.parallel_threshold)
    }

    // ------------------------------------------------------------------
    // Attributes and progress
    // ------------------------------------------------------------------

    /// Attributes governed in `scenario`, or in any scenario for `None`
    ///
    /// Cached under the item's owner key, so repeated calls for unchanged
    /// content do not consult the registry again.
    ///
    /// # Errors
    /// `QaError::UnknownScenario`, or hashing failures
    pub fn qa_attributes(&self, item: &Item, scenario: Option<&str>) -> QaResult<Arc<IndexSet<String>>> {
        let owner = OwnerKey::for_item(item)?;
        let scope = format!("qaAttributes:{}:{}", self.registry_scope, scenario.unwrap_or("*"));
        self.cache.attributes_or_try_insert_with(&owner, &scope, || {
            ScenarioResolver::new(self.registry.as_ref(), &self.config.scenarios).attributes_for(item, scenario)
        })
    }

    /// Count invalid governed attributes, always validating
    ///
    /// # Errors
    /// `QaError::UnknownScenario`, or hashing failures
    pub fn invalid_fields(
        &self,
        item: &Item,
        scenario: &str,
        language: &Language,
        mode: ProgressMode,
    ) -> QaResult<usize> {
        let attributes = self.qa_attributes(item, Some(scenario))?;
        let snapshot = item.snapshot(
            language,
            &self.config.source_language,
            &self.config.translatable_attributes,
            mode.view(),
        );
        Ok(self.calculator().invalid_fields(&snapshot, scenario, &attributes))
    }

    /// Count invalid governed attributes, memoized for the current execution epoch
    ///
    /// # Errors
    /// `QaError::ExecutionKeyNotInitialized` before
    /// [`QaEngine::reset_execution_key`], or errors from
    /// [`QaEngine::invalid_fields`]
    pub fn memoized_invalid_fields(
        &self,
        item: &Item,
        scenario: &str,
        language: &Language,
        mode: ProgressMode,
    ) -> QaResult<usize> {
        let token = self.cache.token().ok_or(QaError::ExecutionKeyNotInitialized)?;
        self.counted_in(item, scenario, language, mode, token)
    }

    fn counted_in(
        &self,
        item: &Item,
        scenario: &str,
        language: &Language,
        mode: ProgressMode,
        epoch: Uuid,
    ) -> QaResult<usize> {
        let execution = ExecutionKey::new(&OwnerKey::for_item(item)?, epoch);
        let scope = format!("invalidFields:{}:{language}:{scenario}", mode.as_str());
        self.cache.count_or_try_insert_with(&execution, &scope, || {
            self.invalid_fields(item, scenario, language, mode)
        })
    }

    /// Progress of `scenario` in `language` under `mode`
    ///
    /// Uses memoized invalid counts while an execution epoch is active.
    ///
    /// # Errors
    /// - `QaError::UnknownScenario` for undeclared scenarios
    /// - `QaError::NoAssociatedRules` when nothing is governed
    pub fn progress_in(
        &self,
        item: &Item,
        scenario: &str,
        language: &Language,
        mode: ProgressMode,
    ) -> QaResult<u8> {
        self.progress_with(item, scenario, language, mode, self.cache.token())
    }

    fn progress_with(
        &self,
        item: &Item,
        scenario: &str,
        language: &Language,
        mode: ProgressMode,
        epoch: Option<Uuid>,
    ) -> QaResult<u8> {
        let total = self.qa_attributes(item, Some(scenario))?.len();
        let invalid = match epoch {
            Some(epoch) => self.counted_in(item, scenario, language, mode, epoch)?,
            None => self.invalid_fields(item, scenario, language, mode)?,
        };
        ProgressCalculator::percentage(scenario, total, invalid)
    }

    /// Validation progress of `scenario` in the current language
    ///
    /// # Errors
    /// See [`QaEngine::progress_in`]
    pub fn calculate_validation_progress(&self, item: &Item, scenario: &str) -> QaResult<u8> {
        self.progress_in(item, scenario, &self.language.current(), ProgressMode::Validation)
    }

    /// Progress of `scenario` counting only content edited in `language`
    ///
    /// # Errors
    /// See [`QaEngine::progress_in`]
    pub fn calculate_translation_progress(&self, item: &Item, scenario: &str, language: &Language) -> QaResult<u8> {
        self.progress_in(item, scenario, language, ProgressMode::Translation)
    }

    /// Start a new execution epoch for memoized invalid counts
    ///
    /// The epoch stays active until the next reset; refreshes run in epochs
    /// of their own and leave it in place.
    pub fn reset_execution_key(&self) -> Uuid {
        self.cache.reset_execution_key()
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    /// True when every scenario required by `status` is complete
    ///
    /// # Errors
    /// `QaError::UnknownStatus`, or progress errors
    pub fn valid_status(&self, item: &Item, status: &str) -> QaResult<bool> {
        let language = self.language.current();
        self.status_engine().valid_status(status, |scenario| {
            self.progress_in(item, scenario, &language, ProgressMode::Validation)
        })
    }

    /// Status automatic determination selects for `item`
    ///
    /// # Errors
    /// Progress errors for the scenarios the walk reaches
    pub fn determine_automatic_status(&self, item: &Item) -> QaResult<Option<&StatusDefinition>> {
        let language = self.language.current();
        self.status_engine().determine(|scenario| {
            self.progress_in(item, scenario, &language, ProgressMode::Validation)
        })
    }

    /// Apply automatic determination to `state` unless it holds a manual status
    ///
    /// Only `state` is changed; persisting it is up to the caller.
    ///
    /// # Errors
    /// Progress errors for the scenarios the walk reaches
    pub fn set_automatic_status(&self, item: &Item, state: &mut QaState) -> QaResult<Overwrite> {
        let language = self.language.current();
        self.apply_automatic_status(item, state, |scenario| {
            self.progress_in(item, scenario, &language, ProgressMode::Validation)
        })
    }

    fn apply_automatic_status<F>(&self, item: &Item, state: &mut QaState, progress: F) -> QaResult<Overwrite>
    where
        F: FnMut(&str) -> QaResult<u8>,
    {
        let engine = self.status_engine();
        let overwrite = engine.overwrite(state.status.as_deref());
        if !overwrite.allowed() {
            tracing::warn!(
                item = %item.identity_key(),
                status = state.status.as_deref().unwrap_or_default(),
                "manual status blocks automatic determination"
            );
            return Ok(overwrite);
        }
        if overwrite == Overwrite::Unknown {
            tracing::warn!(
                item = %item.identity_key(),
                status = state.status.as_deref().unwrap_or_default(),
                "current status is not in the catalog; treating as unset"
            );
        }

        let determined = engine.determine(progress)?;
        if let Some(status) = determined.filter(|s| s.kind == StatusKind::Manual) {
            tracing::warn!(
                item = %item.identity_key(),
                status = %status.name,
                "automatic determination reached a manual status; later refreshes keep it"
            );
        }
        state.status = determined.map(|s| s.name.clone());
        Ok(overwrite)
    }

    /// Label of the item's stored status
    ///
    /// # Errors
    /// Gateway failures while loading the state
    pub fn status_label(&self, item: &Item) -> QaResult<Option<&str>> {
        let language = self.language.current();
        let Some(state) = self.load_state(item, &language)? else {
            return Ok(None);
        };
        Ok(state.status.as_deref().and_then(|name| self.status_engine().label(name)))
    }

    // ------------------------------------------------------------------
    // State access
    // ------------------------------------------------------------------

    fn load_state(&self, item: &Item, language: &Language) -> QaResult<Option<QaState>> {
        let link = self.config.state_link_attribute(language);
        match item.qa_state_link(&link) {
            Some(id) => Ok(self.gateway.load(id)?),
            None => Ok(None),
        }
    }

    fn fresh_state(&self) -> QaState {
        QaState::with_flags(self.config.manual_flags.iter().cloned())
    }

    /// Create `state` if new, otherwise save it; links new states to `item`
    fn store(&self, item: &mut Item, language: &Language, state: &mut QaState) -> QaResult<()> {
        if state.id.is_none() {
            let id = self.gateway.create(state.clone()).map_err(|e| {
                tracing::error!(item = %item.identity_key(), error = %e, "qa state creation failed");
                QaError::state_save(None, e.to_string())
            })?;
            state.id = Some(id);
            item.set_qa_state_link(self.config.state_link_attribute(language), id);
            tracing::debug!(item = %item.identity_key(), id = %id, "qa state created");
            return Ok(());
        }

        match self.gateway.save(state) {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::error!(item = %item.identity_key(), id = ?state.id, "gateway rejected qa state");
                Err(QaError::state_save(state.id, "gateway rejected the write"))
            }
            Err(e) => {
                tracing::error!(item = %item.identity_key(), id = ?state.id, error = %e, "qa state save failed");
                Err(QaError::state_save(state.id, e.to_string()))
            }
        }
    }

    /// QA state of `item` in the current language, created on first access
    ///
    /// A link pointing at a missing record is replaced by a new state.
    ///
    /// # Errors
    /// `QaError::StateSave` if creation fails, or gateway load failures
    pub fn qa_state(&self, item: &mut Item) -> QaResult<QaState> {
        let language = self.language.current();
        self.state_in(item, &language)
    }

    fn state_in(&self, item: &mut Item, language: &Language) -> QaResult<QaState> {
        if let Some(state) = self.load_state(item, language)? {
            return Ok(state);
        }
        let mut state = self.fresh_state();
        self.store(item, language, &mut state)?;
        Ok(state)
    }

    /// Ensure the item has a QA state before it is saved
    ///
    /// # Errors
    /// See [`QaEngine::qa_state`]
    pub fn before_save(&self, item: &mut Item) -> QaResult<()> {
        self.qa_state(item).map(|_| ())
    }

    /// Set a declared manual flag and persist
    ///
    /// # Errors
    /// `QaError::UnknownFlag` for undeclared flags, or state errors
    pub fn set_manual_flag(&self, item: &mut Item, flag: &str, value: Option<bool>) -> QaResult<QaState> {
        if !self.config.manual_flags.iter().any(|f| f == flag) {
            return Err(QaError::UnknownFlag(flag.to_string()));
        }
        self.update_state(item, |state| {
            state.manual_flags.insert(flag.to_string(), value);
            Ok(())
        })
    }

    /// Mark a QA attribute approved (or not) and persist
    ///
    /// # Errors
    /// `QaError::UnknownAttribute` if `attribute` is not governed
    pub fn mark_approved(&self, item: &mut Item, attribute: &str, value: Option<bool>) -> QaResult<QaState> {
        self.mark_review(item, attribute, value, |state| &mut state.approved)
    }

    /// Mark a QA attribute proofread (or not) and persist
    ///
    /// # Errors
    /// `QaError::UnknownAttribute` if `attribute` is not governed
    pub fn mark_proofed(&self, item: &mut Item, attribute: &str, value: Option<bool>) -> QaResult<QaState> {
        self.mark_review(item, attribute, value, |state| &mut state.proofed)
    }

    fn mark_review<F>(&self, item: &mut Item, attribute: &str, value: Option<bool>, marks: F) -> QaResult<QaState>
    where
        F: FnOnce(&mut QaState) -> &mut BTreeMap<String, Option<bool>>,
    {
        let attributes = self.qa_attributes(item, None)?;
        if !attributes.contains(attribute) {
            return Err(QaError::UnknownAttribute(attribute.to_string()));
        }
        self.update_state(item, |state| {
            marks(state).insert(attribute.to_string(), value);
            state.update_review_progress(attributes.iter());
            Ok(())
        })
    }

    /// Assign any declared status, manual ones included, and persist
    ///
    /// # Errors
    /// `QaError::UnknownStatus`, or state errors
    pub fn assign_status(&self, item: &mut Item, status: &str) -> QaResult<QaState> {
        let name = self.status_engine().status(status)?.name.clone();
        self.update_state(item, |state| {
            state.status = Some(name);
            Ok(())
        })
    }

    fn update_state<F>(&self, item: &mut Item, change: F) -> QaResult<QaState>
    where
        F: FnOnce(&mut QaState) -> QaResult<()>,
    {
        let language = self.language.current();
        let mut state = self
            .load_state(item, &language)?
            .unwrap_or_else(|| self.fresh_state());
        change(&mut state)?;
        self.store(item, &language, &mut state)?;
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Recompute progress and status and write the QA state once
    ///
    /// The language context is switched for the duration of the call when
    /// `options.language` is set and restored on every exit path. Each call
    /// memoizes invalid counts under an epoch of its own, so concurrent
    /// refreshes never end each other's epoch and the engine's own epoch
    /// is left untouched.
    ///
    /// # Errors
    /// - `QaError::UnknownScenario` for undeclared requested scenarios
    /// - `QaError::NoAssociatedRules` for scenarios without governed attributes
    /// - `QaError::StateSave` when the gateway refuses the write
    pub fn refresh_qa_state(&self, item: &mut Item, options: RefreshOptions) -> QaResult<RefreshOutcome> {
        let _guard = LanguageGuard::switch(self.language.as_ref(), options.language.as_ref());
        let language = self.language.current();

        self.refresh_in(item, options.scenarios, language, Uuid::new_v4())
    }

    fn refresh_in(
        &self,
        item: &mut Item,
        scenarios: Option<Vec<String>>,
        language: Language,
        epoch: Uuid,
    ) -> QaResult<RefreshOutcome> {
        tracing::info!(item = %item.identity_key(), language = %language, "refreshing qa state");

        let scenarios = match scenarios {
            Some(requested) => {
                let resolver = ScenarioResolver::new(self.registry.as_ref(), &self.config.scenarios);
                for scenario in &requested {
                    resolver.ensure_known(scenario)?;
                }
                requested
            }
            None => self.config.scenarios.clone(),
        };

        let mut state = self
            .load_state(item, &language)?
            .unwrap_or_else(|| self.fresh_state());

        let snapshot: &Item = item;
        let mut progress = BTreeMap::new();
        for scenario in &scenarios {
            let value = self.progress_with(snapshot, scenario, &language, ProgressMode::Validation, Some(epoch))?;
            progress.insert(scenario.clone(), value);
        }

        let mut translation = BTreeMap::new();
        if self.config.track_translation_progress {
            for scenario in &scenarios {
                let value =
                    self.progress_with(snapshot, scenario, &language, ProgressMode::Translation, Some(epoch))?;
                translation.insert(scenario.clone(), value);
            }
        }

        let attributes = self.qa_attributes(snapshot, None)?;
        state.update_review_progress(attributes.iter());
        state.progress.extend(progress.iter().map(|(k, v)| (k.clone(), *v)));
        state.translation_progress.extend(translation);

        let overwrite = self.apply_automatic_status(snapshot, &mut state, |scenario| match progress.get(scenario) {
            Some(value) => Ok(*value),
            None => self.progress_with(snapshot, scenario, &language, ProgressMode::Validation, Some(epoch)),
        })?;

        self.store(item, &language, &mut state)?;
        tracing::info!(
            item = %item.identity_key(),
            language = %language,
            status = state.status.as_deref().unwrap_or("none"),
            "qa state refreshed"
        );

        Ok(RefreshOutcome {
            state,
            language,
            overwrite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::rules::{Check, RuleSet, RuleSpec};
    use pretty_assertions::assert_eq;
    use qa_model::{StatusCatalog, StatusDefinition};

    fn config() -> ItemTypeConfig {
        let scenarios = ["draft", "reviewable"];
        let statuses = StatusCatalog::new(
            vec![
                StatusDefinition::automatic("temporary", "Temporary", Vec::<String>::new()),
                StatusDefinition::automatic("draft", "Draft", ["draft"]),
                StatusDefinition::automatic("reviewable", "Reviewable", ["draft", "reviewable"]),
                StatusDefinition::manual("archived", "Archived"),
            ],
            &scenarios.map(String::from),
        )
        .unwrap();
        ItemTypeConfig::new("article", "en", scenarios)
            .with_statuses(statuses)
            .with_manual_flags(["previewing_welcome"])
            .with_rules(vec![
                RuleSpec::new(["title", "slug"], ["draft", "reviewable"], Check::Required),
                RuleSpec::new(["body"], ["reviewable"], Check::Required),
            ])
    }

    fn engine() -> (QaEngine, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::new());
        (QaEngine::new(config(), gateway.clone()).unwrap(), gateway)
    }

    #[test]
    fn attributes_and_progress() {
        let (engine, _) = engine();
        let item = Item::new("article").with_attribute("title", "Hello");
        let attrs = engine.qa_attributes(&item, None).unwrap();
        assert_eq!(attrs.iter().collect::<Vec<_>>(), ["title", "slug", "body"]);
        assert_eq!(engine.calculate_validation_progress(&item, "draft").unwrap(), 50);
        assert_eq!(engine.calculate_validation_progress(&item, "reviewable").unwrap(), 33);
    }

    #[test]
    fn memoized_count_requires_epoch() {
        let (engine, _) = engine();
        let item = Item::new("article");
        let en = Language::new("en");
        let err = engine
            .memoized_invalid_fields(&item, "draft", &en, ProgressMode::Validation)
            .unwrap_err();
        assert!(matches!(err, QaError::ExecutionKeyNotInitialized));

        engine.reset_execution_key();
        assert_eq!(
            engine
                .memoized_invalid_fields(&item, "draft", &en, ProgressMode::Validation)
                .unwrap(),
            2
        );
    }

    #[test]
    fn refresh_creates_and_links_state() {
        let (engine, gateway) = engine();
        let mut item = Item::new("article")
            .with_id(4)
            .with_attribute("title", "Hello")
            .with_attribute("slug", "hello");

        let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
        assert_eq!(outcome.state.status.as_deref(), Some("draft"));
        assert_eq!(outcome.state.progress_of("draft"), Some(100));
        assert_eq!(outcome.state.progress_of("reviewable"), Some(67));
        assert_eq!(outcome.overwrite, Overwrite::Unset);
        assert_eq!(gateway.len(), 1);

        let id = item.qa_state_link("article_qa_state_id").unwrap();
        assert_eq!(gateway.reload(id).unwrap(), outcome.state);
        assert!(engine.cache().token().is_none());
    }

    #[test]
    fn refresh_leaves_caller_epoch_active() {
        let (engine, _) = engine();
        let mut item = Item::new("article").with_id(5).with_attribute("title", "Hello");
        let en = Language::new("en");
        let token = engine.reset_execution_key();

        engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
        assert_eq!(engine.cache().token(), Some(token));
        assert_eq!(
            engine
                .memoized_invalid_fields(&item, "draft", &en, ProgressMode::Validation)
                .unwrap(),
            1
        );
    }

    #[test]
    fn custom_registry_gets_own_attribute_scope() {
        let shared = MemoCache::new(100);
        let gateway = Arc::new(InMemoryGateway::new());
        let configured = QaEngine::new(config(), gateway.clone()).unwrap().with_cache(&shared);
        let same_rules = QaEngine::new(config(), gateway.clone()).unwrap().with_cache(&shared);
        let narrowed = QaEngine::new(config(), gateway)
            .unwrap()
            .with_cache(&shared)
            .with_registry(Arc::new(RuleSet::compile(&[RuleSpec::new(["title"], ["draft"], Check::Required)]).unwrap()));
        let item = Item::new("article").with_id(1);

        assert_eq!(configured.qa_attributes(&item, Some("draft")).unwrap().len(), 2);
        assert_eq!(same_rules.qa_attributes(&item, Some("draft")).unwrap().len(), 2);
        assert_eq!(shared.stats().owner_entries, 1);
        assert_eq!(narrowed.qa_attributes(&item, Some("draft")).unwrap().len(), 1);
        assert_eq!(configured.qa_attributes(&item, Some("draft")).unwrap().len(), 2);
    }

    #[test]
    fn refresh_keeps_manual_status() {
        let (engine, _) = engine();
        let mut item = Item::new("article");
        engine.assign_status(&mut item, "archived").unwrap();

        let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
        assert_eq!(outcome.overwrite, Overwrite::Blocked);
        assert_eq!(outcome.state.status.as_deref(), Some("archived"));
        assert_eq!(engine.status_label(&item).unwrap(), Some("Archived"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let (engine, _) = engine();
        let mut item = Item::new("article");
        assert!(matches!(
            engine.refresh_qa_state(&mut item, RefreshOptions::all().with_scenarios(["final"])),
            Err(QaError::UnknownScenario(_))
        ));
        assert!(matches!(engine.set_manual_flag(&mut item, "nope", Some(true)), Err(QaError::UnknownFlag(_))));
        assert!(matches!(engine.mark_approved(&mut item, "teaser", Some(true)), Err(QaError::UnknownAttribute(_))));
        assert!(matches!(engine.assign_status(&mut item, "gone"), Err(QaError::UnknownStatus(_))));
        assert!(matches!(engine.valid_status(&item, "gone"), Err(QaError::UnknownStatus(_))));
    }

    #[test]
    fn review_marks_update_progress() {
        let (engine, _) = engine();
        let mut item = Item::new("article");
        engine.mark_approved(&mut item, "title", Some(true)).unwrap();
        let state = engine.mark_proofed(&mut item, "body", Some(true)).unwrap();
        assert_eq!(state.approval_progress, Some(33));
        assert_eq!(state.proofing_progress, Some(33));

        let state = engine.set_manual_flag(&mut item, "previewing_welcome", Some(true)).unwrap();
        assert_eq!(state.manual_flags.get("previewing_welcome"), Some(&Some(true)));
        assert_eq!(state.approved.get("title"), Some(&Some(true)));
    }

    #[test]
    fn before_save_creates_state_once() {
        let (engine, gateway) = engine();
        let mut item = Item::new("article");
        engine.before_save(&mut item).unwrap();
        engine.before_save(&mut item).unwrap();
        assert_eq!(gateway.len(), 1);
        let state = engine.qa_state(&mut item).unwrap();
        assert_eq!(state.manual_flags.get("previewing_welcome"), Some(&None));
    }
}
