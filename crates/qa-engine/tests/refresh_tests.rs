use mockall::mock;
use mockall::predicate::always;
use pretty_assertions::assert_eq;
use qa_engine::prelude::*;
use qa_engine::{GatewayError, LanguageContext, SharedLanguage};
use qa_test_utils::{
    article_config, article_engine, article_scenarios, in_memory_article_engine, numbered_registry,
    reviewable_article, ScriptedValidator,
};
use std::sync::Arc;

mock! {
    pub Gateway {}

    impl QaStateGateway for Gateway {
        fn load(&self, id: QaStateId) -> Result<Option<QaState>, GatewayError>;
        fn create(&self, state: QaState) -> Result<QaStateId, GatewayError>;
        fn save(&self, state: &QaState) -> Result<bool, GatewayError>;
    }
}

/// Five numbered attributes per scenario; scripted failures set the percentages
fn scripted_engine(validator: ScriptedValidator) -> (QaEngine, Arc<InMemoryGateway>) {
    let gateway = Arc::new(InMemoryGateway::new());
    let engine = article_engine(gateway.clone())
        .with_registry(Arc::new(numbered_registry(&article_scenarios(), 5)))
        .with_validator(Arc::new(validator));
    (engine, gateway)
}

#[test]
fn test_reviewable_when_publishable_incomplete() {
    let validator = ScriptedValidator::new().failing("publishable", ["publishable_1", "publishable_2", "publishable_3"]);
    let (engine, _) = scripted_engine(validator);
    let item = Item::new("article").with_id(1);

    assert_eq!(engine.calculate_validation_progress(&item, "draft").unwrap(), 100);
    assert_eq!(engine.calculate_validation_progress(&item, "reviewable").unwrap(), 100);
    assert_eq!(engine.calculate_validation_progress(&item, "publishable").unwrap(), 40);

    let status = engine.determine_automatic_status(&item).unwrap();
    assert_eq!(status.map(|s| s.name.as_str()), Some("reviewable"));
    assert!(engine.valid_status(&item, "reviewable").unwrap());
    assert!(!engine.valid_status(&item, "publishable").unwrap());
}

#[test]
fn test_temporary_when_draft_incomplete() {
    let validator = ScriptedValidator::new().failing("draft", ["draft_5"]);
    let (engine, _) = scripted_engine(validator);
    let item = Item::new("article").with_id(1);

    assert_eq!(engine.calculate_validation_progress(&item, "draft").unwrap(), 80);
    let status = engine.determine_automatic_status(&item).unwrap();
    assert_eq!(status.map(|s| s.name.as_str()), Some("temporary"));
}

#[test]
fn test_refresh_with_configured_rules() {
    let (engine, gateway) = in_memory_article_engine();
    let mut item = reviewable_article(7);

    let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    assert_eq!(outcome.state.progress_of("draft"), Some(100));
    assert_eq!(outcome.state.progress_of("reviewable"), Some(100));
    assert_eq!(outcome.state.progress_of("publishable"), Some(50));
    assert_eq!(outcome.state.status.as_deref(), Some("reviewable"));
    assert_eq!(outcome.language, Language::new("en"));

    let id = item.qa_state_link("article_qa_state_id").unwrap();
    assert_eq!(gateway.reload(id).unwrap(), outcome.state);
    assert_eq!(engine.status_label(&item).unwrap(), Some("Reviewable"));
}

#[test]
fn test_refresh_subset_keeps_other_progress() {
    let (engine, _) = in_memory_article_engine();
    let mut item = reviewable_article(7);
    engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();

    item.set_attribute("teaser", "Rides and music");
    item.set_attribute("image", "fair.jpg");
    let outcome = engine
        .refresh_qa_state(&mut item, RefreshOptions::all().with_scenarios(["publishable"]))
        .unwrap();

    assert_eq!(outcome.state.progress_of("publishable"), Some(83));
    assert_eq!(outcome.state.progress_of("draft"), Some(100));
    assert_eq!(outcome.state.status.as_deref(), Some("reviewable"));
}

#[test]
fn test_manual_status_survives_refresh() {
    let (engine, _) = in_memory_article_engine();
    let mut item = reviewable_article(3);
    engine.assign_status(&mut item, "archived").unwrap();

    let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    assert_eq!(outcome.overwrite, Overwrite::Blocked);
    assert_eq!(outcome.state.status.as_deref(), Some("archived"));
    // Progress is still recomputed
    assert_eq!(outcome.state.progress_of("publishable"), Some(50));
}

#[test]
fn test_complete_article_reaches_trailing_manual_status() {
    let (engine, _) = in_memory_article_engine();
    let mut item = reviewable_article(6);
    item.set_attribute("teaser", "Rides and music");
    item.set_attribute("image", "fair.jpg");
    item.set_attribute("category", "news");

    let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    assert_eq!(outcome.state.progress_of("publishable"), Some(100));
    assert_eq!(outcome.state.status.as_deref(), Some("archived"));
    assert_eq!(outcome.overwrite, Overwrite::Unset);

    // Once reached, the manual status is kept even when content regresses
    item.set_attribute("teaser", "");
    let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    assert_eq!(outcome.overwrite, Overwrite::Blocked);
    assert_eq!(outcome.state.status.as_deref(), Some("archived"));
    assert_eq!(outcome.state.progress_of("publishable"), Some(83));
}

#[test]
fn test_unknown_current_status_is_replaced() {
    let (engine, gateway) = in_memory_article_engine();
    let mut item = reviewable_article(3);
    let mut state = engine.qa_state(&mut item).unwrap();
    state.status = Some("retired".into());
    assert!(gateway.save(&state).unwrap());

    let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    assert_eq!(outcome.overwrite, Overwrite::Unknown);
    assert_eq!(outcome.state.status.as_deref(), Some("reviewable"));
}

#[test]
fn test_set_automatic_status_only_touches_state() {
    let (engine, gateway) = in_memory_article_engine();
    let item = reviewable_article(3);
    let mut state = QaState::default();

    let overwrite = engine.set_automatic_status(&item, &mut state).unwrap();
    assert_eq!(overwrite, Overwrite::Unset);
    assert_eq!(state.status.as_deref(), Some("reviewable"));
    assert!(gateway.is_empty());
}

#[test]
fn test_scenario_without_rules_fails_refresh() {
    let config = article_config().with_rules(vec![RuleSpec::new(
        ["title"],
        ["draft", "reviewable"],
        Check::Required,
    )]);
    let gateway = Arc::new(InMemoryGateway::new());
    let engine = QaEngine::new(config, gateway.clone()).unwrap();
    let mut item = reviewable_article(2);

    let err = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap_err();
    assert!(matches!(err, QaError::NoAssociatedRules { ref scenario } if scenario == "publishable"));
    assert!(err.requires_configuration_fix());
    // Nothing written
    assert!(gateway.is_empty());
    assert!(item.qa_state_link("article_qa_state_id").is_none());
}

#[test]
fn test_rejected_save_is_state_save_error() {
    let stored = QaState {
        id: Some(QaStateId(11)),
        ..QaState::default()
    };
    let mut gateway = MockGateway::new();
    gateway
        .expect_load()
        .returning(move |_| Ok(Some(stored.clone())));
    gateway.expect_save().with(always()).times(1).returning(|_| Ok(false));
    gateway.expect_create().never();

    let engine = article_engine(Arc::new(gateway));
    let mut item = reviewable_article(5);
    item.set_qa_state_link("article_qa_state_id", QaStateId(11));

    let err = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap_err();
    assert!(matches!(err, QaError::StateSave { id: Some(QaStateId(11)), .. }));
    assert!(!err.requires_configuration_fix());
}

#[test]
fn test_failed_creation_is_state_save_error() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_create()
        .returning(|_| Err(GatewayError::Backend("unique constraint".into())));

    let engine = article_engine(Arc::new(gateway));
    let mut item = reviewable_article(5);
    let err = engine.before_save(&mut item).unwrap_err();
    assert!(matches!(err, QaError::StateSave { id: None, ref reason } if reason.contains("unique constraint")));
}

#[test]
fn test_language_restored_after_refresh() {
    let language = Arc::new(SharedLanguage::new("en"));
    let (engine, _) = in_memory_article_engine();
    let engine = engine.with_language(language.clone());
    let mut item = reviewable_article(1);

    let outcome = engine
        .refresh_qa_state(&mut item, RefreshOptions::all().with_language("sv"))
        .unwrap();
    assert_eq!(outcome.language, Language::new("sv"));
    assert_eq!(language.current(), Language::new("en"));

    let err = engine
        .refresh_qa_state(&mut item, RefreshOptions::all().with_language("de").with_scenarios(["final"]))
        .unwrap_err();
    assert!(matches!(err, QaError::UnknownScenario(_)));
    assert_eq!(language.current(), Language::new("en"));
}

#[test]
fn test_per_language_state_and_translation_progress() {
    let config = article_config()
        .with_per_language_state(true)
        .with_translation_progress(true);
    let gateway = Arc::new(InMemoryGateway::new());
    let engine = QaEngine::new(config, gateway.clone()).unwrap();
    let sv = Language::new("sv");

    let mut item = reviewable_article(9).with_translation(sv.clone(), "title", "Vårmarknad");

    let en = engine.refresh_qa_state(&mut item, RefreshOptions::all()).unwrap();
    let swedish = engine
        .refresh_qa_state(&mut item, RefreshOptions::all().with_language("sv"))
        .unwrap();

    assert_ne!(en.state.id, swedish.state.id);
    assert!(item.qa_state_link("article_qa_state_id_en").is_some());
    assert!(item.qa_state_link("article_qa_state_id_sv").is_some());
    assert_eq!(gateway.len(), 2);

    // Source language: edited view equals the fallback view
    assert_eq!(en.state.translation_progress.get("reviewable"), Some(&100));
    // Swedish body is untranslated: falls back for validation, blank when edited only
    assert_eq!(swedish.state.progress_of("reviewable"), Some(100));
    assert_eq!(swedish.state.translation_progress.get("reviewable"), Some(&67));
    assert_eq!(
        engine.calculate_translation_progress(&item, "draft", &sv).unwrap(),
        100
    );
}
