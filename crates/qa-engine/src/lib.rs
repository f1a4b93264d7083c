//! QA Engine
//!
//! Tracks the editorial quality assurance lifecycle of content items: how
//! far each scenario's governed attributes pass validation, and which status
//! that earns the item.
//!
//! # Core Operations
//!
//! - **Resolve**: scenario → governed attributes, from the rule registry
//! - **Measure**: scenario → 0..=100 progress over an isolated item snapshot
//! - **Determine**: ordered statuses → last status reached before a failing gate
//! - **Refresh**: recompute everything and write the QA state once
//!
//! # Architecture
//!
//! ```text
//! refresh → ScenarioResolver → ProgressCalculator → StatusEngine → QaStateGateway
//!                 ↑_________________↓
//!                 MemoCache (owner keys + execution keys)
//! ```
//!
//! # Example
//!
//! ```rust
//! use qa_engine::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ItemTypeConfig::new("article", "en", ["draft"])
//!     .with_rules(vec![RuleSpec::new(["title", "body"], ["draft"], Check::Required)]);
//! let engine = QaEngine::new(config, Arc::new(InMemoryGateway::new()))?;
//!
//! let mut item = Item::new("article").with_attribute("title", "Hello");
//! assert_eq!(engine.calculate_validation_progress(&item, "draft")?, 50);
//!
//! let outcome = engine.refresh_qa_state(&mut item, RefreshOptions::all())?;
//! assert_eq!(outcome.state.progress_of("draft"), Some(50));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod language;
pub mod progress;
pub mod resolver;
pub mod rules;
pub mod status;
pub mod validation;

// Re-exports for convenience
pub use cache::{CacheStats, ExecutionKey, MemoCache, OwnerKey};
pub use config::{CacheConfig, ItemTypeConfig, QaConfig};
pub use engine::{QaEngine, RefreshOptions, RefreshOutcome, DEFAULT_PARALLEL_THRESHOLD};
pub use error::{ConfigError, GatewayError, QaError, QaResult};
pub use gateway::{InMemoryGateway, JsonFileGateway, QaStateGateway};
pub use language::{LanguageContext, LanguageGuard, SharedLanguage};
pub use progress::{ProgressCalculator, ProgressMode};
pub use resolver::{RuleRegistry, ScenarioResolver};
pub use rules::{Check, RuleSet, RuleSpec};
pub use status::{Overwrite, StatusEngine};
pub use validation::{AttributeValidator, ValidationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the QA engine
    pub use crate::config::{ItemTypeConfig, QaConfig};
    pub use crate::engine::{QaEngine, RefreshOptions, RefreshOutcome};
    pub use crate::error::{QaError, QaResult};
    pub use crate::gateway::{InMemoryGateway, JsonFileGateway, QaStateGateway};
    pub use crate::rules::{Check, RuleSpec};
    pub use crate::status::Overwrite;
    pub use crate::validation::{AttributeValidator, ValidationReport};
    pub use qa_model::{
        AttributeValue, Item, Language, QaState, QaStateId, StatusCatalog, StatusDefinition, StatusKind,
    };
}
