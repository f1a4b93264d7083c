//! QA Model
//!
//! Plain data for content quality assurance: the items under review, the
//! statuses they move through, the rules that govern their attributes, and
//! the persisted QA state record.
//!
//! # Core Concepts
//!
//! - [`Item`]: ordered attribute bag with identity, translations and QA state links
//! - [`AttributeHash`]: Blake3 digest of attribute content for cache addressing
//! - [`ValidationRule`]: which attributes are governed in which scenarios
//! - [`StatusCatalog`]: ordered [`StatusDefinition`]s, automatic or manual
//! - [`QaState`]: status, per-scenario progress, flags and review marks
//!
//! # Example
//!
//! ```rust
//! use qa_model::{Item, rounded_percentage};
//!
//! let item = Item::new("article").with_id(3).with_attribute("title", "Hello");
//! assert_eq!(item.identity_key(), "article#3");
//! assert_eq!(rounded_percentage(3, 8), Some(38));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod hash;
mod item;
mod rule;
mod state;
mod status;

pub use error::ModelError;
pub use hash::{AttributeHash, HashError};
pub use item::{AttributeValue, ContentView, Item, ItemIdentity, Language};
pub use rule::ValidationRule;
pub use state::{rounded_percentage, QaState, QaStateId};
pub use status::{StatusCatalog, StatusDefinition, StatusKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
