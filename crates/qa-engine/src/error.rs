//! Error types for the QA engine
//!
//! Provides error handling for:
//! - Progress and status computation
//! - Persistence through the state gateway
//! - Configuration loading

use qa_model::{HashError, ModelError, QaStateId};
use std::path::PathBuf;

/// Errors raised by progress, status and refresh operations
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// Scenario governs no attributes; a percentage would be meaningless
    #[error("the scenario '{scenario}' has no associated validation rules")]
    NoAssociatedRules { scenario: String },

    /// Memoized invalid count requested outside a refresh pass
    #[error("execution key not initialized: reset it before reading memoized invalid counts")]
    ExecutionKeyNotInitialized,

    /// The gateway rejected a QA state write
    #[error("could not save qa state{}: {reason}", .id.map(|id| format!(" {id}")).unwrap_or_default())]
    StateSave {
        id: Option<QaStateId>,
        reason: String,
    },

    /// Scenario not declared for the item type
    #[error("unknown scenario: '{0}'")]
    UnknownScenario(String),

    /// Status not declared for the item type
    #[error("unknown status: '{0}'")]
    UnknownStatus(String),

    /// Manual flag not declared for the item type
    #[error("unknown manual flag: '{0}'")]
    UnknownFlag(String),

    /// Attribute is not part of the QA process
    #[error("attribute is not a qa attribute: '{0}'")]
    UnknownAttribute(String),

    /// Persistence backend failure
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Model construction or hashing failure
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl QaError {
    /// Create state save error
    pub fn state_save(id: Option<QaStateId>, reason: impl Into<String>) -> Self {
        Self::StateSave {
            id,
            reason: reason.into(),
        }
    }

    /// True when the caller has to fix item-type configuration or input names
    #[must_use]
    pub fn requires_configuration_fix(&self) -> bool {
        matches!(
            self,
            Self::NoAssociatedRules { .. }
                | Self::UnknownScenario(_)
                | Self::UnknownStatus(_)
                | Self::UnknownFlag(_)
                | Self::UnknownAttribute(_)
        )
    }
}

impl From<HashError> for QaError {
    fn from(err: HashError) -> Self {
        Self::Model(ModelError::Hash(err))
    }
}

/// Errors from QA state persistence
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No state stored under this id
    #[error("qa state not found: {0}")]
    NotFound(QaStateId),

    /// Backend-specific failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl GatewayError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while loading QA configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid YAML
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid TOML
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Extension is neither YAML nor TOML
    #[error("unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    /// Pattern check does not compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// No item type registered under this name
    #[error("unknown item type: '{0}'")]
    UnknownItemType(String),

    /// Semantic validation failed
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Status catalog rejected
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Result type alias for engine operations
pub type QaResult<T> = Result<T, QaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rules_display() {
        let err = QaError::NoAssociatedRules {
            scenario: "draft".into(),
        };
        assert_eq!(
            err.to_string(),
            "the scenario 'draft' has no associated validation rules"
        );
        assert!(err.requires_configuration_fix());
    }

    #[test]
    fn state_save_display() {
        let err = QaError::state_save(Some(QaStateId(9)), "constraint violation");
        assert_eq!(err.to_string(), "could not save qa state 9: constraint violation");
        let err = QaError::state_save(None, "rejected");
        assert_eq!(err.to_string(), "could not save qa state: rejected");
        assert!(!err.requires_configuration_fix());
    }

    #[test]
    fn error_conversions() {
        let err: QaError = GatewayError::NotFound(QaStateId(1)).into();
        assert!(matches!(err, QaError::Gateway(GatewayError::NotFound(_))));

        let err: QaError = ModelError::DuplicateStatus("draft".into()).into();
        assert!(matches!(err, QaError::Model(_)));
    }
}
