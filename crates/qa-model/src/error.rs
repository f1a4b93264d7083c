//! Errors raised while building model values

use crate::hash::HashError;

/// Model construction and hashing errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Two statuses share a name
    #[error("duplicate status: '{0}'")]
    DuplicateStatus(String),

    /// Two scenarios share a name
    #[error("duplicate scenario: '{0}'")]
    DuplicateScenario(String),

    /// A status requires a scenario the item type does not declare
    #[error("status '{status}' requires undeclared scenario '{scenario}'")]
    UndeclaredScenario { status: String, scenario: String },

    /// Attribute content could not be hashed
    #[error("attribute hash failed: {0}")]
    Hash(#[from] HashError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::UndeclaredScenario {
            status: "public".into(),
            scenario: "publishable".into(),
        };
        assert_eq!(
            err.to_string(),
            "status 'public' requires undeclared scenario 'publishable'"
        );
    }
}
