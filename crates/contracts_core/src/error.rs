//! Error types for data contracts.
//!
//! Contract errors are raised while a contract is loaded and compiled against
//! the rule registry, before any data source is touched.

use thiserror::Error;

/// Result type for data contract operations.
pub type Result<T> = std::result::Result<T, ContractError>;

/// Main error type for contract loading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractError {
    /// Rule kind is not registered
    #[error("Unknown rule kind '{kind}' (rule '{rule}')")]
    UnknownRuleKind {
        /// Rule identifier
        rule: String,
        /// Requested kind
        kind: String,
    },

    /// Parameter key not declared by the rule kind
    #[error("Unknown parameter '{param}' for rule '{rule}' of kind '{kind}'")]
    UnknownParameter {
        /// Rule identifier
        rule: String,
        /// Rule kind
        kind: String,
        /// Offending parameter
        param: String,
    },

    /// Required parameter not provided
    #[error("Missing required parameter '{param}' for rule '{rule}' of kind '{kind}'")]
    MissingParameter {
        /// Rule identifier
        rule: String,
        /// Rule kind
        kind: String,
        /// Missing parameter
        param: String,
    },

    /// Parameter present but malformed
    #[error("Invalid parameter '{param}' for rule '{rule}': {message}")]
    InvalidParameter {
        /// Rule identifier
        rule: String,
        /// Offending parameter
        param: String,
        /// Description of the problem
        message: String,
    },

    /// Two rules share one identifier
    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),

    /// SQL dialect not supported
    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Invalid execution option
    #[error("Invalid execution option: {0}")]
    InvalidOption(String),

    /// Rule kind registered twice with different constructors
    #[error("Rule kind '{0}' is already registered with a different constructor")]
    ConflictingRegistration(String),

    /// Contract has no dataset address and none was supplied
    #[error("No dataset address: set `dataset` in the contract or pass one explicitly")]
    MissingDataset,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(
        rule: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            rule: rule.into(),
            param: param.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_kind() {
        let err = ContractError::UnknownRuleKind {
            rule: "r1".to_string(),
            kind: "no_such_rule".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown rule kind 'no_such_rule' (rule 'r1')"
        );
    }

    #[test]
    fn test_invalid_param_helper() {
        let err = ContractError::invalid_param("r1", "min", "expected an integer");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'min' for rule 'r1': expected an integer"
        );
    }
}
