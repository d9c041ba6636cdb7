//! Error types for validation operations.
//!
//! Three layers of failure are distinguished:
//!
//! - [`ValidationError`]: one rule could not be evaluated. Isolated to that
//!   rule's result; sibling rules keep running.
//! - [`SourceError`]: the dataset could not be resolved, opened or read.
//!   Terminal for the run.
//! - [`RunError`]: what a run entry point returns instead of a report.

use contracts_core::{ContractError, RuleError, RuleErrorKind, RuleResult};
use thiserror::Error;

use crate::sql::CompileError;

/// Errors that can occur while evaluating a single rule.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// Referenced column is absent from the table or source
    #[error("Column '{0}' not found in source")]
    MissingColumn(String),

    /// Column values cannot be compared with the rule's operand
    #[error("Type mismatch for column '{column}': expected {expected}, found {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// Arrow type with no value mapping
    #[error("Unsupported data type for column '{column}': {data_type}")]
    UnsupportedType { column: String, data_type: String },

    /// Predicate cannot be rendered as SQL
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Pushdown query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Generic evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl ValidationError {
    /// Creates a new missing column error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn(column.into())
    }

    /// Creates a new type mismatch error.
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new unsupported type error.
    pub fn unsupported_type(column: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self::UnsupportedType {
            column: column.into(),
            data_type: data_type.into(),
        }
    }

    /// Creates a new generic evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation(message.into())
    }

    /// Converts this error into the error attached to a failed rule result.
    pub fn to_rule_error(&self) -> RuleError {
        let kind = match self {
            ValidationError::MissingColumn(_) => RuleErrorKind::MissingColumn,
            _ => RuleErrorKind::Evaluation,
        };
        RuleError::new(kind, self.to_string())
    }
}

impl From<SourceError> for ValidationError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::MissingColumn(column) => ValidationError::MissingColumn(column),
            other => ValidationError::Query(other.to_string()),
        }
    }
}

/// Errors raised by connectors and materializers.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// No connector handles the address scheme
    #[error("No connector registered for scheme '{0}'")]
    UnknownScheme(String),

    /// Address could not be parsed
    #[error("Invalid dataset address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    /// Dataset does not exist
    #[error("Dataset not found: {0}")]
    NotFound(String),

    /// Connection or authentication failed
    #[error("Failed to connect to source: {0}")]
    Connection(String),

    /// Requested column is absent
    #[error("Column '{0}' not found in source")]
    MissingColumn(String),

    /// File format not recognized
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Reading data failed
    #[error("Failed to read data: {0}")]
    Read(String),

    /// SQL query failed
    #[error("Query failed: {0}")]
    Query(String),
}

impl SourceError {
    /// Creates a new invalid address error.
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }
}

impl From<datafusion::error::DataFusionError> for SourceError {
    fn from(err: datafusion::error::DataFusionError) -> Self {
        SourceError::Read(err.to_string())
    }
}

impl From<arrow_schema::ArrowError> for SourceError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        SourceError::Read(err.to_string())
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(err: rusqlite::Error) -> Self {
        SourceError::Query(err.to_string())
    }
}

impl From<tokio_postgres::Error> for SourceError {
    fn from(err: tokio_postgres::Error) -> Self {
        SourceError::Query(err.to_string())
    }
}

impl From<ValidationError> for SourceError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingColumn(column) => SourceError::MissingColumn(column),
            other => SourceError::Read(other.to_string()),
        }
    }
}

/// Errors that abort a contract run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Contract failed to load or compile; no I/O was performed
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// Source could not be resolved or read
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// `force` pushdown requested on a source that does not speak SQL
    #[error("Pushdown mode 'force' requires a SQL-backed source, but '{0}' is not")]
    PushdownUnavailable(String),

    /// Run was cancelled by the caller
    #[error("Run cancelled after {} of {total} rules completed", .partial.len())]
    Cancelled {
        /// Results completed before cancellation, in contract order
        partial: Vec<RuleResult>,
        /// Number of rules in the contract
        total: usize,
    },

    /// Run exceeded its deadline
    #[error("Run timed out after {timeout_ms}ms with {} of {total} rules completed", .partial.len())]
    TimedOut {
        /// Results completed before the deadline, in contract order
        partial: Vec<RuleResult>,
        /// Number of rules in the contract
        total: usize,
        /// Deadline in milliseconds
        timeout_ms: u64,
    },
}

impl RunError {
    /// Results completed before an interrupted run stopped.
    pub fn partial_results(&self) -> &[RuleResult] {
        match self {
            RunError::Cancelled { partial, .. } | RunError::TimedOut { partial, .. } => partial,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_maps_to_rule_error_kind() {
        let err = ValidationError::missing_column("email");
        let rule_error = err.to_rule_error();
        assert_eq!(rule_error.kind, RuleErrorKind::MissingColumn);
        assert_eq!(rule_error.message, "Column 'email' not found in source");

        let err = ValidationError::type_mismatch("age", "number", "string");
        assert_eq!(err.to_rule_error().kind, RuleErrorKind::Evaluation);
    }

    #[test]
    fn test_source_missing_column_round_trips() {
        let err: ValidationError = SourceError::MissingColumn("id".to_string()).into();
        assert!(matches!(err, ValidationError::MissingColumn(c) if c == "id"));
    }

    #[test]
    fn test_run_error_display() {
        let err = RunError::Cancelled {
            partial: vec![RuleResult::from_count("a", "not_null", 0, "ok")],
            total: 3,
        };
        assert_eq!(err.to_string(), "Run cancelled after 1 of 3 rules completed");
        assert_eq!(err.partial_results().len(), 1);
    }
}
