//! Dialect-aware SQL generation for pushdown.

mod compiler;
mod dialect;

pub use compiler::*;
pub use dialect::*;

use contracts_core::Dialect;
use thiserror::Error;

/// A predicate has no rendering for a dialect.
///
/// This is a capability gap detected at planning time: the rule is evaluated
/// locally instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Dialect has no regex operator
    #[error("{0} has no regular expression operator")]
    RegexUnsupported(Dialect),

    /// NaN or infinite float literal
    #[error("Non-finite float literal {0} cannot be rendered as SQL")]
    NonFiniteLiteral(f64),

    /// Empty value list in an IN predicate
    #[error("Empty value list for column '{0}'")]
    EmptyValueList(String),
}
