//! `not_null {column}`: rows with a null value fail.

use contracts_core::ContractError;

use super::{Rule, RuleConfig};
use crate::predicate::{Condition, Predicate};
use crate::registry::{ParamSpec, RuleDefinition};

const PARAMS: &[ParamSpec] = &[ParamSpec::required("column", "Column that must not be null")];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new("not_null", "Every value of a column is present", PARAMS, build)
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    Ok(Box::new(NotNullRule::new(
        &config.id,
        config.required_str("column")?,
    )))
}

/// Fails every row whose column value is null.
#[derive(Debug, Clone)]
pub struct NotNullRule {
    id: String,
    column: String,
}

impl NotNullRule {
    /// Creates a not-null rule.
    pub fn new(id: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
        }
    }
}

impl Rule for NotNullRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "not_null"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn compile_predicate(&self) -> Option<Predicate> {
        Some(Predicate::new(
            &self.id,
            Condition::IsNull(self.column.clone()),
            format!("row(s) with null '{}'", self.column),
        ))
    }
}
