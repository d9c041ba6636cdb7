//! `allowed_values {column, values, allow_null}`: values outside the set fail.

use contracts_core::ContractError;

use super::{Rule, RuleConfig};
use crate::predicate::{Condition, Literal, Predicate};
use crate::registry::{ParamSpec, RuleDefinition};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("column", "Column to check"),
    ParamSpec::required("values", "Allowed values"),
    ParamSpec::optional("allow_null", "Accept null values (default false)"),
];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new(
        "allowed_values",
        "Every value belongs to a fixed set; null fails unless allowed",
        PARAMS,
        build,
    )
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    Ok(Box::new(AllowedValuesRule {
        id: config.id.clone(),
        column: config.required_str("column")?,
        values: config.required_literal_list("values")?,
        allow_null: config.optional_bool("allow_null", false)?,
    }))
}

/// Fails values outside an allowed set. An unknown value is not an allowed
/// value, so nulls fail unless `allow_null` is set.
#[derive(Debug, Clone)]
pub struct AllowedValuesRule {
    id: String,
    column: String,
    values: Vec<Literal>,
    allow_null: bool,
}

impl AllowedValuesRule {
    /// Creates an allowed-values rule that rejects nulls.
    pub fn new(id: impl Into<String>, column: impl Into<String>, values: Vec<Literal>) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
            values,
            allow_null: false,
        }
    }

    /// Accepts null values.
    pub fn allow_null(mut self, allow: bool) -> Self {
        self.allow_null = allow;
        self
    }
}

impl Rule for AllowedValuesRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "allowed_values"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn compile_predicate(&self) -> Option<Predicate> {
        let not_in = Condition::NotIn {
            column: self.column.clone(),
            values: self.values.clone(),
        };
        let condition = if self.allow_null {
            not_in
        } else {
            Condition::Or(vec![Condition::IsNull(self.column.clone()), not_in])
        };
        let allowed = self
            .values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Some(Predicate::new(
            &self.id,
            condition,
            format!("row(s) in '{}' outside [{}]", self.column, allowed),
        ))
    }
}
