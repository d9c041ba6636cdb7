//! Rule model and built-in rule kinds.
//!
//! A [`Rule`] is a configured validation unit. Row-level rules compile to a
//! [`Predicate`] and can be pushed down to SQL; whole-dataset rules only
//! evaluate locally.

mod aggregate;
mod allowed_values;
mod not_null;
mod pattern;
mod range;
mod row_count;
mod unique;

pub use aggregate::{AggregateFunction, AggregateRule, NullPolicy};
pub use allowed_values::AllowedValuesRule;
pub use not_null::NotNullRule;
pub use pattern::PatternRule;
pub use range::RangeRule;
pub use row_count::{MaxRowsRule, MinRowsRule};
pub use unique::UniqueRule;

use contracts_core::{ContractError, RuleResult, SampleRow};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::predicate::Literal;
use crate::registry::RuleDefinition;
use crate::{Predicate, Table, ValidationError};

/// A configured, named validation unit.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Rule identifier, unique within a contract.
    fn id(&self) -> &str;

    /// Rule kind, as registered.
    fn kind(&self) -> &str;

    /// Columns the rule reads.
    fn required_columns(&self) -> Vec<String>;

    /// Row-level failure predicate, or `None` for whole-dataset rules.
    fn compile_predicate(&self) -> Option<Predicate> {
        None
    }

    /// Evaluates the rule over a materialized table.
    ///
    /// Row-level rules get this for free from their predicate; failing rows
    /// are sampled by ascending position.
    fn evaluate_local(&self, table: &Table, sample_size: usize) -> Result<RuleResult, ValidationError> {
        match self.compile_predicate() {
            Some(predicate) => evaluate_predicate(self.kind(), &predicate, table, sample_size),
            None => Err(ValidationError::evaluation(format!(
                "rule kind '{}' has no local evaluation",
                self.kind()
            ))),
        }
    }
}

/// Evaluates a predicate over a table and builds the rule result.
pub fn evaluate_predicate(
    kind: &str,
    predicate: &Predicate,
    table: &Table,
    sample_size: usize,
) -> Result<RuleResult, ValidationError> {
    let failing = predicate.failing_rows(table)?;
    let count = failing.len() as u64;
    let sample = failing
        .iter()
        .take(sample_size)
        .map(|&row| {
            Ok(SampleRow {
                row: Some(row as u64),
                values: table.row_values(row, &predicate.columns)?,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    Ok(
        RuleResult::from_count(&predicate.rule_id, kind, count, predicate.describe(count))
            .with_sample(sample),
    )
}

/// Built-in rule kinds.
pub fn builtin_definitions() -> Vec<RuleDefinition> {
    vec![
        not_null::definition(),
        unique::definition(),
        allowed_values::definition(),
        range::definition(),
        pattern::definition(),
        row_count::min_rows_definition(),
        row_count::max_rows_definition(),
        aggregate::definition(),
    ]
}

/// A rule's identifier, kind and parameters, as handed to a constructor.
///
/// Parameter names have already been checked against the kind's declared
/// parameters; the typed accessors check values.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    /// Effective rule identifier
    pub id: String,
    /// Rule kind
    pub kind: String,
    /// Parameters
    pub params: BTreeMap<String, Value>,
}

impl RuleConfig {
    /// Creates a rule configuration.
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        params: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            params,
        }
    }

    fn invalid(&self, param: &str, message: impl Into<String>) -> ContractError {
        ContractError::invalid_param(&self.id, param, message)
    }

    /// Error for an absent required parameter.
    pub fn missing(&self, param: &str) -> ContractError {
        ContractError::MissingParameter {
            rule: self.id.clone(),
            kind: self.kind.clone(),
            param: param.to_string(),
        }
    }

    /// Returns true if the parameter is present and not null.
    pub fn has(&self, param: &str) -> bool {
        self.params.get(param).is_some_and(|v| !v.is_null())
    }

    /// Optional string parameter.
    pub fn optional_str(&self, param: &str) -> Result<Option<String>, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(param, "expected a non-empty string")),
        }
    }

    /// Required string parameter.
    pub fn required_str(&self, param: &str) -> Result<String, ContractError> {
        self.optional_str(param)?.ok_or_else(|| self.missing(param))
    }

    /// Optional non-empty list of strings.
    pub fn optional_str_list(&self, param: &str) -> Result<Option<Vec<String>>, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    Value::String(s) if !s.is_empty() => Ok(s.clone()),
                    _ => Err(self.invalid(param, "expected a list of column names")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(self.invalid(param, "expected a non-empty list of column names")),
        }
    }

    /// Required non-negative integer parameter.
    pub fn required_u64(&self, param: &str) -> Result<u64, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Err(self.missing(param)),
            Some(value) => value
                .as_u64()
                .ok_or_else(|| self.invalid(param, "expected a non-negative integer")),
        }
    }

    /// Optional boolean parameter.
    pub fn optional_bool(&self, param: &str, default: bool) -> Result<bool, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.invalid(param, "expected a boolean")),
        }
    }

    /// Optional number parameter.
    pub fn optional_f64(&self, param: &str) -> Result<Option<f64>, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Some)
                .ok_or_else(|| self.invalid(param, "expected a finite number")),
        }
    }

    /// Optional scalar literal (string, number or boolean).
    pub fn optional_literal(&self, param: &str) -> Result<Option<Literal>, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match Literal::from_json(value) {
                Some(Literal::Float(f)) if !f.is_finite() => {
                    Err(self.invalid(param, "expected a finite number"))
                }
                Some(literal) => Ok(Some(literal)),
                None => Err(self.invalid(param, "expected a string, number or boolean")),
            },
        }
    }

    /// Required non-empty list of scalar literals.
    pub fn required_literal_list(&self, param: &str) -> Result<Vec<Literal>, ContractError> {
        match self.params.get(param) {
            None | Some(Value::Null) => Err(self.missing(param)),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| {
                    Literal::from_json(item).ok_or_else(|| {
                        self.invalid(param, "list items must be strings, numbers or booleans")
                    })
                })
                .collect(),
            Some(_) => Err(self.invalid(param, "expected a non-empty list")),
        }
    }

    /// Required string parameter restricted to a set of choices.
    pub fn required_choice(&self, param: &str, choices: &[&str]) -> Result<String, ContractError> {
        let value = self.required_str(param)?;
        if choices.contains(&value.as_str()) {
            Ok(value)
        } else {
            Err(self.invalid(
                param,
                format!("expected one of {}, got '{}'", choices.join(", "), value),
            ))
        }
    }
}

/// Renders a column key for messages: `'a'` or `('a', 'b')`.
pub(crate) fn describe_columns(columns: &[String]) -> String {
    match columns {
        [single] => format!("'{}'", single),
        many => format!(
            "({})",
            many.iter()
                .map(|c| format!("'{}'", c))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(params: Value) -> RuleConfig {
        let params = params
            .as_object()
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default();
        RuleConfig::new("r1", "test", params)
    }

    #[test]
    fn test_required_str() {
        assert_eq!(
            config(json!({"column": "email"})).required_str("column").unwrap(),
            "email"
        );
        assert!(matches!(
            config(json!({})).required_str("column"),
            Err(ContractError::MissingParameter { param, .. }) if param == "column"
        ));
        assert!(matches!(
            config(json!({"column": 3})).required_str("column"),
            Err(ContractError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_required_u64_rejects_negative() {
        assert_eq!(config(json!({"min": 10})).required_u64("min").unwrap(), 10);
        assert!(config(json!({"min": -1})).required_u64("min").is_err());
        assert!(config(json!({"min": "10"})).required_u64("min").is_err());
    }

    #[test]
    fn test_literal_list() {
        let values = config(json!({"values": ["a", 1, true]}))
            .required_literal_list("values")
            .unwrap();
        assert_eq!(
            values,
            vec![Literal::Str("a".into()), Literal::Int(1), Literal::Bool(true)]
        );
        assert!(
            config(json!({"values": []}))
                .required_literal_list("values")
                .is_err()
        );
        assert!(
            config(json!({"values": [[1]]}))
                .required_literal_list("values")
                .is_err()
        );
    }

    #[test]
    fn test_required_choice() {
        let cfg = config(json!({"nulls": "skip"}));
        assert_eq!(cfg.required_choice("nulls", &["skip", "zero"]).unwrap(), "skip");
        let cfg = config(json!({"nulls": "drop"}));
        assert!(cfg.required_choice("nulls", &["skip", "zero"]).is_err());
    }

    #[test]
    fn test_describe_columns() {
        assert_eq!(describe_columns(&["id".to_string()]), "'id'");
        assert_eq!(
            describe_columns(&["a".to_string(), "b".to_string()]),
            "('a', 'b')"
        );
    }
}
