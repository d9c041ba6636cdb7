//! `pattern {column, regex}`: non-null values not matching a regex fail.

use contracts_core::ContractError;
use regex::Regex;

use super::{Rule, RuleConfig};
use crate::predicate::{Condition, Predicate};
use crate::registry::{ParamSpec, RuleDefinition};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("column", "String column to check"),
    ParamSpec::required("regex", "Regular expression every value must match"),
];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new(
        "pattern",
        "String values match a regular expression; nulls pass",
        PARAMS,
        build,
    )
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    let column = config.required_str("column")?;
    let source = config.required_str("regex")?;
    let regex = Regex::new(&source)
        .map_err(|e| ContractError::invalid_param(&config.id, "regex", e.to_string()))?;

    Ok(Box::new(PatternRule {
        id: config.id.clone(),
        column,
        regex,
    }))
}

/// Fails string values that do not match a regular expression.
#[derive(Debug, Clone)]
pub struct PatternRule {
    id: String,
    column: String,
    regex: Regex,
}

impl PatternRule {
    /// Creates a pattern rule from a compiled regex.
    pub fn new(id: impl Into<String>, column: impl Into<String>, regex: Regex) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
            regex,
        }
    }
}

impl Rule for PatternRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "pattern"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn compile_predicate(&self) -> Option<Predicate> {
        Some(Predicate::new(
            &self.id,
            Condition::Not(Box::new(Condition::Matches {
                column: self.column.clone(),
                regex: self.regex.clone(),
            })),
            format!(
                "row(s) in '{}' not matching /{}/",
                self.column,
                self.regex.as_str()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataValue, Table, ValidationError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_pattern_skips_nulls() {
        let table = Table::from_columns(vec![(
            "email",
            vec![
                DataValue::from("a@example.com"),
                DataValue::from("not-an-email"),
                DataValue::Null,
            ],
        )])
        .unwrap();

        let rule = PatternRule::new("email_format", "email", Regex::new(r"^[^@]+@[^@]+$").unwrap());
        let result = rule.evaluate_local(&table, 5).unwrap();
        assert_eq!(result.failing_count, Some(1));
        assert_eq!(result.sample[0].values["email"], json!("not-an-email"));
    }

    #[test]
    fn test_pattern_on_numbers_is_a_type_mismatch() {
        let table = Table::from_columns(vec![("n", vec![DataValue::Int(1)])]).unwrap();
        let rule = PatternRule::new("r", "n", Regex::new("^1$").unwrap());
        assert!(matches!(
            rule.evaluate_local(&table, 5),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_regex_fails_at_load() {
        let config = RuleConfig::new(
            "r",
            "pattern",
            [
                ("column".to_string(), json!("email")),
                ("regex".to_string(), json!("([a-z")),
            ]
            .into_iter()
            .collect(),
        );
        assert!(matches!(
            build(&config),
            Err(ContractError::InvalidParameter { param, .. }) if param == "regex"
        ));
    }
}
