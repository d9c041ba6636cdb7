//! `range {column, min, max}`: values outside inclusive bounds fail.

use contracts_core::ContractError;

use super::{Rule, RuleConfig};
use crate::predicate::{CompareOp, Condition, Literal, Predicate};
use crate::registry::{ParamSpec, RuleDefinition};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("column", "Column to check"),
    ParamSpec::optional("min", "Inclusive lower bound"),
    ParamSpec::optional("max", "Inclusive upper bound"),
];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new(
        "range",
        "Values lie within inclusive bounds; nulls pass",
        PARAMS,
        build,
    )
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    let column = config.required_str("column")?;
    let min = config.optional_literal("min")?;
    let max = config.optional_literal("max")?;

    if min.is_none() && max.is_none() {
        return Err(ContractError::invalid_param(
            &config.id,
            "min",
            "at least one of 'min' or 'max' is required",
        ));
    }
    if let (Some(lo), Some(hi)) = (&min, &max) {
        if bound_gt(lo, hi) {
            return Err(ContractError::invalid_param(
                &config.id,
                "min",
                format!("min {} is greater than max {}", lo, hi),
            ));
        }
    }

    Ok(Box::new(RangeRule {
        id: config.id.clone(),
        column,
        min,
        max,
    }))
}

fn bound_gt(lo: &Literal, hi: &Literal) -> bool {
    match (lo, hi) {
        (Literal::Int(a), Literal::Int(b)) => a > b,
        (Literal::Int(_) | Literal::Float(_), Literal::Int(_) | Literal::Float(_)) => {
            as_f64(lo) > as_f64(hi)
        }
        (Literal::Str(a), Literal::Str(b)) => a > b,
        _ => false,
    }
}

fn as_f64(literal: &Literal) -> f64 {
    match literal {
        Literal::Int(i) => *i as f64,
        Literal::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Fails values below `min` or above `max`.
#[derive(Debug, Clone)]
pub struct RangeRule {
    id: String,
    column: String,
    min: Option<Literal>,
    max: Option<Literal>,
}

impl RangeRule {
    /// Creates a range rule.
    pub fn new(
        id: impl Into<String>,
        column: impl Into<String>,
        min: Option<Literal>,
        max: Option<Literal>,
    ) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
            min,
            max,
        }
    }
}

impl Rule for RangeRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "range"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn compile_predicate(&self) -> Option<Predicate> {
        let mut parts = Vec::new();
        if let Some(min) = &self.min {
            parts.push(Condition::Compare {
                column: self.column.clone(),
                op: CompareOp::Lt,
                value: min.clone(),
            });
        }
        if let Some(max) = &self.max {
            parts.push(Condition::Compare {
                column: self.column.clone(),
                op: CompareOp::Gt,
                value: max.clone(),
            });
        }
        let condition = if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Or(parts)
        };

        let bounds = match (&self.min, &self.max) {
            (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
            (Some(lo), None) => format!(">= {}", lo),
            (None, Some(hi)) => format!("<= {}", hi),
            (None, None) => "any".to_string(),
        };

        Some(Predicate::new(
            &self.id,
            condition,
            format!("row(s) in '{}' outside {}", self.column, bounds),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataValue, Table};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_range_inclusive_bounds_and_nulls_pass() {
        let table = Table::from_columns(vec![(
            "age",
            vec![
                DataValue::Int(0),
                DataValue::Int(130),
                DataValue::Int(-1),
                DataValue::Float(130.5),
                DataValue::Null,
            ],
        )])
        .unwrap();

        let rule = RangeRule::new("age_ok", "age", Some(Literal::Int(0)), Some(Literal::Int(130)));
        let result = rule.evaluate_local(&table, 5).unwrap();
        assert_eq!(result.failing_count, Some(2));
        assert_eq!(result.message, "2 row(s) in 'age' outside [0, 130]");
    }

    #[test]
    fn test_range_requires_a_bound() {
        let config = RuleConfig::new(
            "r",
            "range",
            [("column".to_string(), json!("age"))].into_iter().collect(),
        );
        assert!(build(&config).is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let config = RuleConfig::new(
            "r",
            "range",
            [
                ("column".to_string(), json!("age")),
                ("min".to_string(), json!(10)),
                ("max".to_string(), json!(1.5)),
            ]
            .into_iter()
            .collect(),
        );
        assert!(matches!(
            build(&config),
            Err(ContractError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_open_upper_bound() {
        let rule = RangeRule::new("r", "amount", Some(Literal::Float(0.0)), None);
        let predicate = rule.compile_predicate().unwrap();
        assert_eq!(predicate.message, "row(s) in 'amount' outside >= 0");
    }
}
