//! `aggregate {column, function, min?, max?, nulls}`: bound on a column
//! aggregate.
//!
//! The null policy has no default. `skip` drops nulls before aggregating,
//! `zero` counts them as `0`.

use contracts_core::{ContractError, RuleResult};
use std::collections::HashSet;
use std::fmt;

use super::{Rule, RuleConfig};
use crate::registry::{ParamSpec, RuleDefinition};
use crate::{DataValue, Table, ValidationError};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("column", "Column to aggregate"),
    ParamSpec::required("function", "sum | avg | min | max | count_distinct"),
    ParamSpec::required("nulls", "skip | zero: how null values enter the aggregate"),
    ParamSpec::optional("min", "Inclusive lower bound on the aggregate"),
    ParamSpec::optional("max", "Inclusive upper bound on the aggregate"),
];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new(
        "aggregate",
        "A column aggregate lies within inclusive bounds",
        PARAMS,
        build,
    )
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    let column = config.required_str("column")?;
    let function = match config
        .required_choice("function", &["sum", "avg", "min", "max", "count_distinct"])?
        .as_str()
    {
        "sum" => AggregateFunction::Sum,
        "avg" => AggregateFunction::Avg,
        "min" => AggregateFunction::Min,
        "max" => AggregateFunction::Max,
        _ => AggregateFunction::CountDistinct,
    };
    let nulls = match config.required_choice("nulls", &["skip", "zero"])?.as_str() {
        "skip" => NullPolicy::Skip,
        _ => NullPolicy::Zero,
    };
    let min = config.optional_f64("min")?;
    let max = config.optional_f64("max")?;

    match (min, max) {
        (None, None) => Err(ContractError::invalid_param(
            &config.id,
            "min",
            "at least one of 'min' or 'max' is required",
        )),
        (Some(lo), Some(hi)) if lo > hi => Err(ContractError::invalid_param(
            &config.id,
            "min",
            format!("min {} is greater than max {}", lo, hi),
        )),
        _ => Ok(Box::new(AggregateRule {
            id: config.id.clone(),
            column,
            function,
            nulls,
            min,
            max,
        })),
    }
}

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    CountDistinct,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::CountDistinct => "count_distinct",
        };
        f.write_str(s)
    }
}

/// How nulls enter an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullPolicy {
    /// Nulls are excluded
    Skip,
    /// Nulls count as zero
    Zero,
}

/// Fails (count 1) when an aggregate of a column falls outside its bounds.
#[derive(Debug, Clone)]
pub struct AggregateRule {
    id: String,
    column: String,
    function: AggregateFunction,
    nulls: NullPolicy,
    min: Option<f64>,
    max: Option<f64>,
}

impl AggregateRule {
    /// Creates an aggregate rule.
    pub fn new(
        id: impl Into<String>,
        column: impl Into<String>,
        function: AggregateFunction,
        nulls: NullPolicy,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            column: column.into(),
            function,
            nulls,
            min,
            max,
        }
    }

    fn compute(&self, values: &[DataValue]) -> Result<Option<f64>, ValidationError> {
        if self.function == AggregateFunction::CountDistinct {
            let mut seen = HashSet::new();
            for value in values {
                let key = match (value.group_key(), self.nulls) {
                    (Some(key), _) => key,
                    (None, NullPolicy::Zero) => DataValue::Int(0).group_key().unwrap_or_default(),
                    (None, NullPolicy::Skip) => continue,
                };
                seen.insert(key);
            }
            return Ok(Some(seen.len() as f64));
        }

        let mut numbers = Vec::with_capacity(values.len());
        for value in values {
            match value {
                DataValue::Null => {
                    if self.nulls == NullPolicy::Zero {
                        numbers.push(0.0);
                    }
                }
                DataValue::Int(_) | DataValue::Float(_) => {
                    numbers.push(value.as_float().unwrap_or(f64::NAN));
                }
                other => {
                    return Err(ValidationError::type_mismatch(
                        &self.column,
                        "number",
                        other.type_name(),
                    ));
                }
            }
        }

        Ok(match self.function {
            AggregateFunction::Sum => Some(numbers.iter().sum()),
            AggregateFunction::Avg if numbers.is_empty() => None,
            AggregateFunction::Avg => Some(numbers.iter().sum::<f64>() / numbers.len() as f64),
            AggregateFunction::Min => numbers.iter().copied().reduce(f64::min),
            AggregateFunction::Max => numbers.iter().copied().reduce(f64::max),
            AggregateFunction::CountDistinct => None,
        })
    }

    fn bounds(&self) -> String {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
            (Some(lo), None) => format!(">= {}", lo),
            (None, Some(hi)) => format!("<= {}", hi),
            (None, None) => "any".to_string(),
        }
    }
}

impl Rule for AggregateRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "aggregate"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![self.column.clone()]
    }

    fn evaluate_local(&self, table: &Table, _sample_size: usize) -> Result<RuleResult, ValidationError> {
        let label = format!("{}({})", self.function, self.column);
        let Some(value) = self.compute(table.column(&self.column)?)? else {
            return Ok(RuleResult::from_count(
                &self.id,
                self.kind(),
                1,
                format!("{} is undefined on no values, expected {}", label, self.bounds()),
            ));
        };

        let below = self.min.is_some_and(|lo| value < lo);
        let above = self.max.is_some_and(|hi| value > hi);
        let failing = u64::from(below || above || value.is_nan());
        let message = if failing == 0 {
            format!("{} = {} within {}", label, value, self.bounds())
        } else {
            format!("{} = {} outside {}", label, value, self.bounds())
        };
        Ok(RuleResult::from_count(&self.id, self.kind(), failing, message))
    }
}
