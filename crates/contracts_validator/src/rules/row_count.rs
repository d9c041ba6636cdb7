//! `min_rows {min}` and `max_rows {max}`: whole-dataset row-count bounds.
//!
//! Neither compiles to a predicate; both evaluate on the materialized table,
//! which may have no columns at all.

use contracts_core::{ContractError, RuleResult};

use super::{Rule, RuleConfig};
use crate::registry::{ParamSpec, RuleDefinition};
use crate::{Table, ValidationError};

const MIN_PARAMS: &[ParamSpec] = &[ParamSpec::required("min", "Minimum number of rows")];
const MAX_PARAMS: &[ParamSpec] = &[ParamSpec::required("max", "Maximum number of rows")];

pub(super) fn min_rows_definition() -> RuleDefinition {
    RuleDefinition::new(
        "min_rows",
        "The dataset has at least `min` rows",
        MIN_PARAMS,
        build_min,
    )
}

pub(super) fn max_rows_definition() -> RuleDefinition {
    RuleDefinition::new(
        "max_rows",
        "The dataset has at most `max` rows",
        MAX_PARAMS,
        build_max,
    )
}

fn build_min(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    Ok(Box::new(MinRowsRule::new(&config.id, config.required_u64("min")?)))
}

fn build_max(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    Ok(Box::new(MaxRowsRule::new(&config.id, config.required_u64("max")?)))
}

/// Fails when the dataset has fewer than `min` rows.
///
/// The failing count is the shortfall.
#[derive(Debug, Clone)]
pub struct MinRowsRule {
    id: String,
    min: u64,
}

impl MinRowsRule {
    /// Creates a minimum row-count rule.
    pub fn new(id: impl Into<String>, min: u64) -> Self {
        Self { id: id.into(), min }
    }
}

impl Rule for MinRowsRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "min_rows"
    }

    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn evaluate_local(&self, table: &Table, _sample_size: usize) -> Result<RuleResult, ValidationError> {
        let rows = table.num_rows() as u64;
        Ok(RuleResult::from_count(
            &self.id,
            self.kind(),
            self.min.saturating_sub(rows),
            format!("{} row(s), minimum {}", rows, self.min),
        ))
    }
}

/// Fails when the dataset has more than `max` rows.
///
/// The failing count is the excess.
#[derive(Debug, Clone)]
pub struct MaxRowsRule {
    id: String,
    max: u64,
}

impl MaxRowsRule {
    /// Creates a maximum row-count rule.
    pub fn new(id: impl Into<String>, max: u64) -> Self {
        Self { id: id.into(), max }
    }
}

impl Rule for MaxRowsRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "max_rows"
    }

    fn required_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn evaluate_local(&self, table: &Table, _sample_size: usize) -> Result<RuleResult, ValidationError> {
        let rows = table.num_rows() as u64;
        Ok(RuleResult::from_count(
            &self.id,
            self.kind(),
            rows.saturating_sub(self.max),
            format!("{} row(s), maximum {}", rows, self.max),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_min_rows() {
        let table = Table::with_row_count(150).unwrap();
        let pass = MinRowsRule::new("m", 100).evaluate_local(&table, 5).unwrap();
        assert!(pass.passed);
        assert_eq!(pass.failing_count, Some(0));
        assert_eq!(pass.message, "150 row(s), minimum 100");

        let fail = MinRowsRule::new("m", 200).evaluate_local(&table, 5).unwrap();
        assert!(!fail.passed);
        assert_eq!(fail.failing_count, Some(50));
    }

    #[test]
    fn test_max_rows() {
        let table = Table::with_row_count(150).unwrap();
        let fail = MaxRowsRule::new("m", 100).evaluate_local(&table, 5).unwrap();
        assert_eq!(fail.failing_count, Some(50));
        assert!(MaxRowsRule::new("m", 150).evaluate_local(&table, 5).unwrap().passed);
    }

    #[test]
    fn test_row_count_rules_have_no_predicate() {
        assert!(MinRowsRule::new("m", 1).compile_predicate().is_none());
        assert!(MaxRowsRule::new("m", 1).required_columns().is_empty());
    }
}
