//! `unique {column | columns}`: rows whose key occurs more than once fail.

use contracts_core::ContractError;

use super::{Rule, RuleConfig, describe_columns};
use crate::predicate::{Condition, Predicate};
use crate::registry::{ParamSpec, RuleDefinition};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("column", "Single key column"),
    ParamSpec::optional("columns", "Composite key columns"),
];

pub(super) fn definition() -> RuleDefinition {
    RuleDefinition::new(
        "unique",
        "No two rows share a key; rows with a null key part are ignored",
        PARAMS,
        build,
    )
}

fn build(config: &RuleConfig) -> Result<Box<dyn Rule>, ContractError> {
    let columns = match (
        config.optional_str("column")?,
        config.optional_str_list("columns")?,
    ) {
        (Some(column), None) => vec![column],
        (None, Some(columns)) => columns,
        (Some(_), Some(_)) => {
            return Err(ContractError::invalid_param(
                &config.id,
                "columns",
                "set either 'column' or 'columns', not both",
            ));
        }
        (None, None) => return Err(config.missing("column")),
    };
    Ok(Box::new(UniqueRule::new(&config.id, columns)))
}

/// Fails every member of a duplicate group.
#[derive(Debug, Clone)]
pub struct UniqueRule {
    id: String,
    columns: Vec<String>,
}

impl UniqueRule {
    /// Creates a uniqueness rule over one or more key columns.
    pub fn new(id: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            columns,
        }
    }
}

impl Rule for UniqueRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "unique"
    }

    fn required_columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn compile_predicate(&self) -> Option<Predicate> {
        Some(Predicate::new(
            &self.id,
            Condition::Duplicated {
                columns: self.columns.clone(),
            },
            format!("row(s) with duplicate {}", describe_columns(&self.columns)),
        ))
    }
}
