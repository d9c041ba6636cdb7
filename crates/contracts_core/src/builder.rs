//! Builder pattern for creating data contracts.
//!
//! This module provides an ergonomic builder for constructing contracts
//! with a fluent API, including shorthands for the built-in rule kinds.

use crate::{Contract, Dialect, ExecutionOptions, PushdownMode, RuleSpec, StatsVerbosity};

/// Builder for creating a `Contract`.
///
/// # Example
///
/// ```rust
/// use contracts_core::{ContractBuilder, PushdownMode};
///
/// let contract = ContractBuilder::new("users")
///     .owner("analytics-team")
///     .dataset("data/users.csv")
///     .pushdown(PushdownMode::Off)
///     .not_null("email")
///     .unique("user_id")
///     .min_rows(100)
///     .build();
///
/// assert_eq!(contract.rules.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct ContractBuilder {
    name: String,
    owner: Option<String>,
    version: Option<String>,
    description: Option<String>,
    dataset: Option<String>,
    options: ExecutionOptions,
    rules: Vec<RuleSpec>,
}

impl ContractBuilder {
    /// Creates a new contract builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the contract owner.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the contract version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the contract description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the dataset address.
    pub fn dataset(mut self, address: impl Into<String>) -> Self {
        self.dataset = Some(address.into());
        self
    }

    /// Sets the pushdown mode.
    pub fn pushdown(mut self, mode: PushdownMode) -> Self {
        self.options.pushdown = mode;
        self
    }

    /// Sets the stats verbosity.
    pub fn stats(mut self, stats: StatsVerbosity) -> Self {
        self.options.stats = stats;
        self
    }

    /// Sets the per-rule sample size (0 disables sampling).
    pub fn sample_size(mut self, size: usize) -> Self {
        self.options.sample_size = size;
        self
    }

    /// Overrides the SQL dialect used for pushdown.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.options.dialect = Some(dialect);
        self
    }

    /// Sets the run deadline in milliseconds.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Adds a rule.
    pub fn rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds a `not_null` rule.
    pub fn not_null(self, column: impl Into<String>) -> Self {
        self.rule(RuleSpec::new("not_null").param("column", String::from(column.into())))
    }

    /// Adds a `unique` rule on a single column.
    pub fn unique(self, column: impl Into<String>) -> Self {
        self.rule(RuleSpec::new("unique").param("column", String::from(column.into())))
    }

    /// Adds an `allowed_values` rule.
    pub fn allowed_values<V>(self, column: impl Into<String>, values: Vec<V>) -> Self
    where
        V: Into<serde_json::Value>,
    {
        let values: Vec<serde_json::Value> = values.into_iter().map(Into::into).collect();
        self.rule(
            RuleSpec::new("allowed_values")
                .param("column", String::from(column.into()))
                .param("values", values),
        )
    }

    /// Adds a `min_rows` rule.
    pub fn min_rows(self, min: u64) -> Self {
        self.rule(RuleSpec::new("min_rows").param("min", min))
    }

    /// Adds a `max_rows` rule.
    pub fn max_rows(self, max: u64) -> Self {
        self.rule(RuleSpec::new("max_rows").param("max", max))
    }

    /// Builds the contract.
    pub fn build(self) -> Contract {
        Contract {
            version: self.version.unwrap_or_else(|| "1.0.0".to_string()),
            name: self.name,
            owner: self.owner,
            description: self.description,
            dataset: self.dataset,
            options: self.options,
            rules: self.rules,
        }
    }
}
