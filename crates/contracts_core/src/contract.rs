//! Data contract types and structures.
//!
//! A contract is an ordered list of rule configurations bound to a dataset
//! address, plus the execution options that steer how the rules are run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// A data contract: an ordered set of configured rules and execution options.
///
/// # Example
///
/// ```rust
/// use contracts_core::{Contract, ExecutionOptions, RuleSpec};
///
/// let contract = Contract {
///     version: "1.0.0".to_string(),
///     name: "users".to_string(),
///     owner: Some("analytics-team".to_string()),
///     description: None,
///     dataset: Some("data/users.csv".to_string()),
///     options: ExecutionOptions::default(),
///     rules: vec![RuleSpec::new("not_null").param("column", "email")],
/// };
/// assert_eq!(contract.rule_ids().unwrap(), vec!["not_null_1".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contract {
    /// Semantic version of the contract (e.g., "1.0.0")
    #[serde(default = "default_version")]
    pub version: String,

    /// Unique name identifying this contract
    pub name: String,

    /// Team or individual responsible for this contract
    #[serde(default)]
    pub owner: Option<String>,

    /// Human-readable description of the dataset
    #[serde(default)]
    pub description: Option<String>,

    /// Dataset address (e.g. `data/users.csv`, `sqlite://app.db?table=users`)
    #[serde(default)]
    pub dataset: Option<String>,

    /// Execution options
    #[serde(default)]
    pub options: ExecutionOptions,

    /// Rules, in evaluation and reporting order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Contract {
    /// Returns the effective identifier of every rule, in contract order.
    ///
    /// Fails if two rules resolve to the same identifier.
    pub fn rule_ids(&self) -> Result<Vec<String>, ContractError> {
        let mut ids: Vec<String> = Vec::with_capacity(self.rules.len());
        for (position, rule) in self.rules.iter().enumerate() {
            let id = rule.effective_id(position);
            if ids.contains(&id) {
                return Err(ContractError::DuplicateRuleId(id));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Configuration of a single rule inside a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    /// Optional explicit identifier; defaults to `<kind>_<position>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Rule kind, resolved through the rule registry
    pub kind: String,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl RuleSpec {
    /// Creates a rule configuration of the given kind with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Sets an explicit rule identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Identifier used in results: the explicit id, or `<kind>_<position + 1>`.
    pub fn effective_id(&self, position: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}_{}", self.kind, position + 1),
        }
    }
}

/// Execution options carried by a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionOptions {
    /// Pushdown mode
    #[serde(default)]
    pub pushdown: PushdownMode,

    /// Stats verbosity
    #[serde(default)]
    pub stats: StatsVerbosity,

    /// Maximum number of failing rows sampled per rule (0 disables sampling)
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// SQL dialect override for SQL-backed sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    /// Run deadline in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

fn default_sample_size() -> usize {
    5
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            pushdown: PushdownMode::default(),
            stats: StatsVerbosity::default(),
            sample_size: default_sample_size(),
            dialect: None,
            timeout_ms: None,
        }
    }
}

/// Whether rules may be executed as SQL against the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushdownMode {
    /// Push down rules with a compiled predicate when the source speaks SQL
    #[default]
    Auto,
    /// Push down every capable rule; fail the run if the source is not SQL-backed
    Force,
    /// Evaluate every rule locally
    Off,
}

impl FromStr for PushdownMode {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "force" => Ok(Self::Force),
            "off" => Ok(Self::Off),
            other => Err(ContractError::InvalidOption(format!(
                "unknown pushdown mode '{}' (expected auto, force or off)",
                other
            ))),
        }
    }
}

impl fmt::Display for PushdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::Force => "force",
            Self::Off => "off",
        };
        f.write_str(s)
    }
}

/// How much run statistics detail to include in results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsVerbosity {
    /// Counts and total duration only
    #[default]
    Summary,
    /// Column lists, per-rule routes, phase timings and I/O diagnostics
    Full,
}

impl FromStr for StatsVerbosity {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "full" => Ok(Self::Full),
            other => Err(ContractError::InvalidOption(format!(
                "unknown stats verbosity '{}' (expected summary or full)",
                other
            ))),
        }
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    Mysql,
    /// SQLite
    Sqlite,
    /// Apache DataFusion
    Datafusion,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 4] = [
        Dialect::Postgres,
        Dialect::Mysql,
        Dialect::Sqlite,
        Dialect::Datafusion,
    ];

    /// Lowercase dialect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Datafusion => "datafusion",
        }
    }
}

impl FromStr for Dialect {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "sqlite" => Ok(Dialect::Sqlite),
            "datafusion" => Ok(Dialect::Datafusion),
            other => Err(ContractError::UnknownDialect(other.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
