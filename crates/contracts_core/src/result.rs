//! Validation result types.
//!
//! A [`ValidationResult`] is the terminal artifact of a contract run. Its
//! `summary` and `results` are deterministic for a fixed input and contract;
//! `stats.run_meta` carries timings and is excluded from equality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule identifier
    pub rule_id: String,

    /// Rule kind
    pub kind: String,

    /// Whether the rule passed
    pub passed: bool,

    /// Number of failing rows; `None` when the rule could not be evaluated
    pub failing_count: Option<u64>,

    /// Human-readable outcome
    pub message: String,

    /// Why the rule could not be evaluated
    #[serde(default)]
    pub error: Option<RuleError>,

    /// Bounded, deterministically ordered sample of failing rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<SampleRow>,
}

impl RuleResult {
    /// Builds a result from a failing-row count: passes iff the count is zero.
    pub fn from_count(
        rule_id: impl Into<String>,
        kind: impl Into<String>,
        failing_count: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            kind: kind.into(),
            passed: failing_count == 0,
            failing_count: Some(failing_count),
            message: message.into(),
            error: None,
            sample: Vec::new(),
        }
    }

    /// Builds a failed result for a rule that could not be evaluated.
    pub fn errored(rule_id: impl Into<String>, kind: impl Into<String>, error: RuleError) -> Self {
        Self {
            rule_id: rule_id.into(),
            kind: kind.into(),
            passed: false,
            failing_count: None,
            message: error.message.clone(),
            error: Some(error),
            sample: Vec::new(),
        }
    }

    /// Attaches a sample of failing rows.
    pub fn with_sample(mut self, sample: Vec<SampleRow>) -> Self {
        self.sample = sample;
        self
    }
}

/// Error attached to a rule that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleError {
    /// Error category
    pub kind: RuleErrorKind,
    /// Explanation
    pub message: String,
}

impl RuleError {
    /// Creates a rule error.
    pub fn new(kind: RuleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Category of an isolated rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleErrorKind {
    /// A referenced column is absent from the source
    MissingColumn,
    /// Evaluation failed (type mismatch, query failure, ...)
    Evaluation,
}

/// One sampled failing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Zero-based row position in the source, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u64>,
    /// Values of the columns the rule reads
    pub values: BTreeMap<String, serde_json::Value>,
}

/// Rule counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Number of rules in the contract
    pub total_rules: usize,
    /// Rules that passed
    pub rules_passed: usize,
    /// Rules that failed, including rules that could not be evaluated
    pub rules_failed: usize,
    /// True when every rule passed
    pub passed: bool,
}

impl Summary {
    /// Computes the summary of a list of rule results.
    pub fn from_results(results: &[RuleResult]) -> Self {
        let rules_passed = results.iter().filter(|r| r.passed).count();
        Self {
            total_rules: results.len(),
            rules_passed,
            rules_failed: results.len() - rules_passed,
            passed: rules_passed == results.len(),
        }
    }
}

/// Full report of one contract run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Rule counts
    pub summary: Summary,
    /// Per-rule outcomes in contract order
    pub results: Vec<RuleResult>,
    /// Run statistics
    pub stats: Stats,
}

impl ValidationResult {
    /// True when every rule passed.
    pub fn passed(&self) -> bool {
        self.summary.passed
    }

    /// Returns the result of the rule with the given id.
    pub fn result(&self, rule_id: &str) -> Option<&RuleResult> {
        self.results.iter().find(|r| r.rule_id == rule_id)
    }

    /// Returns the sampled failing rows of a rule.
    ///
    /// Empty when the rule passed, sampling was disabled, or the id is unknown.
    pub fn sample_failures(&self, rule_id: &str) -> &[SampleRow] {
        self.result(rule_id)
            .map(|r| r.sample.as_slice())
            .unwrap_or(&[])
    }

    /// JSON rendering without `stats.run_meta`.
    ///
    /// Two runs over identical input and contract produce identical output.
    pub fn canonical_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(stats) = value.get_mut("stats").and_then(|s| s.as_object_mut()) {
            stats.remove("run_meta");
        }
        value
    }
}

impl PartialEq for ValidationResult {
    fn eq(&self, other: &Self) -> bool {
        self.summary == other.summary
            && self.results == other.results
            && self.stats.projection == other.stats.projection
            && self.stats.execution == other.stats.execution
    }
}

/// Run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    /// Column classification
    pub projection: ProjectionStats,

    /// Route taken by each rule (full verbosity only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution: Vec<RuleExecution>,

    /// Timings and I/O diagnostics; not part of the determinism contract
    pub run_meta: RunMeta,
}

/// Required/available/loaded column classification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectionStats {
    /// Columns referenced by at least one rule
    pub required_count: usize,
    /// Columns present in the source
    pub available_count: usize,
    /// Columns fetched for local evaluation
    pub loaded_count: usize,

    /// Column names (full verbosity only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded: Option<Vec<String>>,
}

/// How a rule was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Evaluated over the materialized table
    Local,
    /// Evaluated as SQL on the source
    Pushdown,
    /// Not evaluated (missing column)
    Skipped,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Local => "local",
            Route::Pushdown => "pushdown",
            Route::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Route taken by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecution {
    /// Rule identifier
    pub rule_id: String,
    /// Route
    pub route: Route,
}

/// Phases of a contract run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    LoadContract,
    ResolveSource,
    PlanProjection,
    Pushdown,
    Local,
    Collect,
    Aggregate,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::LoadContract => "load_contract",
            RunPhase::ResolveSource => "resolve_source",
            RunPhase::PlanProjection => "plan_projection",
            RunPhase::Pushdown => "pushdown",
            RunPhase::Local => "local",
            RunPhase::Collect => "collect",
            RunPhase::Aggregate => "aggregate",
        };
        f.write_str(s)
    }
}

/// Time spent in one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Phase
    pub phase: RunPhase,
    /// Wall-clock milliseconds
    pub elapsed_ms: u64,
}

/// I/O diagnostics of a materialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoStats {
    /// Bytes transferred into memory
    pub bytes: u64,
    /// Rows materialized
    pub rows: u64,
    /// Wall-clock milliseconds
    pub elapsed_ms: u64,
    /// Columns fetched
    pub columns: Vec<String>,
}

/// Non-deterministic run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Total wall-clock milliseconds
    pub total_ms: u64,
    /// Number of SQL queries issued
    pub queries: usize,
    /// Per-phase timings (full verbosity only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PhaseTiming>,
    /// Last materialization diagnostics (full verbosity only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io: Option<IoStats>,
}
