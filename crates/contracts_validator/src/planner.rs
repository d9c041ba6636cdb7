//! Execution planning and rule execution.
//!
//! A run goes through PLAN_PROJECTION, then PUSHDOWN for rules routed to the
//! source's SQL endpoint, then LOCAL for the rest, then COLLECT. Every rule
//! ends with exactly one [`RuleResult`]; failures of one rule never affect
//! another. Only source failures, `force` on a non-SQL source, cancellation
//! and timeout stop a run.

use contracts_core::{
    Dialect, IoStats, PhaseTiming, PushdownMode, Route, RuleExecution, RuleResult, RunPhase,
    SampleRow,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connector::{Materializer, SqlEndpoint};
use crate::rules::Rule;
use crate::sql::{CountQuery, SqlCompiler};
use crate::{DataValue, Predicate, RunError, SourceError, ValidationError};

/// Effective options of one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Pushdown mode
    pub pushdown: PushdownMode,
    /// Maximum sample rows per rule
    pub sample_size: usize,
    /// Dialect override for pushdown SQL
    pub dialect: Option<Dialect>,
    /// Run deadline
    pub timeout: Option<Duration>,
    /// Cancellation signal
    pub cancel: CancellationToken,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            pushdown: PushdownMode::Auto,
            sample_size: 5,
            dialect: None,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Planned route of one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRule {
    /// Rule identifier
    pub rule_id: String,
    /// Rule kind
    pub kind: String,
    /// Chosen route
    pub route: Route,
    /// Columns the rule reads
    pub columns: Vec<String>,
    /// Why the rule is not pushed down, when it is not
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
enum Step {
    Skipped(ValidationError),
    Local,
    Pushdown(Predicate),
}

/// Projection and routing decisions for a contract against one source.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Source address
    pub source: String,
    /// Dialect of the pushdown SQL, when anything is pushed down
    pub dialect: Option<Dialect>,
    /// Columns referenced by at least one rule, sorted
    pub required: Vec<String>,
    /// Columns of the source, in source order
    pub available: Vec<String>,
    /// Columns materialized for local rules, in source order
    pub loaded: Vec<String>,
    /// Per-rule decisions, in contract order
    pub rules: Vec<PlannedRule>,
    /// Count queries the pushdown phase issues
    pub queries: Vec<String>,
    steps: Vec<Step>,
    compiler: Option<SqlCompiler>,
    batches: Vec<CountQuery>,
}

impl ExecutionPlan {
    /// Builds the plan from the source's column list.
    ///
    /// Fails only when `force` is requested on a source with no SQL endpoint.
    pub fn build(
        rules: &[Box<dyn Rule>],
        source: &dyn Materializer,
        available: Vec<String>,
        settings: &RunSettings,
    ) -> Result<Self, RunError> {
        let endpoint = source.sql();
        if settings.pushdown == PushdownMode::Force && endpoint.is_none() {
            return Err(RunError::PushdownUnavailable(source.address().to_string()));
        }

        let compiler = match (settings.pushdown, endpoint) {
            (PushdownMode::Off, _) | (_, None) => None,
            (_, Some(endpoint)) => Some(SqlCompiler::new(
                settings.dialect.unwrap_or_else(|| endpoint.dialect()),
            )),
        };
        let local_note = match (settings.pushdown, endpoint) {
            (PushdownMode::Off, _) => "pushdown is off",
            _ => "source is not SQL-backed",
        };

        let mut required: Vec<String> = Vec::new();
        let mut local_columns: Vec<String> = Vec::new();
        let mut planned = Vec::with_capacity(rules.len());
        let mut steps = Vec::with_capacity(rules.len());

        for rule in rules {
            let columns = rule.required_columns();
            for column in &columns {
                if !required.contains(column) {
                    required.push(column.clone());
                }
            }

            let (step, note) = if let Some(missing) = columns.iter().find(|c| !available.contains(c)) {
                let err = ValidationError::missing_column(missing);
                let note = err.to_string();
                (Step::Skipped(err), Some(note))
            } else {
                match (compiler, rule.compile_predicate()) {
                    (Some(compiler), Some(predicate)) => match compiler.check(&predicate) {
                        Ok(()) => (Step::Pushdown(predicate), None),
                        Err(e) => (Step::Local, Some(e.to_string())),
                    },
                    (None, Some(_)) => (Step::Local, Some(local_note.to_string())),
                    (_, None) => (Step::Local, Some("whole-dataset rule".to_string())),
                }
            };

            if matches!(step, Step::Local) {
                local_columns.extend(columns.iter().cloned());
            }
            let route = match step {
                Step::Skipped(_) => Route::Skipped,
                Step::Local => Route::Local,
                Step::Pushdown(_) => Route::Pushdown,
            };
            debug!("Rule '{}' routed {}", rule.id(), route);
            planned.push(PlannedRule {
                rule_id: rule.id().to_string(),
                kind: rule.kind().to_string(),
                route,
                columns,
                note,
            });
            steps.push(step);
        }

        required.sort();
        let loaded: Vec<String> = available
            .iter()
            .filter(|c| local_columns.contains(c))
            .cloned()
            .collect();

        let batches = match compiler {
            Some(compiler) => plan_batches(compiler, endpoint, &steps),
            None => Vec::new(),
        };
        let pushes = steps.iter().any(|s| matches!(s, Step::Pushdown(_)));

        Ok(Self {
            source: source.address().to_string(),
            dialect: compiler.filter(|_| pushes).map(|c| c.dialect()),
            required,
            available,
            loaded,
            rules: planned,
            queries: batches.iter().map(|q| q.sql.clone()).collect(),
            steps,
            compiler,
            batches,
        })
    }

    /// Number of rules on a route.
    pub fn count(&self, route: Route) -> usize {
        self.rules.iter().filter(|r| r.route == route).count()
    }
}

/// Groups pushdown predicates into count queries: one for the whole contract
/// when the dialect batches, one per rule otherwise.
fn plan_batches(
    compiler: SqlCompiler,
    endpoint: Option<&dyn SqlEndpoint>,
    steps: &[Step],
) -> Vec<CountQuery> {
    let Some(endpoint) = endpoint else {
        return Vec::new();
    };
    let predicates: Vec<&Predicate> = steps
        .iter()
        .filter_map(|s| match s {
            Step::Pushdown(p) => Some(p),
            _ => None,
        })
        .collect();
    if predicates.is_empty() {
        return Vec::new();
    }

    let relation = endpoint.relation();
    if compiler.supports_batching() {
        if let Ok(query) = compiler.count_query(relation, &predicates) {
            return vec![query];
        }
    }
    predicates
        .iter()
        .filter_map(|p| compiler.count_query(relation, &[*p]).ok())
        .collect()
}

/// Everything a finished run produced, before aggregation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The plan that was executed
    pub plan: ExecutionPlan,
    /// One result per rule, in contract order
    pub results: Vec<RuleResult>,
    /// Route per rule, in contract order
    pub routes: Vec<RuleExecution>,
    /// SQL queries issued
    pub queries: usize,
    /// Phase timings so far
    pub phases: Vec<PhaseTiming>,
    /// Diagnostics of the local materialization
    pub io: Option<IoStats>,
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

enum Stop {
    Interrupted(Interrupt),
    Failed(RunError),
}

impl From<RunError> for Stop {
    fn from(err: RunError) -> Self {
        Stop::Failed(err)
    }
}

impl From<SourceError> for Stop {
    fn from(err: SourceError) -> Self {
        Stop::Failed(RunError::Source(err))
    }
}

impl From<Interrupt> for Stop {
    fn from(interrupt: Interrupt) -> Self {
        Stop::Interrupted(interrupt)
    }
}

/// Executes compiled rules against one source.
///
/// Rules run sequentially; at most one query is in flight and the local
/// table is materialized at most once.
pub struct ExecutionPlanner<'a> {
    source: &'a dyn Materializer,
    settings: RunSettings,
    deadline: Option<Instant>,
    queries: usize,
    phases: Vec<PhaseTiming>,
}

impl<'a> ExecutionPlanner<'a> {
    /// Creates a planner; the deadline starts now.
    pub fn new(source: &'a dyn Materializer, settings: RunSettings) -> Self {
        let deadline = settings.timeout.map(|t| Instant::now() + t);
        Self {
            source,
            settings,
            deadline,
            queries: 0,
            phases: Vec::new(),
        }
    }

    /// Carries timings of phases that ran before planning.
    pub fn with_phases(mut self, phases: Vec<PhaseTiming>) -> Self {
        self.phases = phases;
        self
    }

    /// Reads the source schema and plans the run without executing it.
    pub async fn plan(&self, rules: &[Box<dyn Rule>]) -> Result<ExecutionPlan, RunError> {
        let available = self.source.schema().await?;
        ExecutionPlan::build(rules, self.source, available, &self.settings)
    }

    /// Plans and executes the run.
    pub async fn execute(mut self, rules: &[Box<dyn Rule>]) -> Result<RunOutcome, RunError> {
        let mut results: Vec<Option<RuleResult>> = vec![None; rules.len()];
        match self.run(rules, &mut results).await {
            Ok(plan) => {
                let started = std::time::Instant::now();
                let routes = plan
                    .rules
                    .iter()
                    .map(|r| RuleExecution {
                        rule_id: r.rule_id.clone(),
                        route: r.route,
                    })
                    .collect();
                let results = rules
                    .iter()
                    .zip(results)
                    .map(|(rule, result)| {
                        result.unwrap_or_else(|| {
                            RuleResult::errored(
                                rule.id(),
                                rule.kind(),
                                ValidationError::evaluation("rule was not evaluated").to_rule_error(),
                            )
                        })
                    })
                    .collect();
                self.record(RunPhase::Collect, started);
                Ok(RunOutcome {
                    plan,
                    results,
                    routes,
                    queries: self.queries,
                    phases: self.phases,
                    io: self.source.io_debug(),
                })
            }
            Err(Stop::Failed(err)) => Err(err),
            Err(Stop::Interrupted(interrupt)) => {
                let partial: Vec<RuleResult> = results.into_iter().flatten().collect();
                let total = rules.len();
                warn!(
                    "Run interrupted with {} of {} rules completed",
                    partial.len(),
                    total
                );
                Err(match interrupt {
                    Interrupt::Cancelled => RunError::Cancelled { partial, total },
                    Interrupt::TimedOut => RunError::TimedOut {
                        partial,
                        total,
                        timeout_ms: self
                            .settings
                            .timeout
                            .map(|t| t.as_millis() as u64)
                            .unwrap_or(0),
                    },
                })
            }
        }
    }

    async fn run(
        &mut self,
        rules: &[Box<dyn Rule>],
        results: &mut [Option<RuleResult>],
    ) -> Result<ExecutionPlan, Stop> {
        let source = self.source;
        let started = std::time::Instant::now();
        self.check()?;
        let available = self.guard(source.schema()).await??;
        let plan = ExecutionPlan::build(rules, source, available, &self.settings)?;
        info!(
            "Planned {} rules: {} pushdown, {} local, {} skipped; loading {} of {} columns",
            rules.len(),
            plan.count(Route::Pushdown),
            plan.count(Route::Local),
            plan.count(Route::Skipped),
            plan.loaded.len(),
            plan.available.len()
        );
        for (i, (rule, step)) in rules.iter().zip(&plan.steps).enumerate() {
            if let Step::Skipped(err) = step {
                results[i] = Some(RuleResult::errored(rule.id(), rule.kind(), err.to_rule_error()));
            }
        }
        self.record(RunPhase::PlanProjection, started);

        if let (Some(compiler), Some(endpoint)) = (plan.compiler, source.sql()) {
            if !plan.batches.is_empty() {
                let started = std::time::Instant::now();
                self.pushdown(compiler, endpoint, rules, &plan, results).await?;
                self.record(RunPhase::Pushdown, started);
            }
        }

        if plan.steps.iter().any(|s| matches!(s, Step::Local)) {
            let started = std::time::Instant::now();
            self.local(rules, &plan, results).await?;
            self.record(RunPhase::Local, started);
        }

        Ok(plan)
    }

    async fn pushdown(
        &mut self,
        compiler: SqlCompiler,
        endpoint: &dyn SqlEndpoint,
        rules: &[Box<dyn Rule>],
        plan: &ExecutionPlan,
        results: &mut [Option<RuleResult>],
    ) -> Result<(), Stop> {
        let position = |rule_id: &str| rules.iter().position(|r| r.id() == rule_id);
        let predicate_at = |i: usize| match &plan.steps[i] {
            Step::Pushdown(p) => Some(p),
            _ => None,
        };

        for batch in &plan.batches {
            let counts = match self.count(endpoint, batch).await? {
                Ok(counts) => counts
                    .into_iter()
                    .map(Ok)
                    .collect::<Vec<Result<u64, ValidationError>>>(),
                Err(err) if batch.rule_ids.len() > 1 => {
                    warn!("Batched count query failed, retrying per rule: {}", err);
                    let mut counts = Vec::with_capacity(batch.rule_ids.len());
                    for rule_id in &batch.rule_ids {
                        let single = position(rule_id)
                            .and_then(|i| predicate_at(i))
                            .ok_or_else(|| ValidationError::evaluation("predicate not planned"))
                            .and_then(|p| {
                                compiler
                                    .count_query(endpoint.relation(), &[p])
                                    .map_err(ValidationError::from)
                            });
                        counts.push(match single {
                            Ok(query) => self.count(endpoint, &query).await?.and_then(|mut c| {
                                c.pop().ok_or_else(|| ValidationError::Query("empty result".into()))
                            }),
                            Err(e) => Err(e),
                        });
                    }
                    counts
                }
                Err(err) => vec![Err(err)],
            };

            for (rule_id, count) in batch.rule_ids.iter().zip(counts) {
                let Some(i) = position(rule_id) else { continue };
                let Some(predicate) = predicate_at(i) else { continue };
                let rule = &rules[i];
                results[i] = Some(match count {
                    Ok(count) => {
                        let sample = if count > 0 && self.settings.sample_size > 0 {
                            self.sample(compiler, endpoint, predicate).await?
                        } else {
                            Vec::new()
                        };
                        RuleResult::from_count(rule.id(), rule.kind(), count, predicate.describe(count))
                            .with_sample(sample)
                    }
                    Err(err) => {
                        warn!("Rule '{}' failed on pushdown: {}", rule.id(), err);
                        RuleResult::errored(rule.id(), rule.kind(), err.to_rule_error())
                    }
                });
            }
        }
        Ok(())
    }

    /// Runs a count query and returns the failing counts in predicate order.
    async fn count(
        &mut self,
        endpoint: &dyn SqlEndpoint,
        query: &CountQuery,
    ) -> Result<Result<Vec<u64>, ValidationError>, Stop> {
        self.check()?;
        self.queries += 1;
        debug!("Pushdown query: {}", query.sql);
        let rows = match self.guard(endpoint.query(&query.sql)).await? {
            Ok(rows) => rows,
            Err(e) => return Ok(Err(ValidationError::Query(e.to_string()))),
        };

        let expected = query.rule_ids.len() + 1;
        let row = match rows.as_slice() {
            [row] if row.len() == expected => row,
            _ => {
                return Ok(Err(ValidationError::Query(format!(
                    "expected one row of {} counts, got {} row(s)",
                    expected,
                    rows.len()
                ))));
            }
        };
        Ok(row[1..].iter().map(count_value).collect())
    }

    /// Fetches a bounded sample of failing rows; failures leave it empty.
    async fn sample(
        &mut self,
        compiler: SqlCompiler,
        endpoint: &dyn SqlEndpoint,
        predicate: &Predicate,
    ) -> Result<Vec<SampleRow>, Stop> {
        let sql = match compiler.sample_query(endpoint.relation(), predicate, self.settings.sample_size) {
            Ok(sql) => sql,
            Err(e) => {
                warn!("No sample query for rule '{}': {}", predicate.rule_id, e);
                return Ok(Vec::new());
            }
        };
        self.check()?;
        self.queries += 1;
        match self.guard(endpoint.query(&sql)).await? {
            Ok(rows) => Ok(rows
                .into_iter()
                .map(|row| SampleRow {
                    row: None,
                    values: predicate
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().map(DataValue::to_json))
                        .collect(),
                })
                .collect()),
            Err(e) => {
                warn!("Sample query for rule '{}' failed: {}", predicate.rule_id, e);
                Ok(Vec::new())
            }
        }
    }

    async fn local(
        &mut self,
        rules: &[Box<dyn Rule>],
        plan: &ExecutionPlan,
        results: &mut [Option<RuleResult>],
    ) -> Result<(), Stop> {
        let source = self.source;
        self.check()?;
        let table = self.guard(source.materialize(&plan.loaded)).await??;
        debug!(
            "Evaluating local rules over {} rows x {} columns",
            table.num_rows(),
            plan.loaded.len()
        );

        for (i, (rule, step)) in rules.iter().zip(&plan.steps).enumerate() {
            if !matches!(step, Step::Local) {
                continue;
            }
            self.check()?;
            results[i] = Some(match rule.evaluate_local(&table, self.settings.sample_size) {
                Ok(result) => result,
                Err(err) => {
                    warn!("Rule '{}' failed locally: {}", rule.id(), err);
                    RuleResult::errored(rule.id(), rule.kind(), err.to_rule_error())
                }
            });
        }
        Ok(())
    }

    fn check(&self) -> Result<(), Interrupt> {
        if self.settings.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Interrupt::TimedOut);
        }
        Ok(())
    }

    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        let deadline = self.deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            biased;
            _ = self.settings.cancel.cancelled() => Err(Interrupt::Cancelled),
            _ = sleep_until(deadline), if self.deadline.is_some() => Err(Interrupt::TimedOut),
            out = fut => Ok(out),
        }
    }

    fn record(&mut self, phase: RunPhase, started: std::time::Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!("Phase {} finished in {}ms", phase, elapsed_ms);
        self.phases.push(PhaseTiming { phase, elapsed_ms });
    }
}

fn count_value(value: &DataValue) -> Result<u64, ValidationError> {
    match value {
        DataValue::Int(n) if *n >= 0 => Ok(*n as u64),
        DataValue::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Ok(*f as u64),
        DataValue::String(s) => s
            .parse::<u64>()
            .map_err(|_| ValidationError::Query(format!("non-numeric count '{}'", s))),
        other => Err(ValidationError::Query(format!("invalid count value {}", other))),
    }
}
