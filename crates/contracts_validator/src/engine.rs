//! Main validation engine.
//!
//! [`ValidationEngine`] is the run entry point: it compiles a contract
//! against the rule registry, resolves the dataset through the connector
//! registry, executes the plan and aggregates the report.

use chrono::Utc;
use contracts_core::{
    Contract, ContractError, PhaseTiming, PushdownMode, RunPhase, StatsVerbosity,
    ValidationResult,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::connector::{ConnectorRegistry, Materializer};
use crate::planner::{ExecutionPlan, ExecutionPlanner, RunSettings};
use crate::registry::RuleRegistry;
use crate::rules::Rule;
use crate::{ResultAggregator, RunError};

/// Per-run overrides of a contract's dataset and execution options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Dataset address, overriding the contract's
    pub dataset: Option<String>,
    /// Pushdown mode
    pub pushdown: Option<PushdownMode>,
    /// Stats verbosity
    pub stats: Option<StatsVerbosity>,
    /// Maximum sample rows per rule
    pub sample_size: Option<usize>,
    /// Run deadline
    pub timeout: Option<Duration>,
    /// Cancellation signal
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    /// Creates empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dataset address.
    pub fn dataset(mut self, address: impl Into<String>) -> Self {
        self.dataset = Some(address.into());
        self
    }

    /// Sets the pushdown mode.
    pub fn pushdown(mut self, mode: PushdownMode) -> Self {
        self.pushdown = Some(mode);
        self
    }

    /// Sets the stats verbosity.
    pub fn stats(mut self, stats: StatsVerbosity) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Sets the sample size.
    pub fn sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    /// Sets the run deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn settings(&self, contract: &Contract) -> RunSettings {
        let options = &contract.options;
        RunSettings {
            pushdown: self.pushdown.unwrap_or(options.pushdown),
            sample_size: self.sample_size.unwrap_or(options.sample_size),
            dialect: options.dialect,
            timeout: self
                .timeout
                .or_else(|| options.timeout_ms.map(Duration::from_millis)),
            cancel: self.cancel.clone().unwrap_or_default(),
        }
    }

    fn verbosity(&self, contract: &Contract) -> StatsVerbosity {
        self.stats.unwrap_or(contract.options.stats)
    }
}

/// Validation engine for data contracts.
///
/// Holds the rule and connector registries; both can be shared between
/// engines and extended at runtime.
///
/// # Example
///
/// ```rust,no_run
/// use contracts_core::ContractBuilder;
/// use contracts_validator::{RunOptions, ValidationEngine};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let contract = ContractBuilder::new("users")
///     .dataset("data/users.csv")
///     .not_null("email")
///     .unique("user_id")
///     .min_rows(100)
///     .build();
///
/// let engine = ValidationEngine::new();
/// let result = engine.validate(&contract, RunOptions::new()).await?;
///
/// if !result.passed() {
///     for failure in result.results.iter().filter(|r| !r.passed) {
///         println!("{}: {}", failure.rule_id, failure.message);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    rules: Arc<RuleRegistry>,
    connectors: Arc<ConnectorRegistry>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Creates an engine with the built-in rule kinds and default connectors.
    pub fn new() -> Self {
        Self::with_registries(
            Arc::new(RuleRegistry::with_builtins()),
            Arc::new(ConnectorRegistry::with_defaults()),
        )
    }

    /// Creates an engine with explicit registries.
    pub fn with_registries(rules: Arc<RuleRegistry>, connectors: Arc<ConnectorRegistry>) -> Self {
        Self { rules, connectors }
    }

    /// Rule registry.
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Connector registry.
    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Validates a contract against the dataset its address points to.
    ///
    /// The address comes from `options.dataset`, else from the contract.
    /// Contract errors are raised before any connector is touched.
    pub async fn validate(
        &self,
        contract: &Contract,
        options: RunOptions,
    ) -> Result<ValidationResult, RunError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let loading = Instant::now();
        let rules = self.rules.compile(contract)?;
        let address = dataset_address(contract, &options)?;
        let mut phases = vec![timing(RunPhase::LoadContract, loading)];

        let resolving = Instant::now();
        let source = self.connectors.open(&address).await?;
        phases.push(timing(RunPhase::ResolveSource, resolving));
        info!("Validating '{}' against {}", contract.name, address);

        self.run(contract, &rules, source.as_ref(), &options, phases, started_at, clock)
            .await
    }

    /// Validates a contract against an already opened source.
    pub async fn validate_source(
        &self,
        contract: &Contract,
        source: &dyn Materializer,
        options: RunOptions,
    ) -> Result<ValidationResult, RunError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let loading = Instant::now();
        let rules = self.rules.compile(contract)?;
        let phases = vec![timing(RunPhase::LoadContract, loading)];
        info!("Validating '{}' against {}", contract.name, source.address());

        self.run(contract, &rules, source, &options, phases, started_at, clock)
            .await
    }

    /// Plans a run without executing it; only the source schema is read.
    pub async fn explain(
        &self,
        contract: &Contract,
        options: RunOptions,
    ) -> Result<ExecutionPlan, RunError> {
        let rules = self.rules.compile(contract)?;
        let address = dataset_address(contract, &options)?;
        let source = self.connectors.open(&address).await?;
        ExecutionPlanner::new(source.as_ref(), options.settings(contract))
            .plan(&rules)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        contract: &Contract,
        rules: &[Box<dyn Rule>],
        source: &dyn Materializer,
        options: &RunOptions,
        phases: Vec<PhaseTiming>,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
    ) -> Result<ValidationResult, RunError> {
        let outcome = ExecutionPlanner::new(source, options.settings(contract))
            .with_phases(phases)
            .execute(rules)
            .await?;
        Ok(ResultAggregator::new(options.verbosity(contract)).aggregate(outcome, started_at, clock))
    }
}

fn dataset_address(contract: &Contract, options: &RunOptions) -> Result<String, ContractError> {
    options
        .dataset
        .clone()
        .or_else(|| contract.dataset.clone())
        .ok_or(ContractError::MissingDataset)
}

fn timing(phase: RunPhase, started: Instant) -> PhaseTiming {
    PhaseTiming {
        phase,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}
