//! Merges per-rule outcomes into a [`ValidationResult`].

use chrono::{DateTime, Utc};
use contracts_core::{
    PhaseTiming, ProjectionStats, RunMeta, RunPhase, Stats, StatsVerbosity, Summary,
    ValidationResult,
};
use std::time::Instant;
use tracing::info;

use crate::planner::RunOutcome;

/// Builds the final report of a run.
///
/// Only `stats.run_meta` varies between identical runs; name lists, routes,
/// phase timings and I/O diagnostics are included at full verbosity.
#[derive(Debug, Clone, Copy)]
pub struct ResultAggregator {
    verbosity: StatsVerbosity,
}

impl ResultAggregator {
    /// Creates an aggregator.
    pub fn new(verbosity: StatsVerbosity) -> Self {
        Self { verbosity }
    }

    /// Aggregates a run outcome.
    ///
    /// `started_at` and `clock` mark the start of the run.
    pub fn aggregate(
        &self,
        outcome: RunOutcome,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> ValidationResult {
        let aggregate_started = Instant::now();
        let full = self.verbosity == StatsVerbosity::Full;
        let plan = outcome.plan;

        let summary = Summary::from_results(&outcome.results);
        let projection = ProjectionStats {
            required_count: plan.required.len(),
            available_count: plan.available.len(),
            loaded_count: plan.loaded.len(),
            required: full.then(|| plan.required.clone()),
            available: full.then(|| plan.available.clone()),
            loaded: full.then(|| plan.loaded.clone()),
        };

        let mut phases = outcome.phases;
        phases.push(PhaseTiming {
            phase: RunPhase::Aggregate,
            elapsed_ms: aggregate_started.elapsed().as_millis() as u64,
        });

        let run_meta = RunMeta {
            started_at,
            total_ms: clock.elapsed().as_millis() as u64,
            queries: outcome.queries,
            phases: if full { phases } else { Vec::new() },
            io: if full { outcome.io } else { None },
        };

        info!(
            "Validation finished: {}/{} rules passed in {}ms",
            summary.rules_passed, summary.total_rules, run_meta.total_ms
        );

        ValidationResult {
            summary,
            results: outcome.results,
            stats: Stats {
                projection,
                execution: if full { outcome.routes } else { Vec::new() },
                run_meta,
            },
        }
    }
}
