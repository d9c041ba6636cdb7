pub mod check;
pub mod explain;
pub mod rules;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use contracts_core::{Contract, PushdownMode, StatsVerbosity};
use contracts_iceberg::IcebergConnector;
use contracts_parser::parse_file;
use contracts_validator::{ConnectorRegistry, RuleRegistry, RunOptions, ValidationEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Options shared by commands that open the dataset.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the contract file (YAML, TOML or JSON)
    pub contract: String,

    /// Dataset address, overriding the contract's
    #[arg(short, long)]
    pub dataset: Option<String>,

    /// Pushdown mode: auto, force, off
    #[arg(short, long)]
    pub pushdown: Option<PushdownMode>,

    /// Stats verbosity: summary, full
    #[arg(long)]
    pub stats: Option<StatsVerbosity>,

    /// Maximum sample rows per failing rule (0 disables samples)
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Run deadline in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl RunArgs {
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new();
        if let Some(dataset) = &self.dataset {
            options = options.dataset(dataset.clone());
        }
        if let Some(mode) = self.pushdown {
            options = options.pushdown(mode);
        }
        if let Some(stats) = self.stats {
            options = options.stats(stats);
        }
        if let Some(size) = self.sample_size {
            options = options.sample_size(size);
        }
        if let Some(timeout) = self.timeout_ms {
            options = options.timeout(Duration::from_millis(timeout));
        }
        options
    }
}

/// Engine with the built-in rules, the default connectors and Iceberg.
pub fn engine() -> ValidationEngine {
    let connectors = ConnectorRegistry::with_defaults();
    connectors.register(Arc::new(IcebergConnector));
    ValidationEngine::with_registries(Arc::new(RuleRegistry::with_builtins()), Arc::new(connectors))
}

/// Parses a contract file.
///
/// A relative local dataset path in the contract is resolved against the
/// contract's directory.
pub fn load_contract(path: &str) -> Result<Contract> {
    info!("Loading contract: {}", path);
    let path = Path::new(path);
    let mut contract =
        parse_file(path).with_context(|| format!("Failed to parse contract file: {}", path.display()))?;

    if let (Some(dataset), Some(dir)) = (&contract.dataset, path.parent()) {
        let local = Path::new(dataset);
        if !dataset.contains("://") && local.is_relative() && !dir.as_os_str().is_empty() {
            contract.dataset = Some(dir.join(local).to_string_lossy().into_owned());
        }
    }
    Ok(contract)
}
