use anyhow::{Context, Result};

use super::{engine, load_contract};
use crate::output::{self, Format};

/// Loads and compiles a contract against the rule registry. No dataset is
/// opened.
pub fn execute(contract_path: &str, format: Format) -> Result<bool> {
    let contract = load_contract(contract_path)?;
    let rules = engine()
        .rules()
        .compile(&contract)
        .with_context(|| format!("Contract '{}' is invalid", contract.name))?;

    output::print_contract_summary(&contract, &rules, format)?;
    Ok(true)
}
