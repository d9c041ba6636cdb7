use anyhow::{Context, Result};

use super::{RunArgs, engine, load_contract};
use crate::output::{self, Format};

pub async fn execute(args: &RunArgs, format: Format) -> Result<bool> {
    let contract = load_contract(&args.contract)?;
    let plan = engine()
        .explain(&contract, args.run_options())
        .await
        .with_context(|| format!("Failed to plan '{}'", contract.name))?;

    output::print_plan(&contract, &plan, format)?;
    Ok(true)
}
