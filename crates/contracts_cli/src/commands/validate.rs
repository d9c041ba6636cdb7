use anyhow::{Context, Result};
use contracts_validator::RunError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{RunArgs, engine, load_contract};
use crate::output::{self, Format};

/// Runs a contract; returns whether every rule passed.
pub async fn execute(args: &RunArgs, format: Format) -> Result<bool> {
    let contract = load_contract(&args.contract)?;
    let engine = engine();

    let token = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(token.clone()));
    let outcome = engine
        .validate(&contract, args.run_options().cancel_token(token))
        .await;
    interrupt.abort();

    match outcome {
        Ok(result) => {
            output::print_validation_result(&contract, &result, format)?;
            Ok(result.passed())
        }
        Err(err) => {
            if let RunError::Cancelled { partial, .. } | RunError::TimedOut { partial, .. } = &err {
                output::print_partial_results(partial, format)?;
            }
            Err(err).with_context(|| format!("Validation of '{}' did not complete", contract.name))
        }
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Interrupt received, cancelling run");
            token.cancel();
        }
        Err(e) => warn!("Failed to listen for interrupts: {}", e),
    }
}
