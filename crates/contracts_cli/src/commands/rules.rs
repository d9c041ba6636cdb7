use anyhow::Result;

use super::engine;
use crate::output::{self, Format};

pub fn execute(format: Format) -> Result<bool> {
    let engine = engine();
    let registry = engine.rules();
    let definitions: Vec<_> = registry
        .kinds()
        .iter()
        .filter_map(|kind| registry.definition(kind))
        .collect();

    output::print_rule_kinds(&definitions, format)?;
    Ok(true)
}
