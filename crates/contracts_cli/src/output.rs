use anyhow::Result;
use clap::ValueEnum;
use colored::*;
use contracts_core::{Contract, Route, RuleResult, SampleRow, ValidationResult};
use contracts_validator::{ExecutionPlan, Rule, RuleDefinition};
use serde_json::json;

/// Output format of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn banner(title: &str) {
    println!("\n{}", "═".repeat(60));
    println!("{}", format!("  {}", title).bold());
    println!("{}", "═".repeat(60));
}

pub fn print_validation_result(
    contract: &Contract,
    result: &ValidationResult,
    format: Format,
) -> Result<()> {
    if format == Format::Json {
        return print_json(result);
    }

    banner(&format!("VALIDATION REPORT: {}", contract.name));

    if result.passed() {
        println!(
            "\n{} {}",
            "✓".green().bold(),
            "Validation PASSED".green().bold()
        );
    } else {
        println!(
            "\n{} {}",
            "✗".red().bold(),
            "Validation FAILED".red().bold()
        );
    }

    println!("\n{}", "Rules:".bold());
    for rule in &result.results {
        print_rule_result(rule);
    }

    let summary = &result.summary;
    let projection = &result.stats.projection;
    println!("\n{}", "Summary:".bold());
    println!(
        "  Rules:    {} total, {} passed, {} failed",
        summary.total_rules, summary.rules_passed, summary.rules_failed
    );
    println!(
        "  Columns:  {} required, {} available, {} loaded",
        projection.required_count, projection.available_count, projection.loaded_count
    );
    println!("  Queries:  {}", result.stats.run_meta.queries);
    println!("  Duration: {}ms", result.stats.run_meta.total_ms);

    if !result.stats.execution.is_empty() {
        println!("\n{}", "Execution:".bold());
        for execution in &result.stats.execution {
            println!("  {:<24} {}", execution.rule_id, route_label(execution.route));
        }
    }
    if !result.stats.run_meta.phases.is_empty() {
        println!("\n{}", "Phases:".bold());
        for phase in &result.stats.run_meta.phases {
            println!("  {:<24} {}ms", phase.phase.to_string(), phase.elapsed_ms);
        }
    }
    println!("{}", "═".repeat(60));
    Ok(())
}

/// Prints the rules that completed before a run was interrupted.
pub fn print_partial_results(results: &[RuleResult], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(&json!({ "partial": results }));
    }
    if results.is_empty() {
        return Ok(());
    }
    println!("\n{}", "Completed before interruption:".yellow().bold());
    for rule in results {
        print_rule_result(rule);
    }
    Ok(())
}

fn print_rule_result(rule: &RuleResult) {
    let label = format!("{} ({})", rule.rule_id, rule.kind);
    match (&rule.error, rule.passed) {
        (Some(error), _) => {
            println!("  {} {}: {}", "!".yellow().bold(), label, error.message.yellow());
        }
        (None, true) => println!("  {} {}: {}", "✓".green().bold(), label, rule.message),
        (None, false) => {
            println!("  {} {}: {}", "✗".red().bold(), label, rule.message.red());
            for sample in &rule.sample {
                println!("      {}", sample_line(sample).dimmed());
            }
        }
    }
}

fn sample_line(sample: &SampleRow) -> String {
    let values = sample
        .values
        .iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect::<Vec<_>>()
        .join(", ");
    match sample.row {
        Some(row) => format!("row {}: {}", row, values),
        None => values,
    }
}

fn route_label(route: Route) -> ColoredString {
    match route {
        Route::Pushdown => route.to_string().cyan(),
        Route::Local => route.to_string().normal(),
        Route::Skipped => route.to_string().yellow(),
    }
}

pub fn print_contract_summary(
    contract: &Contract,
    rules: &[Box<dyn Rule>],
    format: Format,
) -> Result<()> {
    if format == Format::Json {
        return print_json(&json!({
            "valid": true,
            "name": contract.name,
            "version": contract.version,
            "owner": contract.owner,
            "dataset": contract.dataset,
            "options": contract.options,
            "rules": rules
                .iter()
                .map(|r| json!({ "id": r.id(), "kind": r.kind(), "columns": r.required_columns() }))
                .collect::<Vec<_>>(),
        }));
    }

    print_success("Contract is valid");

    println!("\nContract Summary:");
    println!("  Name:        {}", contract.name);
    println!("  Version:     {}", contract.version);
    println!("  Owner:       {}", contract.owner.as_deref().unwrap_or("N/A"));
    println!(
        "  Description: {}",
        contract.description.as_deref().unwrap_or("N/A")
    );
    println!("  Dataset:     {}", contract.dataset.as_deref().unwrap_or("N/A"));
    println!(
        "  Options:     pushdown={}, stats={}, sample_size={}",
        contract.options.pushdown,
        stats_label(contract),
        contract.options.sample_size
    );
    println!("  Rules:       {}", rules.len());
    for rule in rules {
        let columns = rule.required_columns();
        if columns.is_empty() {
            println!("    - {} ({})", rule.id(), rule.kind());
        } else {
            println!("    - {} ({}) on {}", rule.id(), rule.kind(), columns.join(", "));
        }
    }
    Ok(())
}

fn stats_label(contract: &Contract) -> &'static str {
    match contract.options.stats {
        contracts_core::StatsVerbosity::Summary => "summary",
        contracts_core::StatsVerbosity::Full => "full",
    }
}

pub fn print_rule_kinds(definitions: &[RuleDefinition], format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(
            &definitions
                .iter()
                .map(|d| {
                    json!({
                        "kind": d.kind,
                        "description": d.description,
                        "params": d.params.iter().map(|p| json!({
                            "name": p.name,
                            "required": p.required,
                            "description": p.description,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
        );
    }

    println!("{}", "Rule kinds:".bold());
    for definition in definitions {
        println!("\n  {} {}", definition.kind.bold(), definition.description.dimmed());
        for param in definition.params {
            let marker = if param.required { "required" } else { "optional" };
            println!("    {:<12} {:<9} {}", param.name, marker, param.description);
        }
    }
    Ok(())
}

pub fn print_plan(contract: &Contract, plan: &ExecutionPlan, format: Format) -> Result<()> {
    if format == Format::Json {
        return print_json(&json!({
            "contract": contract.name,
            "source": plan.source,
            "dialect": plan.dialect,
            "required": plan.required,
            "available": plan.available,
            "loaded": plan.loaded,
            "rules": plan.rules.iter().map(|r| json!({
                "rule_id": r.rule_id,
                "kind": r.kind,
                "route": r.route,
                "columns": r.columns,
                "note": r.note,
            })).collect::<Vec<_>>(),
            "queries": plan.queries,
        }));
    }

    banner(&format!("EXECUTION PLAN: {}", contract.name));
    println!("\n  Source:    {}", plan.source);
    if let Some(dialect) = plan.dialect {
        println!("  Dialect:   {}", dialect);
    }
    println!("  Required:  {}", plan.required.join(", "));
    println!(
        "  Loaded:    {} of {} columns{}",
        plan.loaded.len(),
        plan.available.len(),
        if plan.loaded.is_empty() {
            String::new()
        } else {
            format!(" ({})", plan.loaded.join(", "))
        }
    );

    println!("\n{}", "Rules:".bold());
    for rule in &plan.rules {
        match &rule.note {
            Some(note) => println!(
                "  {:<24} {:<9} {}",
                rule.rule_id,
                route_label(rule.route),
                note.dimmed()
            ),
            None => println!("  {:<24} {}", rule.rule_id, route_label(rule.route)),
        }
    }

    if !plan.queries.is_empty() {
        println!("\n{}", "Queries:".bold());
        for query in &plan.queries {
            println!("  {}", query);
        }
    }
    println!("{}", "═".repeat(60));
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}
