//! `weave check [<stack>]`.
//!
//! Without a stack: scan the catalog, load the registry and relationships,
//! and build the resolver. With a stack: additionally run every consumer
//! pipeline without writing anything.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use stackweave_infra::config::Project;
use stackweave_infra::documents::list_stacks;
use stackweave_infra::runner::{compile_stack, load_context};

use super::render::print_report;

pub async fn check(
    project: &Project,
    stack: Option<&str>,
    json: bool,
    quiet: bool,
) -> Result<ExitCode> {
    if let Some(stack) = stack {
        let run = compile_stack(project, stack, false).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&run.report)?);
        } else if !quiet {
            print_report(&run.report);
        }
        return Ok(if run.report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let ctx = load_context(project)?;
    let stacks = list_stacks(&project.stacks_dir())?;

    if json {
        let summary = serde_json::json!({
            "fragments": ctx.catalog.len(),
            "aliases": ctx.resolver.aliases().count(),
            "rules": ctx.rules.rules().len(),
            "consumers": ctx.registry.len(),
            "stacks": stacks,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !quiet {
        let ok = style("✓").green();
        println!();
        println!("  {ok} {} fragments scanned", ctx.catalog.len());
        println!("  {ok} {} aliases resolved", ctx.resolver.aliases().count());
        println!("  {ok} {} relationship rules loaded", ctx.rules.rules().len());
        println!("  {ok} {} consumers registered", ctx.registry.len());
        if stacks.is_empty() {
            println!("  {} no stacks found", style("i").blue().bold());
        } else {
            println!(
                "  {} stacks: {}",
                style("i").blue().bold(),
                stacks.join(", ")
            );
        }
        println!();
    }

    Ok(ExitCode::SUCCESS)
}
