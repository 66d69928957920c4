//! `weave compile <stack>`.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use stackweave_infra::config::Project;
use stackweave_infra::runner::compile_stack;

use super::render::print_report;

pub async fn compile(project: &Project, stack: &str, json: bool, quiet: bool) -> Result<ExitCode> {
    let run = compile_stack(project, stack, true).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.report)?);
    } else if !quiet {
        print_report(&run.report);
        for path in &run.packaged {
            println!(
                "  {} packaged {}",
                style("+").green().bold(),
                path.display()
            );
        }
        if let Some(path) = &run.report_path {
            println!("  {} report written to {}", style("i").blue().bold(), path.display());
            println!();
        }
    }

    Ok(if run.report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
