//! stackweave CLI entry point.
//!
//! Binary name: `weave`
//!
//! Parses CLI arguments, sets up tracing, loads the project configuration
//! and dispatches to the command handler.
//!
//! Exit codes: 0 on success, 1 when any consumer is rejected (or a reference
//! does not resolve), 2 when the run cannot start at all.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use console::style;
use stackweave_infra::config::Project;
use stackweave_observe::tracing_setup::{default_directive, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(default_directive(cli.verbose, cli.quiet), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("  {} {err:#}", style("✗").red().bold());
            ExitCode::from(2)
        }
    };

    shutdown_tracing();
    code
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Shell completions don't need a project
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "weave", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let mut project = Project::load(&cli.project).await?;
    tracing::debug!(root = %project.root.display(), "project loaded");

    match cli.command {
        Commands::Compile { stack, out } => {
            if let Some(out) = out {
                project.config.output_dir = out;
            }
            cli::compile::compile(&project, &stack, cli.json, cli.quiet).await
        }
        Commands::Check { stack } => {
            cli::check::check(&project, stack.as_deref(), cli.json, cli.quiet).await
        }
        Commands::Resolve { reference } => cli::resolve::resolve(&project, &reference, cli.json),
        Commands::List => cli::list::list(&project, cli.json),
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}
