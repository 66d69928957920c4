//! CLI command definitions for the `weave` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod check;
pub mod compile;
pub mod list;
pub mod render;
pub mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Compile skill catalogs and agent definitions into per-stack documents.
#[derive(Parser)]
#[command(name = "weave", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory containing weave.toml.
    #[arg(long, global = true, env = "WEAVE_PROJECT_DIR", default_value = ".")]
    pub project: PathBuf,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every consumer of a stack and write the documents.
    Compile {
        /// Stack name (file stem under the stacks directory).
        stack: String,

        /// Output directory, overriding weave.toml and WEAVE_OUTPUT_DIR.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate the catalog and relationships, and dry-run a stack if given.
    Check {
        /// Stack to dry-run without writing anything.
        stack: Option<String>,
    },

    /// Show how a reference resolves.
    Resolve {
        /// Alias, canonical id or legacy path.
        reference: String,
    },

    /// List catalog fragments.
    #[command(alias = "ls")]
    List,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
