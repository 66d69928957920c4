//! End-to-end stack compilation.
//!
//! 1. Load the stack document.
//! 2. Scan the catalog, load relationships and the registry, build the
//!    resolution context. Any failure here aborts the run with no report.
//! 3. Run every consumer pipeline concurrently.
//! 4. Digest accepted documents, then (unless dry-running) write documents,
//!    standalone artifacts and `report.json`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use stackweave_core::pipeline::{run_stack, ResolutionContext};
use stackweave_types::error::CatalogError;
use stackweave_types::report::RunReport;

use crate::config::Project;
use crate::digest::content_digest;
use crate::documents::{load_registry, load_relationships, load_stack};
use crate::scanner::scan_catalog;
use crate::writer::{package_standalone, write_documents, write_report};

/// Result of compiling one stack.
#[derive(Debug, Clone)]
pub struct StackRun {
    pub report: RunReport,
    /// Standalone artifacts written for this stack.
    pub packaged: Vec<PathBuf>,
    /// Where `report.json` was written, if it was.
    pub report_path: Option<PathBuf>,
}

/// Build the shared, immutable resolution context for a project.
pub fn load_context(project: &Project) -> Result<ResolutionContext, CatalogError> {
    let catalog = scan_catalog(&project.catalog_dir())?;
    let relationships = load_relationships(&project.relationships_path())?;
    let registry = load_registry(&project.registry_path())?;
    ResolutionContext::build(catalog, &relationships, registry)
}

/// Compile `stack_name`. With `write == false` nothing is written to disk.
pub async fn compile_stack(
    project: &Project,
    stack_name: &str,
    write: bool,
) -> anyhow::Result<StackRun> {
    let stack_path = project.stack_path(stack_name);
    if !stack_path.exists() {
        anyhow::bail!("stack '{stack_name}' not found at {}", stack_path.display());
    }
    let stack = load_stack(&stack_path)?;
    let ctx = Arc::new(load_context(project)?);

    let compile = &project.config.compile;
    let mut outcomes = run_stack(Arc::clone(&ctx), &stack, compile.max_parallel).await;
    for outcome in &mut outcomes {
        if let Some(document) = &outcome.document {
            outcome.report.digest = Some(content_digest(&document.content));
        }
    }

    let output_dir = project.output_dir();
    let mut packaged = Vec::new();
    if write {
        let written = write_documents(&output_dir, &stack.name, &mut outcomes).await?;
        tracing::info!(stack = %stack.name, documents = written, "documents written");
        if compile.package_standalone {
            packaged = package_standalone(&output_dir, &stack.name, &ctx.catalog, &outcomes).await?;
        }
    }

    let report = RunReport {
        stack: stack.name.clone(),
        generated_at: Utc::now(),
        consumers: outcomes.into_iter().map(|o| o.report).collect(),
    };

    let report_path = if write && compile.write_report {
        Some(write_report(&output_dir, &report).await?)
    } else {
        None
    };

    Ok(StackRun {
        report,
        packaged,
        report_path,
    })
}
