//! Output writer.
//!
//! Layout under the output directory:
//! ```text
//! {output_dir}/{stack}/
//!   {consumer}.md
//!   report.json
//!   skills/{package_name}/SKILL.md
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use stackweave_core::catalog::Catalog;
use stackweave_core::pipeline::ConsumerOutcome;
use stackweave_types::report::RunReport;

pub const REPORT_FILE: &str = "report.json";

pub fn document_path(output_dir: &Path, stack: &str, consumer: &str) -> PathBuf {
    output_dir.join(stack).join(format!("{consumer}.md"))
}

pub fn report_path(output_dir: &Path, stack: &str) -> PathBuf {
    output_dir.join(stack).join(REPORT_FILE)
}

/// Artifact name of a standalone fragment: `name@author` becomes
/// `author-name`, plain ids are unchanged.
pub fn package_name(canonical_id: &str) -> String {
    match canonical_id.split_once('@') {
        Some((name, author)) => format!("{author}-{name}"),
        None => canonical_id.to_owned(),
    }
}

pub fn package_path(output_dir: &Path, stack: &str, canonical_id: &str) -> PathBuf {
    output_dir
        .join(stack)
        .join("skills")
        .join(package_name(canonical_id))
        .join("SKILL.md")
}

async fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Write every accepted document and record its path in the outcome's report.
pub async fn write_documents(
    output_dir: &Path,
    stack: &str,
    outcomes: &mut [ConsumerOutcome],
) -> anyhow::Result<usize> {
    let mut written = 0;
    for outcome in outcomes.iter_mut() {
        let Some(document) = &outcome.document else {
            continue;
        };
        let path = document_path(output_dir, stack, &document.consumer);
        write_file(&path, document.content.as_bytes()).await?;
        tracing::debug!(consumer = %document.consumer, path = %path.display(), "wrote document");
        outcome.report.output = Some(path);
        written += 1;
    }
    Ok(written)
}

/// Copy every standalone fragment used by an accepted consumer into its own
/// artifact directory. Returns the written paths in canonical id order.
pub async fn package_standalone(
    output_dir: &Path,
    stack: &str,
    catalog: &Catalog,
    outcomes: &[ConsumerOutcome],
) -> anyhow::Result<Vec<PathBuf>> {
    let used: BTreeSet<&str> = outcomes
        .iter()
        .filter(|o| o.is_accepted())
        .flat_map(|o| o.fragments.iter().map(String::as_str))
        .collect();

    let mut packaged = Vec::new();
    for id in used {
        let Some(meta) = catalog.metadata(id) else {
            continue;
        };
        if !meta.standalone {
            continue;
        }
        let content = tokio::fs::read(&meta.storage_location)
            .await
            .with_context(|| format!("Failed to read {}", meta.storage_location.display()))?;
        let path = package_path(output_dir, stack, id);
        write_file(&path, &content).await?;
        tracing::debug!(id = %id, path = %path.display(), "packaged standalone fragment");
        packaged.push(path);
    }
    Ok(packaged)
}

/// Write the run report as pretty JSON.
pub async fn write_report(output_dir: &Path, report: &RunReport) -> anyhow::Result<PathBuf> {
    let path = report_path(output_dir, &report.stack);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    write_file(&path, json.as_bytes()).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_moves_author_first() {
        assert_eq!(package_name("zustand@acme"), "acme-zustand");
        assert_eq!(package_name("react-framework"), "react-framework");
    }

    #[test]
    fn paths_follow_layout() {
        let out = Path::new("/out");
        assert_eq!(
            document_path(out, "production", "frontend-developer"),
            PathBuf::from("/out/production/frontend-developer.md")
        );
        assert_eq!(
            report_path(out, "production"),
            PathBuf::from("/out/production/report.json")
        );
        assert_eq!(
            package_path(out, "production", "zustand@acme"),
            PathBuf::from("/out/production/skills/acme-zustand/SKILL.md")
        );
    }
}
