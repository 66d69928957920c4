//! Loaders for the YAML documents of a project.
//!
//! - `agents.yaml`: the consumer registry (run-fatal on error)
//! - `relationships.yaml`: aliases and rules (optional, run-fatal on error)
//! - `stacks/<stack>.yaml`: one stack's selections and overrides
//!
//! Section `path`s are relative to the document that declares them and are
//! read at load time, so nothing downstream touches the filesystem.

use std::path::Path;

use anyhow::{bail, Context};
use stackweave_core::manifest::is_slug;
use stackweave_core::registry::{validate_sections, ConsumerRegistry};
use stackweave_types::consumer::{
    ConsumerDefinition, ConsumerOverrides, RegistryFile, Section, SectionDecl, StackDefinition,
    StackFile, StackSelection,
};
use stackweave_types::error::CatalogError;
use stackweave_types::relationship::RelationshipsFile;

fn read(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

/// Turn a declared section into a loaded one. Exactly one of `body` and
/// `path` must be set.
pub fn load_section(decl: SectionDecl, base: &Path) -> anyhow::Result<Section> {
    let body = match (decl.body, decl.path) {
        (Some(body), None) => body,
        (None, Some(relative)) => {
            let full = base.join(&relative);
            std::fs::read_to_string(&full).with_context(|| {
                format!("failed to read section '{}' from {}", decl.name, full.display())
            })?
        }
        (Some(_), Some(_)) => bail!("section '{}' declares both body and path", decl.name),
        (None, None) => bail!("section '{}' declares neither body nor path", decl.name),
    };
    Ok(Section {
        name: decl.name,
        body,
    })
}

/// Load and validate the consumer registry.
pub fn load_registry(path: &Path) -> Result<ConsumerRegistry, CatalogError> {
    let content = read(path)?;
    let file: RegistryFile = if content.trim().is_empty() {
        RegistryFile::default()
    } else {
        serde_yaml_ng::from_str(&content)
            .map_err(|e| CatalogError::Registry(format!("{}: {e}", path.display())))?
    };
    let base = base_dir(path);

    let definitions = file
        .agents
        .into_iter()
        .map(|(name, decl)| {
            let ordered_sections = decl
                .sections
                .into_iter()
                .map(|s| load_section(s, base))
                .collect::<anyhow::Result<Vec<_>>>()
                .map_err(|e| CatalogError::Registry(format!("consumer '{name}': {e:#}")))?;
            Ok(ConsumerDefinition {
                name,
                title: decl.title,
                description: decl.description,
                execution_model: decl.model,
                allowed_capabilities: decl.tools,
                ordered_sections,
            })
        })
        .collect::<Result<Vec<_>, CatalogError>>()?;

    tracing::debug!(path = %path.display(), consumers = definitions.len(), "loaded registry");
    ConsumerRegistry::new(definitions)
}

/// Load the relationship declarations. A missing file means no aliases and
/// no rules.
pub fn load_relationships(path: &Path) -> Result<RelationshipsFile, CatalogError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No relationships file at {}, using none", path.display());
            return Ok(RelationshipsFile::default());
        }
        Err(source) => {
            return Err(CatalogError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if content.trim().is_empty() {
        return Ok(RelationshipsFile::default());
    }

    serde_yaml_ng::from_str(&content)
        .map_err(|e| CatalogError::Relationship(format!("{}: {e}", path.display())))
}

/// Load one stack document. The stack name defaults to the file stem.
pub fn load_stack(path: &Path) -> anyhow::Result<StackDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stack document {}", path.display()))?;
    let file: StackFile = if content.trim().is_empty() {
        StackFile::default()
    } else {
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse stack document {}", path.display()))?
    };

    let name = match file.name {
        Some(name) => name,
        None => path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_owned)
            .with_context(|| format!("{} has no usable file name", path.display()))?,
    };
    if !is_slug(&name) {
        bail!("stack name '{name}' must be lowercase letters and digits separated by single hyphens");
    }

    let base = base_dir(path);
    let selections = file
        .agents
        .into_iter()
        .map(|(consumer_name, agent)| {
            let overrides = agent.overrides;
            let sections = overrides
                .sections
                .map(|patch| patch.try_map(|decl| load_section(decl, base)))
                .transpose()
                .with_context(|| format!("consumer '{consumer_name}' in stack '{name}'"))?;
            if let Some(patch) = &sections {
                validate_sections(patch.values()).with_context(|| {
                    format!("invalid section override for consumer '{consumer_name}' in stack '{name}'")
                })?;
            }
            Ok(StackSelection {
                consumer_name,
                selected: agent.skills,
                overrides: ConsumerOverrides {
                    title: overrides.title,
                    description: overrides.description,
                    model: overrides.model,
                    tools: overrides.tools,
                    sections,
                },
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    tracing::debug!(stack = %name, consumers = selections.len(), "loaded stack");
    Ok(StackDefinition { name, selections })
}

/// Names of every stack document in `dir`, sorted.
pub fn list_stacks(dir: &Path) -> anyhow::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read stacks directory: {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml");
        if !is_yaml {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_owned());
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}
