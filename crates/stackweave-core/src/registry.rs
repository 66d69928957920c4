//! The global consumer registry.
//!
//! Loaded once per run and shared read-only by every consumer pipeline.

use std::collections::BTreeMap;

use anyhow::bail;
use stackweave_types::consumer::{ConsumerDefinition, Section};
use stackweave_types::error::CatalogError;

use crate::manifest::is_slug;

/// Section names taken by blocks the compiler emits itself.
pub const RESERVED_SECTION_NAMES: [&str; 6] =
    ["role", "constraints", "skills", "skill", "skill-index", "self-check"];

/// Check a list of sections: slug names, none reserved, none repeated.
///
/// Applies to registry definitions and to stack overrides alike.
pub fn validate_sections(sections: &[Section]) -> anyhow::Result<()> {
    for (i, section) in sections.iter().enumerate() {
        if !is_slug(&section.name) {
            bail!("section name '{}' is not a valid slug", section.name);
        }
        if RESERVED_SECTION_NAMES.contains(&section.name.as_str()) {
            bail!("section name '{}' is reserved", section.name);
        }
        if sections[..i].iter().any(|s| s.name == section.name) {
            bail!("section '{}' is declared twice", section.name);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ConsumerRegistry {
    consumers: BTreeMap<String, ConsumerDefinition>,
}

impl ConsumerRegistry {
    /// Build the registry, checking names and section uniqueness.
    pub fn new(definitions: Vec<ConsumerDefinition>) -> Result<Self, CatalogError> {
        let mut consumers = BTreeMap::new();
        for definition in definitions {
            if !is_slug(&definition.name) {
                return Err(CatalogError::Registry(format!(
                    "consumer name '{}' must be lowercase letters and digits separated by single hyphens",
                    definition.name
                )));
            }
            if definition.title.trim().is_empty() {
                return Err(CatalogError::Registry(format!(
                    "consumer '{}' has an empty title",
                    definition.name
                )));
            }
            validate_sections(&definition.ordered_sections).map_err(|e| {
                CatalogError::Registry(format!("consumer '{}': {e}", definition.name))
            })?;
            if consumers.contains_key(&definition.name) {
                return Err(CatalogError::Registry(format!(
                    "consumer '{}' is declared twice",
                    definition.name
                )));
            }
            consumers.insert(definition.name.clone(), definition);
        }
        Ok(Self { consumers })
    }

    pub fn get(&self, name: &str) -> Option<&ConsumerDefinition> {
        self.consumers.get(name)
    }

    /// All definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ConsumerDefinition> {
        self.consumers.values()
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}
