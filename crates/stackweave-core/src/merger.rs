//! Merge a registry definition with one stack's selection and overrides.
//!
//! Scalar overrides replace the registry value. List overrides are unioned
//! with the registry list unless they ask for `replace`. Every selected
//! reference is resolved here; the first unresolvable one rejects the
//! consumer.

use std::collections::HashMap;

use stackweave_types::consumer::{
    ListPatch, PatchMode, ResolvedConsumer, ResolvedFragment, Section, StackSelection,
};
use stackweave_types::error::ConsumerError;
use stackweave_types::report::{Diagnostic, Severity};

use crate::registry::ConsumerRegistry;
use crate::resolver::IdentifierResolver;

/// A merged consumer plus the non-blocking notes produced while merging.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub consumer: ResolvedConsumer,
    pub notes: Vec<Diagnostic>,
}

pub fn merge(
    registry: &ConsumerRegistry,
    selection: &StackSelection,
    resolver: &IdentifierResolver,
) -> Result<MergeOutcome, ConsumerError> {
    let definition = registry
        .get(&selection.consumer_name)
        .ok_or_else(|| ConsumerError::UnknownConsumer(selection.consumer_name.clone()))?;
    let overrides = &selection.overrides;

    let mut notes = Vec::new();
    let mut inline_fragments = Vec::new();
    let mut referenced_fragments = Vec::new();
    // canonical id -> first reference that selected it
    let mut seen: HashMap<String, String> = HashMap::new();

    for entry in &selection.selected {
        let reference = entry.reference();
        let resolved = resolver.resolve(reference)?;

        if let Some(first) = seen.get(&resolved.canonical_id) {
            notes.push(Diagnostic::note(
                Severity::Advisory,
                "DuplicateSelection",
                format!(
                    "'{reference}' and '{first}' both resolve to '{}'; keeping '{first}'",
                    resolved.canonical_id
                ),
            ));
            continue;
        }
        seen.insert(resolved.canonical_id.clone(), reference.to_owned());

        let fragment = ResolvedFragment {
            reference: reference.to_owned(),
            canonical_id: resolved.canonical_id,
            storage_location: resolved.storage_location,
            inline: entry.inline(),
        };
        if fragment.inline {
            inline_fragments.push(fragment);
        } else {
            referenced_fragments.push(fragment);
        }
    }

    let allowed_capabilities = match &overrides.tools {
        Some(patch) => apply_list(&definition.allowed_capabilities, patch, |a, b| a == b),
        None => definition.allowed_capabilities.clone(),
    };
    let ordered_sections = match &overrides.sections {
        Some(patch) => apply_sections(&definition.ordered_sections, patch),
        None => definition.ordered_sections.clone(),
    };

    tracing::debug!(
        consumer = %definition.name,
        inline = inline_fragments.len(),
        referenced = referenced_fragments.len(),
        "merged consumer"
    );

    Ok(MergeOutcome {
        consumer: ResolvedConsumer {
            name: definition.name.clone(),
            title: overrides
                .title
                .clone()
                .unwrap_or_else(|| definition.title.clone()),
            description: overrides
                .description
                .clone()
                .unwrap_or_else(|| definition.description.clone()),
            execution_model: overrides
                .model
                .clone()
                .or_else(|| definition.execution_model.clone()),
            allowed_capabilities,
            ordered_sections,
            inline_fragments,
            referenced_fragments,
        },
        notes,
    })
}

/// Apply a list patch: `replace` takes the patch values as-is, `union`
/// appends values not already present.
fn apply_list<T: Clone>(
    base: &[T],
    patch: &ListPatch<T>,
    same: impl Fn(&T, &T) -> bool,
) -> Vec<T> {
    let mut out: Vec<T> = match patch.mode() {
        PatchMode::Replace => Vec::with_capacity(patch.values().len()),
        PatchMode::Union => base.to_vec(),
    };
    for value in patch.values() {
        if !out.iter().any(|existing| same(existing, value)) {
            out.push(value.clone());
        }
    }
    out
}

/// Sections union by name: a known name replaces the body in place, a new
/// name is appended.
fn apply_sections(base: &[Section], patch: &ListPatch<Section>) -> Vec<Section> {
    match patch.mode() {
        PatchMode::Replace => apply_list(&[], patch, |a, b| a.name == b.name),
        PatchMode::Union => {
            let mut out = base.to_vec();
            for section in patch.values() {
                match out.iter_mut().find(|s| s.name == section.name) {
                    Some(existing) => existing.body.clone_from(&section.body),
                    None => out.push(section.clone()),
                }
            }
            out
        }
    }
}
