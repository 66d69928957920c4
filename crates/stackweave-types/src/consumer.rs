//! Consumer (agent) definitions, stack selections and their merge result.
//!
//! The global registry (`agents.yaml`) defines every consumer once. A stack
//! document (`stacks/<stack>.yaml`) selects fragments per consumer and may
//! override registry fields. The merger combines both into a
//! `ResolvedConsumer`, which lives only as long as its compilation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// A named prose section of a consumer definition, body already loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub body: String,
}

/// A section as written on disk: exactly one of `body` or `path`.
///
/// `path` is relative to the file that declares the section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDecl {
    pub name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One consumer as written in `agents.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerDecl {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub sections: Vec<SectionDecl>,
}

/// The whole `agents.yaml` document, keyed by consumer name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub agents: BTreeMap<String, ConsumerDecl>,
}

/// A consumer definition from the global registry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumerDefinition {
    pub name: String,
    pub title: String,
    pub description: String,
    pub execution_model: Option<String>,
    pub allowed_capabilities: Vec<String>,
    pub ordered_sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// Stack documents
// ---------------------------------------------------------------------------

/// How an override list combines with the registry list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchMode {
    #[default]
    Union,
    Replace,
}

/// A list-valued override. A bare list means union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListPatch<T> {
    Items(Vec<T>),
    Explicit {
        #[serde(default)]
        mode: PatchMode,
        values: Vec<T>,
    },
}

impl<T> ListPatch<T> {
    pub fn mode(&self) -> PatchMode {
        match self {
            Self::Items(_) => PatchMode::Union,
            Self::Explicit { mode, .. } => *mode,
        }
    }

    pub fn values(&self) -> &[T] {
        match self {
            Self::Items(values) | Self::Explicit { values, .. } => values,
        }
    }

    /// Convert the values while keeping the mode.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<ListPatch<U>, E> {
        let mode = self.mode();
        let values = match self {
            Self::Items(values) | Self::Explicit { values, .. } => values,
        };
        let values = values.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(ListPatch::Explicit { mode, values })
    }
}

/// Overrides as written in a stack document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverridesDecl {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub tools: Option<ListPatch<String>>,
    #[serde(default)]
    pub sections: Option<ListPatch<SectionDecl>>,
}

/// Overrides with section bodies loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub tools: Option<ListPatch<String>>,
    pub sections: Option<ListPatch<Section>>,
}

/// A fragment selection entry. A plain string is inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillEntry {
    Plain(String),
    Detailed {
        id: String,
        #[serde(default = "default_true")]
        inline: bool,
    },
}

fn default_true() -> bool {
    true
}

impl SkillEntry {
    pub fn reference(&self) -> &str {
        match self {
            Self::Plain(id) | Self::Detailed { id, .. } => id,
        }
    }

    pub fn inline(&self) -> bool {
        match self {
            Self::Plain(_) => true,
            Self::Detailed { inline, .. } => *inline,
        }
    }
}

/// One consumer's entry in a stack document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackAgentDecl {
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub overrides: OverridesDecl,
}

/// The whole stack document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub agents: BTreeMap<String, StackAgentDecl>,
}

/// A stack's selection for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSelection {
    pub consumer_name: String,
    pub selected: Vec<SkillEntry>,
    pub overrides: ConsumerOverrides,
}

/// A loaded stack: its name and every consumer selection, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub name: String,
    pub selections: Vec<StackSelection>,
}

// ---------------------------------------------------------------------------
// Merge result
// ---------------------------------------------------------------------------

/// A selected fragment after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFragment {
    /// The reference exactly as written in the stack document.
    pub reference: String,
    pub canonical_id: String,
    pub storage_location: PathBuf,
    pub inline: bool,
}

/// A consumer definition merged with its stack selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConsumer {
    pub name: String,
    pub title: String,
    pub description: String,
    pub execution_model: Option<String>,
    pub allowed_capabilities: Vec<String>,
    pub ordered_sections: Vec<Section>,
    /// Bodies copied verbatim, in stack-declared order.
    pub inline_fragments: Vec<ResolvedFragment>,
    /// Index entries only, in stack-declared order.
    pub referenced_fragments: Vec<ResolvedFragment>,
}

impl ResolvedConsumer {
    /// Inline fragments, then referenced ones, each in stack-declared order.
    pub fn all_fragments(&self) -> impl Iterator<Item = &ResolvedFragment> {
        self.inline_fragments
            .iter()
            .chain(self.referenced_fragments.iter())
    }
}

/// A top-level block of a compiled document.
///
/// Registry and stack sections are always `Section`, whatever their name, so
/// a section can never stand in for a block the compiler derives itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentBlock {
    Role,
    Constraints,
    Section(String),
    Skills,
    SkillIndex,
    SelfCheck,
}

impl DocumentBlock {
    /// The XML-style tag the block is wrapped in.
    pub fn tag(&self) -> String {
        match self {
            Self::Role => "role".to_owned(),
            Self::Constraints => "constraints".to_owned(),
            Self::Section(name) => name.replace('-', "_"),
            Self::Skills => "skills".to_owned(),
            Self::SkillIndex => "skill_index".to_owned(),
            Self::SelfCheck => "self_check".to_owned(),
        }
    }

    /// The opening marker, e.g. `<role>`.
    pub fn marker(&self) -> String {
        format!("<{}>", self.tag())
    }
}

/// The compiled output for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub consumer: String,
    pub content: String,
    /// Blocks in the order they were emitted, header excluded.
    pub blocks: Vec<DocumentBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_file_parses_plain_and_detailed_entries() {
        let yaml = r#"
name: production
agents:
  frontend-developer:
    skills:
      - react
      - id: testing-vitest
        inline: false
      - id: zustand
    overrides:
      model: opus
      tools: [Bash]
      sections:
        mode: replace
        values:
          - name: output-format
            body: Reply in markdown.
"#;
        let file: StackFile = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(file.name.as_deref(), Some("production"));
        let agent = &file.agents["frontend-developer"];
        assert_eq!(agent.skills.len(), 3);
        assert!(agent.skills[0].inline());
        assert_eq!(agent.skills[1].reference(), "testing-vitest");
        assert!(!agent.skills[1].inline());
        assert!(agent.skills[2].inline());

        let tools = agent.overrides.tools.as_ref().unwrap();
        assert_eq!(tools.mode(), PatchMode::Union);
        assert_eq!(tools.values(), ["Bash".to_owned()]);

        let sections = agent.overrides.sections.as_ref().unwrap();
        assert_eq!(sections.mode(), PatchMode::Replace);
        assert_eq!(sections.values()[0].name, "output-format");
    }

    #[test]
    fn registry_file_parses_sections() {
        let yaml = r#"
agents:
  backend-developer:
    title: Backend Developer
    description: Builds APIs
    model: sonnet
    tools: [Read, Write]
    sections:
      - name: workflow
        body: Plan first.
      - name: output-format
        path: sections/output.md
"#;
        let file: RegistryFile = serde_yaml_ng::from_str(yaml).unwrap();
        let agent = &file.agents["backend-developer"];
        assert_eq!(agent.model.as_deref(), Some("sonnet"));
        assert_eq!(agent.sections.len(), 2);
        assert!(agent.sections[1].body.is_none());
        assert_eq!(
            agent.sections[1].path.as_deref(),
            Some(std::path::Path::new("sections/output.md"))
        );
    }

    #[test]
    fn section_blocks_use_underscored_tags() {
        let block = DocumentBlock::Section("output-format".to_owned());
        assert_eq!(block.marker(), "<output_format>");
        assert_ne!(DocumentBlock::Section("constraints".to_owned()), DocumentBlock::Constraints);
        assert_eq!(DocumentBlock::SkillIndex.marker(), "<skill_index>");
    }

    #[test]
    fn list_patch_try_map_keeps_mode() {
        let patch: ListPatch<&str> = ListPatch::Explicit {
            mode: PatchMode::Replace,
            values: vec!["a", "b"],
        };
        let mapped = patch
            .try_map(|v| Ok::<_, ()>(v.to_uppercase()))
            .unwrap();
        assert_eq!(mapped.mode(), PatchMode::Replace);
        assert_eq!(mapped.values(), ["A".to_owned(), "B".to_owned()]);
    }
}
