//! Compile a resolved consumer into its final document.
//!
//! Blocks are delimited with XML-style tags so the consumer can tell role,
//! constraints, sections and fragment bodies apart:
//!
//! ```text
//! ---
//! name: frontend-developer
//! ...
//! ---
//!
//! <role>...</role>
//! <constraints>...</constraints>
//! <workflow>...</workflow>
//! <skills><skill id="...">...</skill></skills>
//! <skill_index>...</skill_index>
//! <self_check>...</self_check>
//! ```
//!
//! Output depends only on the resolved consumer and the catalog, and uses
//! canonical ids rather than stack references, so two stacks that select the
//! same fragments through different references compile identically.

use stackweave_types::consumer::{CompiledDocument, DocumentBlock, ResolvedConsumer};

use crate::catalog::Catalog;

/// Appended to every document, whatever the consumer.
pub const CLOSING_BLOCK: &str = "<self_check>
Before you reply, confirm that:
- the answer stays within your role and the tools listed in your constraints
- every instruction from the skills above that applies to this task was followed
- the reply matches the output format described above
If any check fails, revise the reply before sending it.
</self_check>";

pub fn compile(consumer: &ResolvedConsumer, catalog: &Catalog) -> CompiledDocument {
    let mut out = Emitter::default();
    out.header(header(consumer));

    out.block(
        DocumentBlock::Role,
        format!("# {}\n\n{}", consumer.title.trim(), consumer.description.trim()),
    );

    // Constraints derived from capabilities
    if !consumer.allowed_capabilities.is_empty() {
        out.block(
            DocumentBlock::Constraints,
            format!(
                "You may only use the following tools: {}.\n\
                Do not attempt actions that need any other tool.",
                consumer.allowed_capabilities.join(", ")
            ),
        );
    }

    for section in &consumer.ordered_sections {
        out.block(
            DocumentBlock::Section(section.name.clone()),
            section.body.trim().to_owned(),
        );
    }

    // Inlined fragment bodies, verbatim, in assignment order
    let inline: Vec<String> = consumer
        .inline_fragments
        .iter()
        .filter_map(|f| {
            let fragment = catalog.get(&f.canonical_id)?;
            let mut skill = format!("<skill id=\"{}\">\n{}", f.canonical_id, fragment.body);
            if !skill.ends_with('\n') {
                skill.push('\n');
            }
            skill.push_str("</skill>");
            Some(skill)
        })
        .collect();
    if !inline.is_empty() {
        out.block(DocumentBlock::Skills, inline.join("\n\n"));
    }

    // Index of referenced fragments
    let index: Vec<String> = consumer
        .referenced_fragments
        .iter()
        .filter_map(|f| {
            let meta = catalog.metadata(&f.canonical_id)?;
            Some(format!(
                "- {}: {} ({})",
                f.canonical_id, meta.description, meta.relative_location
            ))
        })
        .collect();
    if !index.is_empty() {
        out.block(
            DocumentBlock::SkillIndex,
            format!(
                "Load these skills from the catalog when the task needs them:\n{}",
                index.join("\n")
            ),
        );
    }

    out.raw_block(DocumentBlock::SelfCheck, CLOSING_BLOCK.to_owned());

    out.finish(&consumer.name)
}

/// Collects rendered blocks and records which top-level blocks were emitted.
#[derive(Default)]
struct Emitter {
    parts: Vec<String>,
    blocks: Vec<DocumentBlock>,
}

impl Emitter {
    fn header(&mut self, text: String) {
        self.parts.push(text);
    }

    fn block(&mut self, block: DocumentBlock, inner: String) {
        let tag = block.tag();
        self.raw_block(block, format!("<{tag}>\n{inner}\n</{tag}>"));
    }

    fn raw_block(&mut self, block: DocumentBlock, text: String) {
        self.parts.push(text);
        self.blocks.push(block);
    }

    fn finish(self, consumer: &str) -> CompiledDocument {
        let mut content = self.parts.join("\n\n");
        content.push('\n');
        CompiledDocument {
            consumer: consumer.to_owned(),
            content,
            blocks: self.blocks,
        }
    }
}

fn header(consumer: &ResolvedConsumer) -> String {
    let mut lines = vec![
        "---".to_owned(),
        format!("name: {}", consumer.name),
        format!("description: {}", single_line(&consumer.description)),
    ];
    if let Some(model) = &consumer.execution_model {
        lines.push(format!("model: {model}"));
    }
    if !consumer.allowed_capabilities.is_empty() {
        lines.push(format!("tools: {}", consumer.allowed_capabilities.join(", ")));
    }
    lines.push("---".to_owned());
    lines.join("\n")
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use stackweave_types::consumer::{ResolvedFragment, Section};

    use super::*;
    use crate::catalog::test_support::{catalog, fragment as fragment_with_body};

    fn fragment(reference: &str, id: &str, inline: bool) -> ResolvedFragment {
        ResolvedFragment {
            reference: reference.to_owned(),
            canonical_id: id.to_owned(),
            storage_location: format!("/catalog/{id}/SKILL.md").into(),
            inline,
        }
    }

    fn consumer() -> ResolvedConsumer {
        ResolvedConsumer {
            name: "frontend-developer".to_owned(),
            title: "Frontend Developer".to_owned(),
            description: "Builds the UI.".to_owned(),
            execution_model: Some("sonnet".to_owned()),
            allowed_capabilities: vec!["Read".to_owned(), "Edit".to_owned()],
            ordered_sections: vec![
                Section {
                    name: "workflow".to_owned(),
                    body: "Plan, then build.\n".to_owned(),
                },
                Section {
                    name: "output-format".to_owned(),
                    body: "Reply in markdown.".to_owned(),
                },
            ],
            inline_fragments: vec![
                fragment("react", "react-framework", true),
                fragment("zustand", "zustand", true),
            ],
            referenced_fragments: vec![fragment("testing-vitest", "testing-vitest", false)],
        }
    }

    fn catalog_for_tests() -> Catalog {
        catalog(&["react-framework", "zustand", "testing-vitest"])
    }

    #[test]
    fn blocks_appear_in_fixed_order() {
        let doc = compile(&consumer(), &catalog_for_tests());
        let content = &doc.content;
        let positions: Vec<usize> = [
            "name: frontend-developer",
            "<role>",
            "<constraints>",
            "<workflow>",
            "<output_format>",
            "<skills>",
            "<skill_index>",
            "<self_check>",
        ]
        .iter()
        .map(|marker| {
            content
                .find(marker)
                .unwrap_or_else(|| panic!("missing {marker}"))
        })
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{content}");
        assert!(content.ends_with("</self_check>\n"));
    }

    #[test]
    fn inline_bodies_follow_assignment_order() {
        let doc = compile(&consumer(), &catalog_for_tests());
        let react = doc.content.find("<skill id=\"react-framework\">").unwrap();
        let zustand = doc.content.find("<skill id=\"zustand\">").unwrap();
        assert!(react < zustand);
        assert!(doc.content.contains("Body of react-framework."));
        assert!(!doc.content.contains("Body of testing-vitest."));
    }

    #[test]
    fn referenced_fragments_are_indexed() {
        let doc = compile(&consumer(), &catalog_for_tests());
        assert!(doc
            .content
            .contains("- testing-vitest: testing-vitest patterns (testing-vitest/SKILL.md)"));
    }

    #[test]
    fn header_lists_model_and_tools() {
        let doc = compile(&consumer(), &catalog_for_tests());
        assert!(doc.content.starts_with(
            "---\nname: frontend-developer\ndescription: Builds the UI.\nmodel: sonnet\ntools: Read, Edit\n---\n\n<role>\n# Frontend Developer\n"
        ));
    }

    #[test]
    fn constraints_omitted_without_capabilities() {
        let mut consumer = consumer();
        consumer.allowed_capabilities.clear();
        let doc = compile(&consumer, &catalog_for_tests());
        assert!(!doc.content.contains("<constraints>"));
        assert!(!doc.content.contains("tools:"));
    }

    #[test]
    fn closing_block_is_unconditional() {
        let mut consumer = consumer();
        consumer.inline_fragments.clear();
        consumer.referenced_fragments.clear();
        consumer.ordered_sections.clear();
        let doc = compile(&consumer, &catalog_for_tests());
        assert!(doc.content.contains(CLOSING_BLOCK));
        assert!(!doc.content.contains("<skills>"));
        assert!(!doc.content.contains("<skill_index>"));
    }

    #[test]
    fn reference_spelling_does_not_change_output() {
        let a = consumer();
        let mut b = consumer();
        b.inline_fragments[0].reference = "react-framework".to_owned();
        let catalog = catalog_for_tests();
        assert_eq!(compile(&a, &catalog).content, compile(&b, &catalog).content);
    }

    #[test]
    fn records_emitted_blocks_in_order() {
        let doc = compile(&consumer(), &catalog_for_tests());
        assert_eq!(
            doc.blocks,
            [
                DocumentBlock::Role,
                DocumentBlock::Constraints,
                DocumentBlock::Section("workflow".to_owned()),
                DocumentBlock::Section("output-format".to_owned()),
                DocumentBlock::Skills,
                DocumentBlock::SkillIndex,
                DocumentBlock::SelfCheck,
            ]
        );
    }

    #[test]
    fn inline_bodies_are_copied_verbatim() {
        let mut catalog = Catalog::new("/catalog");
        catalog
            .insert(fragment_with_body("react-framework", "Line one.\n\n  indented tail  \n\n"))
            .unwrap();
        catalog
            .insert(fragment_with_body("zustand", "No trailing newline"))
            .unwrap();
        let mut consumer = consumer();
        consumer.referenced_fragments.clear();
        let doc = compile(&consumer, &catalog);
        assert!(doc.content.contains(
            "<skill id=\"react-framework\">\nLine one.\n\n  indented tail  \n\n</skill>"
        ));
        assert!(doc
            .content
            .contains("<skill id=\"zustand\">\nNo trailing newline\n</skill>"));
    }

    #[test]
    fn compile_is_deterministic() {
        let catalog = catalog_for_tests();
        assert_eq!(compile(&consumer(), &catalog), compile(&consumer(), &catalog));
    }
}
