//! Structural check of a compiled document before it is accepted.
//!
//! The check reads the blocks the compiler recorded, not the text, so a
//! fragment body or section that happens to contain `<constraints>` or
//! `<output_format>` cannot satisfy it.

use stackweave_types::consumer::{CompiledDocument, DocumentBlock};
use stackweave_types::error::ConsumerError;

/// Name of the section that carries the output-format block.
pub const OUTPUT_FORMAT_SECTION: &str = "output-format";

/// Blocks every accepted document must contain, checked in this order.
pub fn required_blocks() -> [DocumentBlock; 3] {
    [
        DocumentBlock::Role,
        DocumentBlock::Constraints,
        DocumentBlock::Section(OUTPUT_FORMAT_SECTION.to_owned()),
    ]
}

/// Fail with the marker of the first required block the compiler did not
/// emit.
pub fn validate_document(document: &CompiledDocument) -> Result<(), ConsumerError> {
    for required in required_blocks() {
        if !document.blocks.contains(&required) {
            return Err(ConsumerError::IncompleteDocument(required.marker()));
        }
    }
    Ok(())
}
