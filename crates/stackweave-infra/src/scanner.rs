//! Filesystem catalog scanner.
//!
//! Walks the catalog directory recursively and parses every `SKILL.md`:
//!
//! ```text
//! {catalog_dir}/
//!   frontend/react/SKILL.md
//!   backend/auth-oauth/SKILL.md
//!   ...
//! ```
//!
//! Entries are visited in file-name order so duplicate-id errors and the
//! resulting catalog do not depend on directory listing order.

use std::io;
use std::path::Path;

use stackweave_core::catalog::Catalog;
use stackweave_core::manifest::parse_fragment;
use stackweave_types::error::CatalogError;
use walkdir::WalkDir;

/// The file name that marks a fragment.
pub const FRAGMENT_FILE: &str = "SKILL.md";

/// Scan `root` into a catalog.
///
/// Fails on the first malformed fragment or duplicate canonical id.
pub fn scan_catalog(root: &Path) -> Result<Catalog, CatalogError> {
    if !root.is_dir() {
        return Err(CatalogError::Io {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "catalog directory does not exist"),
        });
    }

    let mut catalog = Catalog::new(root);

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| CatalogError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() || entry.file_name() != FRAGMENT_FILE {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8(bytes).map_err(|e| CatalogError::MalformedMetadata {
            location: path.to_path_buf(),
            detail: format!("file is not valid UTF-8 ({})", e.utf8_error()),
        })?;

        let fragment = parse_fragment(&content, path, &relative)?;
        tracing::debug!(
            id = %fragment.metadata.canonical_id,
            location = %relative,
            "scanned fragment"
        );
        catalog.insert(fragment)?;
    }

    tracing::info!(
        root = %root.display(),
        fragments = catalog.len(),
        "catalog scanned"
    );
    Ok(catalog)
}
