//! The scanned fragment catalog.
//!
//! Built once per run by the scanner and never mutated afterwards. Keyed by
//! canonical id in a `BTreeMap` so every iteration order is deterministic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stackweave_types::error::CatalogError;
use stackweave_types::fragment::{Fragment, FragmentMetadata};

#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    fragments: BTreeMap<String, Fragment>,
}

impl Catalog {
    /// Create an empty catalog rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fragments: BTreeMap::new(),
        }
    }

    /// Build a catalog from scanned fragments, rejecting duplicate ids.
    pub fn from_fragments(
        root: impl Into<PathBuf>,
        fragments: impl IntoIterator<Item = Fragment>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(root);
        for fragment in fragments {
            catalog.insert(fragment)?;
        }
        Ok(catalog)
    }

    /// Add a fragment. Fails with `DuplicateId` if the canonical id is taken.
    pub fn insert(&mut self, fragment: Fragment) -> Result<(), CatalogError> {
        let id = fragment.metadata.canonical_id.clone();
        if let Some(existing) = self.fragments.get(&id) {
            return Err(CatalogError::DuplicateId {
                id,
                first: existing.metadata.storage_location.clone(),
                second: fragment.metadata.storage_location,
            });
        }
        self.fragments.insert(id, fragment);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, canonical_id: &str) -> Option<&Fragment> {
        self.fragments.get(canonical_id)
    }

    pub fn metadata(&self, canonical_id: &str) -> Option<&FragmentMetadata> {
        self.get(canonical_id).map(|f| &f.metadata)
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.fragments.contains_key(canonical_id)
    }

    /// All fragments in canonical id order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
