//! Identifier resolution.
//!
//! Configuration entries name fragments three ways: a short alias (`react`),
//! a canonical id (`react-framework`, `react-framework@acme`), or a legacy
//! composite path (`frontend/framework/react-framework (@acme)`). Every raw
//! string is classified into a `FragmentRef` once and resolved here.
//!
//! The resolver is built from the scanned catalog and the alias map before
//! any consumer is processed, and is read-only afterwards. It never sees
//! stack data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use stackweave_types::error::{CatalogError, ConsumerError};
use stackweave_types::fragment::{FragmentRef, ResolvedRef};

use crate::catalog::Catalog;
use crate::manifest::{is_slug, legacy_path, split_canonical_id};

/// Lookup data kept per canonical id.
#[derive(Debug, Clone)]
struct Entry {
    location: PathBuf,
    author_tag: Option<String>,
}

/// The decomposed form of a legacy composite path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyParts {
    pub categories: Vec<String>,
    pub name: String,
    pub author: Option<String>,
}

impl LegacyParts {
    /// The normalized path string, in the same form the scanner records.
    pub fn normalized(&self) -> Option<String> {
        if self.categories.is_empty() {
            return None;
        }
        Some(legacy_path(
            &self.categories.join("/"),
            &self.name,
            self.author.as_deref(),
        ))
    }
}

/// Decompose `category/subcategory/name (@author)` into its parts.
///
/// Accepts `name (@author)`, `name(@author)` and `name(author)` for the last
/// segment, and no author at all. Names are lowercased with whitespace runs
/// turned into hyphens. Returns `None` when a segment is empty.
pub fn decompose_legacy_path(raw: &str) -> Option<LegacyParts> {
    let mut segments: Vec<&str> = raw.trim().split('/').map(str::trim).collect();
    let last = segments.pop()?;

    let (name_part, author) = match (last.rfind('('), last.strip_suffix(')')) {
        (Some(open), Some(without_close)) if open < without_close.len() => {
            let author = without_close[open + 1..].trim().trim_start_matches('@').trim();
            let author = (!author.is_empty()).then(|| author.to_lowercase());
            (&last[..open], author)
        }
        _ => (last, None),
    };

    let name = normalize_name(name_part);
    if name.is_empty() {
        return None;
    }

    let categories = segments
        .into_iter()
        .map(normalize_name)
        .collect::<Vec<_>>();
    if categories.iter().any(String::is_empty) {
        return None;
    }

    Some(LegacyParts {
        categories,
        name,
        author,
    })
}

fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Immutable resolution tables for one run.
#[derive(Debug, Clone)]
pub struct IdentifierResolver {
    /// `alias -> canonical id`
    aliases: BTreeMap<String, String>,
    /// `canonical id -> smallest alias`
    reverse: BTreeMap<String, String>,
    /// `canonical id -> entry`
    entries: BTreeMap<String, Entry>,
    /// `normalized legacy path -> canonical id`
    legacy: BTreeMap<String, String>,
}

impl IdentifierResolver {
    /// Build the lookup tables from the catalog and the declared alias map.
    ///
    /// Fails when an alias is not a slug, points at an unknown id, or
    /// shadows a different fragment's canonical id.
    pub fn build(
        catalog: &Catalog,
        aliases: &BTreeMap<String, String>,
    ) -> Result<Self, CatalogError> {
        let entries: BTreeMap<String, Entry> = catalog
            .iter()
            .map(|f| {
                (
                    f.metadata.canonical_id.clone(),
                    Entry {
                        location: f.metadata.storage_location.clone(),
                        author_tag: f.metadata.author_tag.clone(),
                    },
                )
            })
            .collect();

        let mut legacy = BTreeMap::new();
        for fragment in catalog.iter() {
            if let Some(path) = &fragment.metadata.legacy_path {
                if let Some(other) = legacy.insert(path.clone(), fragment.metadata.canonical_id.clone()) {
                    return Err(CatalogError::MalformedMetadata {
                        location: fragment.metadata.storage_location.clone(),
                        detail: format!(
                            "legacy path '{path}' is also declared by '{other}'"
                        ),
                    });
                }
            }
        }

        let mut alias_map = BTreeMap::new();
        let mut reverse: BTreeMap<String, String> = BTreeMap::new();
        for (alias, target) in aliases {
            let alias = alias.trim();
            let target = target.trim();

            if !is_slug(alias) {
                return Err(CatalogError::Relationship(format!(
                    "alias '{alias}' must be lowercase letters and digits separated by hyphens"
                )));
            }
            if !entries.contains_key(target) {
                return Err(CatalogError::Relationship(format!(
                    "alias '{alias}' points at unknown canonical id '{target}'"
                )));
            }
            if alias == target {
                tracing::debug!(alias, "ignoring alias that maps to itself");
                continue;
            }
            if entries.contains_key(alias) {
                return Err(CatalogError::Relationship(format!(
                    "alias '{alias}' -> '{target}' shadows the canonical id of another fragment"
                )));
            }

            alias_map.insert(alias.to_owned(), target.to_owned());
            // BTreeMap iteration is sorted, so the first alias seen is the smallest.
            reverse
                .entry(target.to_owned())
                .or_insert_with(|| alias.to_owned());
        }

        tracing::debug!(
            fragments = entries.len(),
            aliases = alias_map.len(),
            legacy_paths = legacy.len(),
            "built resolution tables"
        );

        Ok(Self {
            aliases: alias_map,
            reverse,
            entries,
            legacy,
        })
    }

    /// Classify a raw reference string.
    ///
    /// - contains `/` or ends with a parenthesized author → `LegacyPath`
    /// - is a key in the alias map → `Alias`
    /// - otherwise → `Canonical`
    pub fn classify(&self, raw: &str) -> FragmentRef {
        let trimmed = raw.trim();
        if trimmed.contains('/') || (trimmed.ends_with(')') && trimmed.contains('(')) {
            FragmentRef::LegacyPath(trimmed.to_owned())
        } else if self.aliases.contains_key(trimmed) {
            FragmentRef::Alias(trimmed.to_owned())
        } else {
            FragmentRef::Canonical(trimmed.to_owned())
        }
    }

    /// Resolve any reference string to a canonical id and storage location.
    ///
    /// The error carries `reference` exactly as given.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedRef, ConsumerError> {
        self.resolve_ref(&self.classify(reference))
            .ok_or_else(|| ConsumerError::UnresolvedReference(reference.to_owned()))
    }

    /// Resolve an already classified reference.
    pub fn resolve_ref(&self, reference: &FragmentRef) -> Option<ResolvedRef> {
        match reference {
            FragmentRef::Alias(alias) => {
                let target = self.aliases.get(alias)?;
                self.lookup(target)
            }
            FragmentRef::Canonical(id) => self.lookup(id),
            FragmentRef::LegacyPath(path) => self.resolve_legacy(path),
        }
    }

    fn lookup(&self, canonical_id: &str) -> Option<ResolvedRef> {
        self.entries.get(canonical_id).map(|entry| ResolvedRef {
            canonical_id: canonical_id.to_owned(),
            storage_location: entry.location.clone(),
        })
    }

    fn resolve_legacy(&self, raw: &str) -> Option<ResolvedRef> {
        let parts = decompose_legacy_path(raw)?;

        if let Some(id) = parts.normalized().and_then(|p| self.legacy.get(&p)) {
            return self.lookup(id);
        }

        if let Some(author) = &parts.author {
            let tagged = format!("{}@{author}", parts.name);
            if let Some(found) = self.lookup(&tagged) {
                return Some(found);
            }
        }

        // Bare name: the author, when recovered, must match the fragment's tag.
        let entry = self.entries.get(&parts.name)?;
        match (&parts.author, &entry.author_tag) {
            (None, _) => self.lookup(&parts.name),
            (Some(wanted), Some(actual)) if wanted == actual => self.lookup(&parts.name),
            _ => None,
        }
    }

    /// The smallest alias pointing at `canonical_id`, for display.
    pub fn reverse_alias(&self, canonical_id: &str) -> Option<&str> {
        self.reverse.get(canonical_id).map(String::as_str)
    }

    /// Every alias pointing at `canonical_id`, sorted.
    pub fn aliases_for<'a>(&'a self, canonical_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, target)| target.as_str() == canonical_id)
            .map(|(alias, _)| alias.as_str())
    }

    /// All `(alias, canonical id)` pairs, sorted by alias.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn location(&self, canonical_id: &str) -> Option<&Path> {
        self.entries.get(canonical_id).map(|e| e.location.as_path())
    }

    /// All canonical ids, sorted.
    pub fn canonical_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Check that `id` follows the canonical naming rule.
pub fn is_canonical_form(id: &str) -> bool {
    split_canonical_id(id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::fragment;

    fn aliases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, c)| ((*a).to_owned(), (*c).to_owned()))
            .collect()
    }

    fn catalog() -> Catalog {
        let mut react = fragment("react-framework", "React body");
        react.metadata.legacy_path = Some("frontend/framework/react (@vince)".to_owned());
        react.metadata.author_tag = Some("vince".to_owned());

        Catalog::from_fragments(
            "/catalog",
            [
                react,
                fragment("vue-framework", "Vue body"),
                fragment("zustand@acme", "Zustand body"),
                fragment("auth-oauth", "OAuth body"),
            ],
        )
        .unwrap()
    }

    fn resolver() -> IdentifierResolver {
        IdentifierResolver::build(
            &catalog(),
            &aliases(&[
                ("react", "react-framework"),
                ("reactjs", "react-framework"),
                ("vue", "vue-framework"),
                ("zustand", "zustand@acme"),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn alias_transparency() {
        let resolver = resolver();
        for (alias, canonical) in resolver.aliases() {
            assert_eq!(
                resolver.resolve(alias).unwrap(),
                resolver.resolve(canonical).unwrap(),
                "alias '{alias}' must resolve like '{canonical}'"
            );
        }
    }

    #[test]
    fn canonical_resolves_to_location() {
        let resolved = resolver().resolve("vue-framework").unwrap();
        assert_eq!(resolved.canonical_id, "vue-framework");
        assert_eq!(
            resolved.storage_location,
            PathBuf::from("/catalog/vue-framework/SKILL.md")
        );
    }

    #[test]
    fn classification() {
        let resolver = resolver();
        assert_eq!(
            resolver.classify("react"),
            FragmentRef::Alias("react".to_owned())
        );
        assert_eq!(
            resolver.classify(" react-framework "),
            FragmentRef::Canonical("react-framework".to_owned())
        );
        assert_eq!(
            resolver.classify("frontend/react (@vince)"),
            FragmentRef::LegacyPath("frontend/react (@vince)".to_owned())
        );
        assert_eq!(
            resolver.classify("zustand (@acme)"),
            FragmentRef::LegacyPath("zustand (@acme)".to_owned())
        );
    }

    #[test]
    fn declared_legacy_path_resolves_even_when_name_differs() {
        let resolver = resolver();
        for raw in [
            "frontend/framework/react (@vince)",
            "Frontend/Framework/React(@vince)",
            "frontend/framework/react (vince)",
        ] {
            assert_eq!(
                resolver.resolve(raw).unwrap().canonical_id,
                "react-framework",
                "{raw}"
            );
        }
    }

    #[test]
    fn legacy_path_decomposes_to_name_and_author() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve("state/client/zustand (@acme)").unwrap().canonical_id,
            "zustand@acme"
        );
        assert_eq!(
            resolver.resolve("backend/auth/auth-oauth").unwrap().canonical_id,
            "auth-oauth"
        );
    }

    #[test]
    fn legacy_path_author_must_match_bare_name() {
        let resolver = resolver();
        // vue-framework has no author tag, so an explicit author cannot match it.
        assert_eq!(
            resolver.resolve("frontend/vue-framework (@someone)"),
            Err(ConsumerError::UnresolvedReference(
                "frontend/vue-framework (@someone)".to_owned()
            ))
        );
    }

    #[test]
    fn unresolved_reference_keeps_original_string() {
        let err = resolver().resolve("angular").unwrap_err();
        assert_eq!(err, ConsumerError::UnresolvedReference("angular".to_owned()));

        let err = resolver().resolve("").unwrap_err();
        assert_eq!(err, ConsumerError::UnresolvedReference(String::new()));
    }

    #[test]
    fn reverse_alias_is_smallest() {
        let resolver = resolver();
        assert_eq!(resolver.reverse_alias("react-framework"), Some("react"));
        assert_eq!(resolver.reverse_alias("auth-oauth"), None);
        assert_eq!(
            resolver.aliases_for("react-framework").collect::<Vec<_>>(),
            ["react", "reactjs"]
        );
    }

    #[test]
    fn no_dangling_entries() {
        let resolver = resolver();
        let catalog = catalog();
        for id in resolver.canonical_ids() {
            let resolved = resolver.resolve(id).unwrap();
            assert_eq!(
                resolved.storage_location,
                catalog.metadata(id).unwrap().storage_location
            );
        }
    }

    #[test]
    fn alias_to_unknown_target_is_rejected() {
        let err = IdentifierResolver::build(&catalog(), &aliases(&[("svelte", "svelte-framework")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown canonical id 'svelte-framework'"));
    }

    #[test]
    fn alias_shadowing_canonical_id_is_rejected() {
        let err = IdentifierResolver::build(&catalog(), &aliases(&[("auth-oauth", "vue-framework")]))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Relationship(_)));
    }

    #[test]
    fn alias_must_be_slug() {
        let err = IdentifierResolver::build(&catalog(), &aliases(&[("React", "react-framework")]))
            .unwrap_err();
        assert!(err.to_string().contains("alias 'React'"));
    }

    #[test]
    fn decompose_variants() {
        assert_eq!(
            decompose_legacy_path("frontend/framework/React Query (@tan)"),
            Some(LegacyParts {
                categories: vec!["frontend".to_owned(), "framework".to_owned()],
                name: "react-query".to_owned(),
                author: Some("tan".to_owned()),
            })
        );
        assert_eq!(
            decompose_legacy_path("react"),
            Some(LegacyParts {
                categories: vec![],
                name: "react".to_owned(),
                author: None,
            })
        );
        assert_eq!(decompose_legacy_path("frontend//react"), None);
        assert_eq!(decompose_legacy_path("frontend/ (@x)"), None);
    }

    #[test]
    fn canonical_form_check() {
        assert!(is_canonical_form("react-framework@acme"));
        assert!(!is_canonical_form("frontend/react"));
    }
}
