//! Fragment (skill) domain types.
//!
//! A fragment is one `SKILL.md` file in the catalog: a YAML header followed by
//! a markdown body. The header is parsed into `FragmentHeader`, validated, and
//! turned into immutable `FragmentMetadata` for the rest of the run.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Header (raw frontmatter)
// ---------------------------------------------------------------------------

/// Parsed `SKILL.md` YAML frontmatter before validation.
///
/// Every field is optional at the serde level so the scanner can name the
/// missing field instead of surfacing a generic YAML error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentHeader {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Slash-separated category, e.g. `frontend/framework`.
    #[serde(default)]
    pub category: Option<String>,
    /// Flagged for standalone distribution as its own packaged artifact.
    #[serde(default)]
    pub standalone: bool,
}

// ---------------------------------------------------------------------------
// Scanned records
// ---------------------------------------------------------------------------

/// Validated metadata for one catalog fragment. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMetadata {
    pub canonical_id: String,
    pub display_name: String,
    pub description: String,
    /// Absolute path of the fragment file.
    pub storage_location: PathBuf,
    /// Location relative to the catalog root, always `/`-separated.
    pub relative_location: String,
    pub author_tag: Option<String>,
    pub version: Option<String>,
    /// Legacy composite path (`category/name (@author)`) when a category is declared.
    pub legacy_path: Option<String>,
    pub standalone: bool,
}

impl FragmentMetadata {
    /// The id without its `@author` suffix.
    pub fn base_name(&self) -> &str {
        self.canonical_id
            .split_once('@')
            .map_or(self.canonical_id.as_str(), |(name, _)| name)
    }
}

/// A scanned fragment: metadata plus the verbatim body below the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub metadata: FragmentMetadata,
    pub body: String,
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// The historical reference formats a configuration entry may use.
///
/// Classification happens once, in the resolver; everything downstream
/// works with canonical ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FragmentRef {
    /// A short name from the alias map, e.g. `react`.
    Alias(String),
    /// A canonical id, e.g. `react-framework` or `react-framework@acme`.
    Canonical(String),
    /// A legacy composite path, e.g. `frontend/framework/react (@acme)`.
    LegacyPath(String),
}

impl FragmentRef {
    /// The reference exactly as it was classified.
    pub fn raw(&self) -> &str {
        match self {
            Self::Alias(s) | Self::Canonical(s) | Self::LegacyPath(s) => s,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Alias(_) => "alias",
            Self::Canonical(_) => "canonical",
            Self::LegacyPath(_) => "legacy-path",
        }
    }
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw(), self.kind())
    }
}

/// Result of resolving a reference against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    pub canonical_id: String,
    pub storage_location: PathBuf,
}
