//! SKILL.md fragment parsing and metadata validation.
//!
//! A fragment file is YAML frontmatter delimited by `---` followed by a
//! markdown body. The frontmatter is parsed into a `FragmentHeader` and then
//! validated into `FragmentMetadata`; every failure is reported as
//! `CatalogError::MalformedMetadata` naming the file.

use std::path::Path;

use anyhow::{bail, Context};
use stackweave_types::error::CatalogError;
use stackweave_types::fragment::{Fragment, FragmentHeader, FragmentMetadata};

/// Extract YAML frontmatter and markdown body from a fragment file.
///
/// Content must start with `---`, and a closing `\n---` line separates the
/// YAML from the body.
///
/// Returns `(yaml_str, body_str)` where body has leading blank lines removed.
pub fn extract_frontmatter(content: &str) -> anyhow::Result<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if !content.starts_with("---") {
        bail!("fragment must start with YAML frontmatter delimiter '---'");
    }

    let after_open = &content[3..];
    let after_open = after_open
        .strip_prefix("\r\n")
        .or_else(|| after_open.strip_prefix('\n'))
        .unwrap_or(after_open);

    let closing_pos = after_open
        .find("\n---")
        .context("fragment is missing the closing frontmatter delimiter '---'")?;

    let yaml_str = &after_open[..closing_pos];
    let remainder = &after_open[closing_pos + 4..]; // skip "\n---"

    // Body starts after the closing delimiter line
    let body_str = remainder
        .strip_prefix("\r\n")
        .or_else(|| remainder.strip_prefix('\n'))
        .unwrap_or(remainder)
        .trim_start_matches(['\n', '\r']);

    Ok((yaml_str, body_str))
}

/// Parse fragment content into its raw header and body.
pub fn parse_fragment_header(content: &str) -> anyhow::Result<(FragmentHeader, String)> {
    let (yaml_str, body_str) = extract_frontmatter(content)?;

    let header: FragmentHeader = if yaml_str.trim().is_empty() {
        FragmentHeader::default()
    } else {
        serde_yaml_ng::from_str(yaml_str).context("failed to parse fragment YAML frontmatter")?
    };

    Ok((header, body_str.to_owned()))
}

/// Whether `s` is one or more lowercase alphanumeric tokens joined by single hyphens.
pub fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|token| {
            !token.is_empty()
                && token
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Split a canonical id into its name and optional author tag, enforcing the
/// naming rule: `slug` or `slug@slug`.
pub fn split_canonical_id(id: &str) -> anyhow::Result<(&str, Option<&str>)> {
    let (name, author) = match id.split_once('@') {
        Some((name, author)) => (name, Some(author)),
        None => (id, None),
    };

    if !is_slug(name) {
        bail!(
            "canonical id '{id}' must be lowercase letters and digits separated by single hyphens"
        );
    }
    if let Some(author) = author {
        if !is_slug(author) {
            bail!("author tag '{author}' in canonical id '{id}' is not a valid slug");
        }
    }

    Ok((name, author))
}

/// Build the normalized legacy composite path for a fragment.
pub fn legacy_path(category: &str, name: &str, author: Option<&str>) -> String {
    match author {
        Some(author) => format!("{category}/{name} (@{author})"),
        None => format!("{category}/{name}"),
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> anyhow::Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("required field '{field}' is missing or empty"),
    }
}

/// Validate a parsed header into `FragmentMetadata`.
///
/// Checks:
/// - `id`, `name` and `description` are present and non-empty
/// - `id` follows the naming rule, with an optional `@author` suffix
/// - an `author` field, if present, is a slug and agrees with the id suffix
/// - `version`, if present, parses as semver
/// - `category`, if present, is a `/`-separated list of slugs
pub fn validate_header(
    header: &FragmentHeader,
    storage_location: &Path,
    relative_location: &str,
) -> anyhow::Result<FragmentMetadata> {
    let id = required(&header.id, "id")?;
    let display_name = required(&header.name, "name")?;
    let description = required(&header.description, "description")?;

    let (name, suffix_author) = split_canonical_id(id)?;

    let declared_author = header
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| a.trim_start_matches('@'));
    if let Some(author) = declared_author {
        if !is_slug(author) {
            bail!("author '{author}' is not a valid slug");
        }
    }
    let author_tag = match (suffix_author, declared_author) {
        (Some(suffix), Some(declared)) if suffix != declared => {
            bail!("id suffix '@{suffix}' disagrees with author '{declared}'")
        }
        (Some(author), _) | (None, Some(author)) => Some(author.to_owned()),
        (None, None) => None,
    };

    if let Some(version) = header.version.as_deref() {
        version
            .parse::<semver::Version>()
            .with_context(|| format!("invalid semver version '{version}'"))?;
    }

    let category = match header.category.as_deref().map(|c| c.trim().trim_matches('/')) {
        Some(c) if !c.is_empty() => {
            if !c.split('/').all(is_slug) {
                bail!("category '{c}' must be slugs separated by '/'");
            }
            Some(c)
        }
        _ => None,
    };

    Ok(FragmentMetadata {
        canonical_id: id.to_owned(),
        display_name: display_name.to_owned(),
        description: description.to_owned(),
        storage_location: storage_location.to_path_buf(),
        relative_location: relative_location.to_owned(),
        legacy_path: category.map(|c| legacy_path(c, name, author_tag.as_deref())),
        author_tag,
        version: header.version.clone(),
        standalone: header.standalone,
    })
}

/// Parse and validate one fragment file's content.
pub fn parse_fragment(
    content: &str,
    storage_location: &Path,
    relative_location: &str,
) -> Result<Fragment, CatalogError> {
    let malformed = |e: anyhow::Error| CatalogError::MalformedMetadata {
        location: storage_location.to_path_buf(),
        detail: format!("{e:#}"),
    };

    let (header, body) = parse_fragment_header(content).map_err(malformed)?;
    let metadata =
        validate_header(&header, storage_location, relative_location).map_err(malformed)?;

    Ok(Fragment { metadata, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SKILL_MD: &str = r#"---
id: react-framework@acme
name: React
description: Component patterns for React
author: acme
version: "1.2.0"
category: frontend/framework
standalone: true
---

# React

Prefer function components.
"#;

    const MINIMAL_SKILL_MD: &str = "---\nid: logging-core\nname: Logging\ndescription: Structured logging\n---\nLog with fields.\n";

    fn parse(content: &str) -> Result<Fragment, CatalogError> {
        parse_fragment(content, Path::new("/catalog/x/SKILL.md"), "x/SKILL.md")
    }

    fn malformed_detail(content: &str) -> String {
        match parse(content) {
            Err(CatalogError::MalformedMetadata { detail, .. }) => detail,
            other => panic!("expected MalformedMetadata, got {other:?}"),
        }
    }

    #[test]
    fn parse_full_fragment() {
        let fragment = parse(FULL_SKILL_MD).unwrap();
        let meta = &fragment.metadata;

        assert_eq!(meta.canonical_id, "react-framework@acme");
        assert_eq!(meta.display_name, "React");
        assert_eq!(meta.author_tag.as_deref(), Some("acme"));
        assert_eq!(meta.version.as_deref(), Some("1.2.0"));
        assert_eq!(
            meta.legacy_path.as_deref(),
            Some("frontend/framework/react-framework (@acme)")
        );
        assert!(meta.standalone);
        assert_eq!(meta.relative_location, "x/SKILL.md");
        assert!(fragment.body.starts_with("# React"));
        assert!(fragment.body.contains("Prefer function components."));
    }

    #[test]
    fn parse_minimal_fragment() {
        let fragment = parse(MINIMAL_SKILL_MD).unwrap();
        assert_eq!(fragment.metadata.canonical_id, "logging-core");
        assert!(fragment.metadata.author_tag.is_none());
        assert!(fragment.metadata.legacy_path.is_none());
        assert_eq!(fragment.body, "Log with fields.\n");
    }

    #[test]
    fn parse_crlf_fragment() {
        let content = "---\r\nid: logging-core\r\nname: Logging\r\ndescription: Logs\r\n---\r\nBody\r\n";
        let fragment = parse(content).unwrap();
        assert_eq!(fragment.metadata.description, "Logs");
        assert_eq!(fragment.body, "Body\r\n");
    }

    #[test]
    fn author_field_alone_sets_author_tag() {
        let content = "---\nid: zustand\nname: Zustand\ndescription: State\nauthor: \"@vince\"\n---\n";
        let fragment = parse(content).unwrap();
        assert_eq!(fragment.metadata.author_tag.as_deref(), Some("vince"));
        assert_eq!(fragment.metadata.canonical_id, "zustand");
    }

    #[test]
    fn reject_missing_frontmatter() {
        let detail = malformed_detail("# No Frontmatter\n\nJust markdown.");
        assert!(detail.contains("must start with YAML frontmatter"));
    }

    #[test]
    fn reject_missing_closing_delimiter() {
        let detail = malformed_detail("---\nid: broken\nname: Broken\n");
        assert!(detail.contains("closing frontmatter"));
    }

    #[test]
    fn reject_missing_required_field() {
        let detail = malformed_detail("---\nid: logging-core\nname: Logging\n---\nbody\n");
        assert!(detail.contains("'description'"), "got: {detail}");

        let detail = malformed_detail("---\nname: Logging\ndescription: Logs\n---\n");
        assert!(detail.contains("'id'"), "got: {detail}");
    }

    #[test]
    fn reject_ids_violating_naming_rule() {
        for bad in ["React", "react_framework", "react--framework", "-react", "react@", "react@Acme"] {
            let content = format!("---\nid: \"{bad}\"\nname: X\ndescription: Y\n---\n");
            assert!(
                matches!(parse(&content), Err(CatalogError::MalformedMetadata { .. })),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn reject_author_disagreement() {
        let content = "---\nid: react@acme\nname: R\ndescription: R\nauthor: other\n---\n";
        assert!(malformed_detail(content).contains("disagrees"));
    }

    #[test]
    fn reject_invalid_semver() {
        let content = "---\nid: react\nname: R\ndescription: R\nversion: not-a-version\n---\n";
        assert!(malformed_detail(content).contains("invalid semver version"));
    }

    #[test]
    fn slug_rule() {
        assert!(is_slug("react"));
        assert!(is_slug("auth-oauth2"));
        assert!(!is_slug(""));
        assert!(!is_slug("auth--oauth"));
        assert!(!is_slug("auth-"));
        assert!(!is_slug("Auth"));
    }

    #[test]
    fn split_id_with_author() {
        assert_eq!(
            split_canonical_id("react@acme").unwrap(),
            ("react", Some("acme"))
        );
        assert_eq!(split_canonical_id("react").unwrap(), ("react", None));
        assert!(split_canonical_id("react@acme@x").is_err());
    }
}
