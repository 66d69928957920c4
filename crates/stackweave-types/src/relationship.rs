//! Relationship declarations between fragments.
//!
//! `relationships.yaml` carries the alias map and the compatibility rules.
//! Rule members are written with any reference form the resolver
//! understands; they are resolved to canonical ids once, at load.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a relationship rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Subjects and targets must not be selected together.
    Conflict,
    /// Selecting a subject needs targets per the rule's cardinality.
    Requires,
    /// Non-blocking: missing targets produce an advisory.
    Recommends,
    /// Informational: targets can replace the subject.
    Alternative,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict"),
            Self::Requires => write!(f, "requires"),
            Self::Recommends => write!(f, "recommends"),
            Self::Alternative => write!(f, "alternative"),
        }
    }
}

/// How many targets of a `requires` rule must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    All,
    Any,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Any => write!(f, "any"),
        }
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// One rule as written in `relationships.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDecl {
    pub kind: RuleKind,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The whole `relationships.yaml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipsFile {
    /// `short name -> canonical id`.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

// ---------------------------------------------------------------------------
// Loaded rules
// ---------------------------------------------------------------------------

/// A rule member: the name as declared plus the canonical id it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMember {
    pub declared: String,
    pub canonical_id: String,
}

/// A relationship rule with every member resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipRule {
    pub kind: RuleKind,
    pub subjects: Vec<RuleMember>,
    pub targets: Vec<RuleMember>,
    pub cardinality: Cardinality,
    pub reason: Option<String>,
}

impl RelationshipRule {
    /// A conflict rule whose subject and target sets are the same group:
    /// any two distinct members conflict.
    pub fn is_exclusive_group(&self) -> bool {
        self.kind == RuleKind::Conflict
            && self.subjects.len() == self.targets.len()
            && self
                .subjects
                .iter()
                .all(|s| self.targets.iter().any(|t| t.canonical_id == s.canonical_id))
    }
}

/// A non-blocking finding produced by a `recommends` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    /// The selected subject, as referenced in the stack.
    pub subject: String,
    /// Recommended fragments that are not selected, as declared in the rule.
    pub missing: Vec<String>,
    pub reason: Option<String>,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' recommends [{}]",
            self.subject,
            self.missing.join(", ")
        )?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}
