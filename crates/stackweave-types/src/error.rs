use std::path::PathBuf;

use thiserror::Error;

use crate::relationship::Cardinality;

/// Errors that make the catalog unusable for every consumer.
///
/// Any of these aborts the run before a single consumer pipeline starts.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate canonical id '{id}' declared by {} and {}", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("malformed metadata in {}: {detail}", .location.display())]
    MalformedMetadata { location: PathBuf, detail: String },

    #[error("invalid relationship declarations: {0}")]
    Relationship(String),

    #[error("invalid consumer registry: {0}")]
    Registry(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Taxonomy name used in reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "DuplicateIdError",
            Self::MalformedMetadata { .. } => "MalformedMetadataError",
            Self::Relationship(_) => "RelationshipError",
            Self::Registry(_) => "RegistryError",
            Self::Io { .. } => "IoError",
        }
    }
}

/// Errors scoped to a single consumer pipeline.
///
/// Every string field carries the reference as written in the failing
/// configuration entry, never an internal canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumerError {
    #[error("reference '{0}' does not resolve to any catalog fragment")]
    UnresolvedReference(String),

    #[error("'{subject}' conflicts with '{target}'{}", reason_suffix(.reason))]
    Conflict {
        subject: String,
        target: String,
        reason: Option<String>,
    },

    #[error("'{subject}' requires {cardinality} of [{}]{}", .targets.join(", "), reason_suffix(.reason))]
    MissingDependency {
        subject: String,
        targets: Vec<String>,
        cardinality: Cardinality,
        reason: Option<String>,
    },

    #[error("consumer '{0}' is not defined in the registry")]
    UnknownConsumer(String),

    #[error("compiled document is missing required marker '{0}'")]
    IncompleteDocument(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

impl ConsumerError {
    /// Taxonomy name used in reports and logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnresolvedReference(_) => "UnresolvedReferenceError",
            Self::Conflict { .. } => "ConflictError",
            Self::MissingDependency { .. } => "MissingDependencyError",
            Self::UnknownConsumer(_) => "UnknownConsumerError",
            Self::IncompleteDocument(_) => "IncompleteDocumentError",
        }
    }

    /// Compact form, e.g. `ConflictError(react-framework, vue-framework)`.
    pub fn signature(&self) -> String {
        let args = match self {
            Self::UnresolvedReference(reference) => reference.clone(),
            Self::Conflict { subject, target, .. } => format!("{subject}, {target}"),
            Self::MissingDependency {
                subject,
                targets,
                cardinality,
                ..
            } => format!("{subject}, [{}], {cardinality}", targets.join(", ")),
            Self::UnknownConsumer(name) => name.clone(),
            Self::IncompleteDocument(marker) => marker.clone(),
        };
        format!("{}({args})", self.code())
    }
}
