//! Run report types.
//!
//! One `ConsumerReport` per processed consumer, carrying the terminal status,
//! the last stage reached, and every diagnostic collected along the way.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConsumerError;
use crate::relationship::Advisory;

/// Per-consumer pipeline stages.
///
/// `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    Resolved,
    Validated,
    Compiled,
    Accepted,
    Rejected,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// The next stage on the success path. Terminal stages have none.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Resolved),
            Self::Resolved => Some(Self::Validated),
            Self::Validated => Some(Self::Compiled),
            Self::Compiled => Some(Self::Accepted),
            Self::Accepted | Self::Rejected => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Resolved => write!(f, "resolved"),
            Self::Validated => write!(f, "validated"),
            Self::Compiled => write!(f, "compiled"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumerStatus {
    Accepted,
    Rejected,
}

impl fmt::Display for ConsumerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "Accepted"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Advisory,
    Info,
}

/// A single finding attached to a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Taxonomy name, e.g. `ConflictError` or `Advisory`.
    pub code: String,
    /// Compact form, e.g. `ConflictError(react, vue)`.
    pub summary: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(err: &ConsumerError) -> Self {
        Self {
            severity: Severity::Error,
            code: err.code().to_owned(),
            summary: err.signature(),
            message: err.to_string(),
        }
    }

    pub fn advisory(advisory: &Advisory) -> Self {
        Self {
            severity: Severity::Advisory,
            code: "Advisory".to_owned(),
            summary: format!("Advisory({}, [{}])", advisory.subject, advisory.missing.join(", ")),
            message: advisory.to_string(),
        }
    }

    /// A diagnostic that is not tied to an error variant.
    pub fn note(severity: Severity, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_owned(),
            summary: code.to_owned(),
            message: message.into(),
        }
    }
}

/// Report entry for one consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub consumer: String,
    pub status: ConsumerStatus,
    /// The last stage reached before the terminal state.
    pub stage: PipelineStage,
    pub diagnostics: Vec<Diagnostic>,
    /// Where the compiled document was written, when accepted and written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// SHA-256 hex digest of the compiled document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConsumerReport {
    /// The first error diagnostic, if any.
    pub fn failure(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .iter()
            .find(|d| d.severity == Severity::Error)
    }
}

/// The aggregated report of one stack run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub stack: String,
    pub generated_at: DateTime<Utc>,
    pub consumers: Vec<ConsumerReport>,
}

impl RunReport {
    pub fn accepted(&self) -> usize {
        self.consumers
            .iter()
            .filter(|c| c.status == ConsumerStatus::Accepted)
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.consumers.len() - self.accepted()
    }

    pub fn is_success(&self) -> bool {
        self.rejected() == 0
    }

    pub fn get(&self, consumer: &str) -> Option<&ConsumerReport> {
        self.consumers.iter().find(|c| c.consumer == consumer)
    }
}
