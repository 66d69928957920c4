//! Project configuration types.
//!
//! `ProjectConfig` represents the optional `weave.toml` at the project root
//! that locates the catalog, registry, relationship and stack documents.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level project configuration.
///
/// All paths are relative to the project directory. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: PathBuf,

    #[serde(default = "default_registry")]
    pub registry: PathBuf,

    #[serde(default = "default_relationships")]
    pub relationships: PathBuf,

    #[serde(default = "default_stacks_dir")]
    pub stacks_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub compile: CompileConfig,
}

fn default_catalog_dir() -> PathBuf {
    PathBuf::from("skills")
}

fn default_registry() -> PathBuf {
    PathBuf::from("agents.yaml")
}

fn default_relationships() -> PathBuf {
    PathBuf::from("relationships.yaml")
}

fn default_stacks_dir() -> PathBuf {
    PathBuf::from("stacks")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            catalog_dir: default_catalog_dir(),
            registry: default_registry(),
            relationships: default_relationships(),
            stacks_dir: default_stacks_dir(),
            output_dir: default_output_dir(),
            compile: CompileConfig::default(),
        }
    }
}

/// Settings for the per-consumer compile phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Upper bound on concurrently running consumer pipelines.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Write `report.json` next to the compiled documents.
    #[serde(default = "default_true")]
    pub write_report: bool,

    /// Emit packaged artifacts for fragments flagged `standalone`.
    #[serde(default = "default_true")]
    pub package_standalone: bool,
}

fn default_max_parallel() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            write_report: true,
            package_standalone: true,
        }
    }
}
