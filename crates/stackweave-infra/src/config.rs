//! Project configuration loader.
//!
//! Reads `weave.toml` from the project directory and deserializes it into
//! [`ProjectConfig`]. A missing file means defaults; a file that fails to
//! parse is an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use stackweave_types::config::ProjectConfig;

pub const CONFIG_FILE: &str = "weave.toml";

/// Environment variable that overrides `output_dir`.
pub const OUTPUT_DIR_ENV: &str = "WEAVE_OUTPUT_DIR";

/// Load `{project_dir}/weave.toml`.
///
/// - If the file does not exist, returns [`ProjectConfig::default()`].
/// - If the file exists but fails to parse, returns the parse error.
pub async fn load_project_config(project_dir: &Path) -> anyhow::Result<ProjectConfig> {
    let config_path = project_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return Ok(ProjectConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", config_path.display()));
        }
    };

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))
}

/// Apply environment overrides on top of the file values.
///
/// `lookup` is `std::env::var` in production and a map in tests.
pub fn apply_env_overrides(
    mut config: ProjectConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ProjectConfig {
    if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|d| !d.trim().is_empty()) {
        tracing::debug!(output_dir = %dir, "output directory overridden from environment");
        config.output_dir = PathBuf::from(dir);
    }
    config
}

/// A project directory with its resolved configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Load the configuration for `root`, with environment overrides applied.
    pub async fn load(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let config = load_project_config(&root).await?;
        let config = apply_env_overrides(config, |key| std::env::var(key).ok());
        Ok(Self { root, config })
    }

    /// Resolve a configured path against the project root. Absolute paths are kept.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn catalog_dir(&self) -> PathBuf {
        self.resolve(&self.config.catalog_dir)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.resolve(&self.config.registry)
    }

    pub fn relationships_path(&self) -> PathBuf {
        self.resolve(&self.config.relationships)
    }

    pub fn stacks_dir(&self) -> PathBuf {
        self.resolve(&self.config.stacks_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.config.output_dir)
    }

    /// Path of a stack document: `{stacks_dir}/{name}.yaml`, or `.yml` if only that exists.
    pub fn stack_path(&self, name: &str) -> PathBuf {
        let dir = self.stacks_dir();
        let yaml = dir.join(format!("{name}.yaml"));
        if yaml.exists() {
            return yaml;
        }
        let yml = dir.join(format!("{name}.yml"));
        if yml.exists() { yml } else { yaml }
    }
}
