//! Subscription configuration.
//!
//! A subscription is a YAML file declaring the prioritized source list plus
//! run settings (output root, scratch directory, retry policy, naming
//! templates, failure mode).
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MEDLEY_OUTPUT, MEDLEY_WORKDIR)
//! 2. The subscription file
//! 3. Defaults (~/.medley)
//!
//! Relative paths in the file are resolved against the file's parent
//! directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::retry::RetryPolicy;
use crate::core::runner::FailureMode;
use crate::domain::SourceSet;
use crate::naming::NamingConfig;

/// Raw subscription file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionFile {
    /// Subscription name, used in logs and the run report
    pub name: String,

    /// Output library root (relative to the subscription file)
    pub output: Option<String>,

    /// Scratch directory for in-flight downloads
    pub working_directory: Option<String>,

    /// Failure mode, defaults to best-effort
    #[serde(default)]
    pub mode: FailureMode,

    /// Declared sources, highest priority first
    pub sources: Vec<SourceEntry>,

    /// Retry policy for extraction and media fetch
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Naming templates
    #[serde(default)]
    pub naming: NamingConfig,
}

/// One declared source in the subscription file
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub url: String,

    /// Optional display name for the resulting collection
    pub label: Option<String>,
}

/// Resolved subscription with absolute paths
#[derive(Debug, Clone)]
pub struct Subscription {
    pub name: String,
    pub output: PathBuf,
    pub working_directory: PathBuf,
    pub mode: FailureMode,
    pub retry: RetryPolicy,
    pub naming: NamingConfig,
    sources: SourceSet,
}

impl Subscription {
    /// Load and resolve a subscription from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read subscription file: {}", path.display()))?;

        let file = SubscriptionFile::from_yaml(&content)?;
        let base = path.parent().unwrap_or(Path::new("."));
        file.resolve(base)
    }

    /// The declared source set, ordinals assigned from declaration order
    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }
}

impl SubscriptionFile {
    /// Parse a subscription from YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: Self =
            serde_yaml::from_str(content).context("Failed to parse subscription YAML")?;
        file.validate()?;
        Ok(file)
    }

    /// Validate the subscription definition
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Subscription name cannot be empty");
        }

        if self.sources.is_empty() {
            anyhow::bail!("Subscription must declare at least one source");
        }

        for (i, source) in self.sources.iter().enumerate() {
            if source.url.is_empty() {
                anyhow::bail!("Source {} has an empty url", i);
            }
        }

        Ok(())
    }

    /// Resolve paths and build the source set.
    ///
    /// `base` is the directory the subscription file lives in.
    pub fn resolve(self, base: &Path) -> Result<Subscription> {
        let default_root = default_home().join(&self.name);

        let output = if let Ok(env_output) = std::env::var("MEDLEY_OUTPUT") {
            PathBuf::from(env_output)
        } else if let Some(ref output) = self.output {
            resolve_path(base, output)
        } else {
            default_root.join("library")
        };

        let working_directory = if let Ok(env_workdir) = std::env::var("MEDLEY_WORKDIR") {
            PathBuf::from(env_workdir)
        } else if let Some(ref workdir) = self.working_directory {
            resolve_path(base, workdir)
        } else {
            default_root.join("work")
        };

        let sources = SourceSet::from_declarations(
            self.sources
                .into_iter()
                .map(|entry| (entry.url, entry.label))
                .collect(),
        )?;

        Ok(Subscription {
            name: self.name,
            output,
            working_directory,
            mode: self.mode,
            retry: self.retry,
            naming: self.naming,
            sources,
        })
    }
}

/// Default per-user root (~/.medley)
fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".medley")
}

/// Resolve a path that may be relative to the subscription file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path_str)
    }
}
