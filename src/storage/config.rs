//! Configuration handling
//!
//! Site configuration lives in `markweave.toml` at the site root; user
//! preferences in `config.toml` under the platform config directory
//! (`~/.config/markweave/` on Linux). Command-line flags override both.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DEFAULT_ORDERED_LEVELS, DEFAULT_REFERENCE_LEVELS};
use crate::git::GitSettings;
use crate::markdown::PipelineSettings;

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "markweave.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// How git is invoked for change annotations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Executable name or path
    pub command: String,

    /// Upper bound for a single git invocation
    pub timeout_seconds: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        let settings = GitSettings::default();
        Self {
            command: settings.command,
            timeout_seconds: settings.timeout.as_secs(),
        }
    }
}

impl GitConfig {
    pub fn settings(&self) -> GitSettings {
        GitSettings {
            command: self.command.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }
}

/// Site-level configuration (`markweave.toml`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Reference document whose headings become linkable terms
    pub reference: Option<PathBuf>,

    /// Heading levels of the reference document that define terms
    pub reference_levels: Vec<u8>,

    /// TOC levels rendered as ordered lists
    pub toc_ordered_levels: Vec<u8>,

    /// Render opening curly quotes as closing ones
    pub swedish_quotes: bool,

    /// Write pages here instead of next to their sources
    pub output_dir: Option<PathBuf>,

    pub git: GitConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            reference: None,
            reference_levels: DEFAULT_REFERENCE_LEVELS.to_vec(),
            toc_ordered_levels: DEFAULT_ORDERED_LEVELS.to_vec(),
            swedish_quotes: false,
            output_dir: None,
            git: GitConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Rejects heading levels outside 1..=6 and a zero git timeout
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut levels = self.reference_levels.iter().chain(&self.toc_ordered_levels);
        if let Some(level) = levels.find(|l| !(1..=6).contains(*l)) {
            return Err(ConfigError::Invalid(format!(
                "heading level {} is outside 1..=6",
                level
            )));
        }

        if self.git.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "git.timeout_seconds must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            git: self.git.settings(),
            swedish_quotes: self.swedish_quotes,
            toc_ordered_levels: self.toc_ordered_levels.iter().copied().collect(),
        }
    }

    pub fn reference_level_set(&self) -> BTreeSet<u8> {
        self.reference_levels.iter().copied().collect()
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Log debug details by default
    pub verbose: bool,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + site)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for the site containing the working directory
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific site root
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "markweave", "markweave").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads site configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read site config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse site config: {}", config_path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid site config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Finds the site root by walking up from the working directory
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Finds the nearest directory at or above `start` holding `markweave.toml`
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Site root, or the working directory outside a configured site
    pub fn root_or_cwd(&self) -> Result<PathBuf> {
        match &self.project_root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("Failed to read working directory"),
        }
    }

    /// Resolves a configured path against the site root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
