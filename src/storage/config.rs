//! Configuration handling for taskfn
//!
//! Configuration is stored in `.taskfn/config.toml` (project, searched upward
//! from the working directory) and `~/.config/taskfn/config.toml` (global).
//! Project settings win over global ones; custom statuses from both files are
//! merged over the built-in set.
//!
//! ```toml
//! [[statuses]]
//! symbol = "?"
//! name = "Question"
//! next_symbol = "x"
//! type = "TODO"
//!
//! [grouping]
//! ungrouped = "last"
//!
//! [output]
//! default_format = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Status, StatusRegistry, StatusType};
use crate::query::UngroupedPlacement;

/// Directory marking a taskfn project
pub const PROJECT_DIR: &str = ".taskfn";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A `[[statuses]]` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusEntry {
    pub symbol: String,
    pub name: String,
    pub next_symbol: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
}

impl StatusEntry {
    fn to_status(&self) -> Result<Status, ConfigError> {
        if self.symbol.chars().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "status symbol must be a single character, got '{}'",
                self.symbol
            )));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "status '{}' needs a name",
                self.symbol
            )));
        }
        Ok(Status::new(
            self.symbol.clone(),
            self.name.clone(),
            self.next_symbol.clone(),
            self.status_type,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GroupingSection {
    /// Placement for group lines that do not declare one
    pub ungrouped: Option<UngroupedPlacement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub default_format: Option<OutputFormat>,
}

/// Contents of one config file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub statuses: Vec<StatusEntry>,
    pub grouping: GroupingSection,
    pub output: OutputSection,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub statuses: StatusRegistry,
    pub ungrouped: UngroupedPlacement,
    pub default_format: OutputFormat,
    pub project_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            statuses: StatusRegistry::new(),
            ungrouped: UngroupedPlacement::default(),
            default_format: OutputFormat::default(),
            project_root: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Self::load_from(&cwd)
    }

    /// Loads the global file and the project file found upward of `start`
    pub fn load_from(start: &Path) -> Result<Self> {
        let global = match Self::global_config_dir() {
            Some(dir) => ConfigFile::read(&dir.join("config.toml"))?,
            None => ConfigFile::default(),
        };
        let project_root = Self::find_project_root(start);
        let project = match &project_root {
            Some(root) => ConfigFile::read(&root.join(PROJECT_DIR).join("config.toml"))?,
            None => ConfigFile::default(),
        };

        let mut config = Self::merge(&global, &project)?;
        config.project_root = project_root;
        Ok(config)
    }

    /// Applies `project` over `global` over the defaults
    pub fn merge(global: &ConfigFile, project: &ConfigFile) -> Result<Self, ConfigError> {
        let mut statuses = StatusRegistry::new();
        for entry in global.statuses.iter().chain(&project.statuses) {
            statuses.register(entry.to_status()?);
        }
        Ok(Self {
            statuses,
            ungrouped: project
                .grouping
                .ungrouped
                .or(global.grouping.ungrouped)
                .unwrap_or_default(),
            default_format: project
                .output
                .default_format
                .or(global.output.default_format)
                .unwrap_or_default(),
            project_root: None,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskfn", "taskfn").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds the project root by looking for a `.taskfn/` directory
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Returns true if we're in a taskfn project
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }
}
