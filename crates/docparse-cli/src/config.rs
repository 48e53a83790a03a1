//! Configuration file handling for `.docparse.toml`
//!
//! Configuration files can be placed in:
//! - User home directory: `~/.docparse.toml` (user defaults)
//! - Project directory: `./.docparse.toml` (project defaults)
//! - Custom location via `--config` (replaces both)
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. Project config
//! 3. User config
//! 4. Built-in defaults

use anyhow::{Context, Result};
use docparse_backend::{ParserConfig, TxtOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the home and working directories
pub const CONFIG_FILE_NAME: &str = ".docparse.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Defaults for the parse and batch commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse: Option<ParseConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    /// Default output format (json or text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// TXT soft confidence threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soft_confidence_threshold: Option<f32>,

    /// TXT hard confidence floor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_confidence_floor: Option<f32>,

    /// Maximum PDF pages to extract text from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,

    /// Default compact JSON output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact: Option<bool>,
}

impl ParseConfig {
    /// Overlay `other` on top of `self`; set fields in `other` win
    fn overlay(self, other: Self) -> Self {
        Self {
            output: other.output.or(self.output),
            soft_confidence_threshold: other
                .soft_confidence_threshold
                .or(self.soft_confidence_threshold),
            hard_confidence_floor: other.hard_confidence_floor.or(self.hard_confidence_floor),
            max_pages: other.max_pages.or(self.max_pages),
            compact: other.compact.or(self.compact),
        }
    }

    /// Build parser options from these settings and CLI overrides
    ///
    /// Thresholds are not validated here; `ParserFactory::new` does that.
    pub fn parser_config(&self, password: Option<String>, max_pages: Option<usize>) -> ParserConfig {
        let defaults = TxtOptions::default();
        let txt = TxtOptions {
            soft_confidence_threshold: self
                .soft_confidence_threshold
                .unwrap_or(defaults.soft_confidence_threshold),
            hard_confidence_floor: self
                .hard_confidence_floor
                .unwrap_or(defaults.hard_confidence_floor),
        };
        ParserConfig {
            password,
            txt,
            max_pages: max_pages.or(self.max_pages),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load user and project configs and merge them
    ///
    /// Unreadable discovered files are skipped with a warning.
    pub fn discover() -> Self {
        let user = dirs::home_dir().and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME)));
        let project = Self::load_optional(&PathBuf::from(CONFIG_FILE_NAME));
        Self::merge(user, project)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                log::debug!("Loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {e:#}", path.display());
                None
            }
        }
    }

    /// Merge configs with precedence project > user > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let user = user_config.and_then(|c| c.parse);
        let project = project_config.and_then(|c| c.parse);
        let parse = match (user, project) {
            (None, None) => None,
            (Some(user), None) => Some(user),
            (None, Some(project)) => Some(project),
            (Some(user), Some(project)) => Some(user.overlay(project)),
        };
        Self { parse }
    }

    /// Parse settings, or defaults when no `[parse]` table was found
    pub fn parse_settings(&self) -> ParseConfig {
        self.parse.clone().unwrap_or_default()
    }
}
