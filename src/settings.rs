//! User settings loaded from YAML

use crate::opener::OpenerConfig;
use crate::workflow::DEFAULT_WORKFLOW_PATH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file contents; every field is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Variable to read the browser from instead of `BROWSER`
    pub browser_env: Option<String>,

    /// Variable to read the editor from instead of `EDITOR`
    pub editor_env: Option<String>,

    /// Workflow used by the `ci` commands
    pub workflow: PathBuf,

    /// Timeout for each locally run step (in seconds)
    pub step_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            browser_env: None,
            editor_env: None,
            workflow: PathBuf::from(DEFAULT_WORKFLOW_PATH),
            step_timeout_secs: 3600,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid settings {}", path.display()))
    }

    /// Parse settings from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(yaml)?;
        if settings.step_timeout_secs == 0 {
            anyhow::bail!("step_timeout_secs must be greater than zero");
        }
        Ok(settings)
    }

    /// Load `path` if given, else `fallback` if it exists, else defaults
    pub fn load(path: Option<&Path>, fallback: Option<&Path>) -> Result<Self> {
        match (path, fallback) {
            (Some(path), _) => Self::from_file(path),
            (None, Some(fallback)) if fallback.exists() => Self::from_file(fallback),
            _ => Ok(Self::default()),
        }
    }

    /// Opener configuration with these settings applied
    pub fn opener_config(&self) -> OpenerConfig {
        let mut config = OpenerConfig::default();
        if let Some(env) = &self.browser_env {
            config = config.with_browser_env(env.clone());
        }
        if let Some(env) = &self.editor_env {
            config = config.with_editor_env(env.clone());
        }
        config
    }
}
