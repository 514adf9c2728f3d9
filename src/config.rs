/*============================================================
  Synavera Project: setup-cue
  Module: setup_cue::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load optional TOML configuration and resolve the cache,
    temp and log locations used by an install.

  Security / Safety Notes:
    Reads a single operator-owned file; values are paths and
    URLs only and are never executed.

  Dependencies:
    serde + toml for parsing, dirs for platform directories.

  Operational Scope:
    Consulted once at start-up; CLI flags and runner variables
    override what is read here.

  Revision History:
    2025-11-02 COD  Authored configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit precedence: flag > environment > file > default
    - Missing file is not an error; malformed file is
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SetupError};
use crate::resolver::RELEASE_BASE_URL;

const APP_DIR: &str = "setup-cue";

/// Runner variable naming the shared tool cache.
pub const TOOL_CACHE_ENV: &str = "RUNNER_TOOL_CACHE";
/// Runner variable naming the per-job temp directory.
pub const RUNNER_TEMP_ENV: &str = "RUNNER_TEMP";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetupConfig {
    pub cache_root: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub keep_temp: bool,
    pub download: DownloadConfig,
}

/// Settings for the HTTP fetcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadConfig {
    pub base_url: String,
    /// Seconds; 0 disables the timeout.
    pub timeout: u64,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: RELEASE_BASE_URL.to_string(),
            timeout: 0,
            user_agent: format!("setup-cue/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SetupConfig {
    /// Load from `path`, or from the default location if it exists.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            SetupError::Config(format!("Failed to read config {}: {err}", path.display()))
        })?;
        Self::from_toml(&text).map_err(|err| match err {
            SetupError::Config(msg) => SetupError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| SetupError::Config(err.to_string()))
    }

    /// Tool cache root: flag, then `RUNNER_TOOL_CACHE`, then file, then user cache dir.
    pub fn cache_root(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = non_empty_env(TOOL_CACHE_ENV) {
            return Ok(path);
        }
        if let Some(path) = &self.cache_root {
            return Ok(path.clone());
        }
        dirs::cache_dir()
            .map(|dir| dir.join(APP_DIR).join("tool-cache"))
            .ok_or_else(|| {
                SetupError::Config(format!(
                    "Unable to locate a cache directory; set {TOOL_CACHE_ENV} or cache_root"
                ))
            })
    }

    /// Parent directory for per-install temp workspaces.
    pub fn temp_root(&self) -> PathBuf {
        non_empty_env(RUNNER_TEMP_ENV)
            .or_else(|| self.temp_dir.clone())
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::cache_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
