//! Application configuration for docweave.
//!
//! User config lives at `~/.docweave/docweave.toml`.
//! CLI flags override bundle option lines, which override config file
//! values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocweaveError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docweave.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docweave";

/// Extensions always treated as assemblable text.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".txt", ".md"];

// ---------------------------------------------------------------------------
// Config structs (matching docweave.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Extra file extensions (beyond `.txt`/`.md`) to treat as text,
    /// e.g. `[".log", ".conf"]`.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Include patterns applied when expanding directories.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Exclude patterns applied when expanding directories
    /// (exclude wins over include).
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Assemble options (runtime, merged from config + bundle options + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime options for one assembly invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Full list of recognized extensions, defaults plus additions,
    /// each with a leading dot.
    pub extensions: Vec<String>,
    /// Include patterns for directory expansion (empty = all).
    pub include_patterns: Vec<String>,
    /// Exclude patterns for directory expansion (exclude wins).
    pub exclude_patterns: Vec<String>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl AssembleOptions {
    /// Add extra extensions, normalizing to a leading dot and skipping
    /// duplicates.
    pub fn with_extensions(mut self, extra: &[String]) -> Self {
        for ext in extra {
            let normalized = if ext.starts_with('.') {
                ext.clone()
            } else {
                format!(".{ext}")
            };
            if !self.extensions.contains(&normalized) {
                self.extensions.push(normalized);
            }
        }
        self
    }

    /// True if the file's extension is in the recognized set.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().to_ascii_lowercase(),
            None => return false,
        };
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

impl From<&AppConfig> for AssembleOptions {
    fn from(config: &AppConfig) -> Self {
        let mut opts = AssembleOptions::default().with_extensions(&config.defaults.extensions);
        opts.include_patterns = config.defaults.include_patterns.clone();
        opts.exclude_patterns = config.defaults.exclude_patterns.clone();
        opts
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docweave/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocweaveError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docweave/docweave.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file
/// does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocweaveError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocweaveError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocweaveError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocweaveError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocweaveError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
