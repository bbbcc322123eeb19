//! Configuration loading and root folder resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not an error: the service starts on defaults and
//! logs a warning. A TOML file that exists but cannot be parsed is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "YSR_ROOT_FOLDER";

/// SQLite database file name inside the root folder
pub const DATABASE_FILE: &str = "ysr.db";

/// Directory for request-scoped upload files inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Contents of `ysr-import.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database and temporary uploads
    pub root_folder: Option<PathBuf>,
    /// HTTP listen address, e.g. `127.0.0.1:5810`
    pub bind_address: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub openai: OpenAiSection,
    #[serde(default)]
    pub import: ImportSection,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[openai]` section; every field optional, defaults live in the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// `[import]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSection {
    /// `"openai"` or `"columns"`
    pub extractor: Option<String>,
    pub max_upload_mb: Option<u64>,
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: "127.0.0.1:5810".to_string(),
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ysr"))
        .unwrap_or_else(|| PathBuf::from("./ysr_data"))
}

/// Default TOML config location (`<config_dir>/ysr/ysr-import.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ysr").join("ysr-import.toml"))
}

/// Load TOML config, falling back to defaults when the file does not exist
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the root folder: CLI → environment → TOML → compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    CompiledDefaults::for_current_platform().root_folder
}

/// Root folder layout (database file + uploads directory)
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder and uploads directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.path.join(UPLOADS_DIR)
    }
}
