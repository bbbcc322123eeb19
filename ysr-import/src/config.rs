//! Configuration resolution for ysr-import
//!
//! Provides multi-tier configuration resolution. The OpenAI API key follows
//! Database → ENV → TOML priority; everything else follows CLI → ENV → TOML →
//! compiled defaults.

use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};
use ysr_common::config::TomlConfig;
use ysr_common::{Error, Result};

pub const OPENAI_API_KEY_ENV: &str = "YSR_OPENAI_API_KEY";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

/// Which extractor turns rows into records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// OpenAI chat completions
    #[default]
    OpenAi,
    /// Deterministic header-alias mapping
    Columns,
}

impl FromStr for ExtractorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ExtractorKind::OpenAi),
            "columns" => Ok(ExtractorKind::Columns),
            other => Err(Error::Config(format!(
                "Unknown extractor '{}' (expected 'openai' or 'columns')",
                other
            ))),
        }
    }
}

/// Settings of the OpenAI extractor
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

// The key stays out of logs
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    /// TOML values over compiled defaults
    pub fn from_toml(api_key: String, toml_config: &TomlConfig) -> Self {
        let section = &toml_config.openai;
        Self {
            api_key,
            model: section
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: section
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            temperature: section.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: section.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout_secs: section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Import endpoint settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub extractor: ExtractorKind,
    pub max_upload_bytes: usize,
}

impl ImportConfig {
    /// CLI/ENV extractor name over TOML over default
    pub fn resolve(cli_extractor: Option<&str>, toml_config: &TomlConfig) -> Result<Self> {
        let extractor = match cli_extractor.or(toml_config.import.extractor.as_deref()) {
            Some(name) => name.parse()?,
            None => ExtractorKind::default(),
        };

        let max_upload_mb = toml_config
            .import
            .max_upload_mb
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);
        if max_upload_mb == 0 {
            return Err(Error::Config("import.max_upload_mb must be at least 1".to_string()));
        }

        Ok(Self {
            extractor,
            max_upload_bytes: (max_upload_mb as usize) * 1024 * 1024,
        })
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::default(),
            max_upload_bytes: (DEFAULT_MAX_UPLOAD_MB as usize) * 1024 * 1024,
        }
    }
}

/// Resolve the OpenAI API key from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_openai_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<String> {
    let db_key = ysr_common::db::settings::get_openai_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(OPENAI_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .openai
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        ("database", db_key.is_some()),
        ("environment", env_key.is_some()),
        ("TOML", toml_key.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect();

    if sources.len() > 1 {
        warn!(
            "OpenAI API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = db_key {
        info!("OpenAI API key loaded from database");
        return Ok(key);
    }
    if let Some(key) = env_key {
        info!("OpenAI API key loaded from environment variable");
        return Ok(key);
    }
    if let Some(key) = toml_key {
        info!("OpenAI API key loaded from TOML config");
        return Ok(key);
    }

    Err(Error::Config(format!(
        "OpenAI API key not configured. Please configure using one of:\n\
         1. CLI: ysr-import set-openai-key <KEY>\n\
         2. Environment: {}=your-key-here\n\
         3. TOML config: [openai] api_key = \"your-key\"\n\
         \n\
         Or run without a language model: --extractor columns",
        OPENAI_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
