//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing default TOML file is not an error: the service logs a warning and
//! starts with compiled defaults. A TOML file named explicitly (via `--config`)
//! must exist.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VSI_ROOT_FOLDER";

/// Directory name used under the platform config/data directories
const APP_DIR: &str = "vsi";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder for uploads and generated artifacts
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Vision-inference provider settings
///
/// Credentials may also come from the environment; see `vsi-ai` config
/// resolution for the priority rules.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    /// Provider endpoint base URL (e.g. `https://example.openai.azure.com/`)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model deployment name
    #[serde(default)]
    pub deployment: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Hard bound on a single inference call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Optional client-side throttle (calls per second)
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_version: default_api_version(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: 0.0,
            top_p: default_top_p(),
            requests_per_second: None,
        }
    }
}

/// Batch analysis tuning
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Images per inference call (provider batching limit)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_descriptive_max_tokens")]
    pub descriptive_max_tokens: u32,

    #[serde(default = "default_checker_max_tokens")]
    pub checker_max_tokens: u32,

    /// Retries per inference call on transient failure (0 disables retry)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_initial_backoff_ms")]
    pub retry_initial_backoff_ms: u64,

    #[serde(default = "default_retry_max_backoff_ms")]
    pub retry_max_backoff_ms: u64,

    /// Maximum photos accepted by one analyze request
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum request body size for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            descriptive_max_tokens: default_descriptive_max_tokens(),
            checker_max_tokens: default_checker_max_tokens(),
            max_retries: default_max_retries(),
            retry_initial_backoff_ms: default_retry_initial_backoff_ms(),
            retry_max_backoff_ms: default_retry_max_backoff_ms(),
            max_files: default_max_files(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_top_p() -> f32 {
    0.05
}

fn default_chunk_size() -> usize {
    8
}

fn default_descriptive_max_tokens() -> u32 {
    2500
}

fn default_checker_max_tokens() -> u32 {
    800
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_initial_backoff_ms() -> u64 {
    500
}

fn default_retry_max_backoff_ms() -> u64 {
    8_000
}

fn default_max_files() -> usize {
    100
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration for `module_name`
    ///
    /// With an explicit path the file must exist. Without one, the platform
    /// default path is tried and compiled defaults are used if it is absent.
    pub fn load(explicit_path: Option<&Path>, module_name: &str) -> Result<Self> {
        if let Some(path) = explicit_path {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            return Self::from_toml_str(&content);
        }

        let Some(path) = default_config_path(module_name) else {
            warn!("Could not determine config directory, using built-in defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }
}

/// Default TOML path for a module: `<config_dir>/vsi/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(format!("{}.toml", module_name)))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./vsi_data"))
}

/// Resolve the root folder
///
/// Priority: CLI argument → `VSI_ROOT_FOLDER` → TOML `root_folder` → OS default.
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

    default_root_folder()
}
