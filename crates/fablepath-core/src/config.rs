// Configuration loading and parsing (config/fablepath.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Backend used when no config file overrides it.
pub const DEFAULT_BASE_URL: &str = "https://swiggy-98ox.onrender.com";

/// Number of choices before the client forces the story to conclude.
pub const DEFAULT_MAX_TURNS: u32 = 3;

const CONFIG_FILE_NAME: &str = "fablepath.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub story: StoryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the story backend, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. `None` waits for the transport to settle.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoryConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        StoryConfig {
            max_turns: default_max_turns(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/fablepath.toml` relative to `base_dir`.
///
/// This does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    let mut config = parse_config(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;
    normalize(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Parse config TOML text without touching the filesystem.
pub fn parse_config(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

/// Copy `defaults/fablepath.toml` into `config/` when the latter is missing.
/// Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let source = defaults_dir.join(CONFIG_FILE_NAME);
    if !source.is_file() {
        if !config_dir.join(CONFIG_FILE_NAME).is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/{CONFIG_FILE_NAME} nor config/{CONFIG_FILE_NAME} found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let target = config_dir.join(CONFIG_FILE_NAME);
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read {}: {e}", source.display()),
            })?;
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(vec![target])
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(vec![]),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures the default config file is copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn normalize(config: &mut Config) {
    let trimmed = config.backend.base_url.trim().trim_end_matches('/');
    config.backend.base_url = trimmed.to_string();
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = &config.backend.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "backend.base_url".into(),
            message: format!("must start with http:// or https://, got {url:?}"),
        });
    }

    if config.backend.request_timeout_secs == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "backend.request_timeout_secs".into(),
            message: "must be greater than 0 when set".into(),
        });
    }

    if config.story.max_turns == 0 {
        return Err(ConfigError::ValidationError {
            field: "story.max_turns".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
