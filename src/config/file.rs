//! TOML configuration file loading
//!
//! Supports `~/.config/vyra/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VyraConfigFile {
    /// Remote intent backend
    #[serde(default)]
    pub remote: RemoteFileConfig,

    /// Listening delays and wake phrases
    #[serde(default)]
    pub listening: ListeningFileConfig,

    /// Speech output
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Conversation history
    #[serde(default)]
    pub history: HistoryFileConfig,

    /// Data directory override
    pub data_dir: Option<String>,
}

/// Remote backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct RemoteFileConfig {
    /// Primary backend base URL
    pub primary_url: Option<String>,

    /// Fallback backend base URL
    pub fallback_url: Option<String>,

    /// Ask the backend for AI-augmented answers
    pub use_ai: Option<bool>,

    /// Per-request timeout in seconds (unset means no timeout)
    pub request_timeout_secs: Option<u64>,
}

/// Listening configuration
#[derive(Debug, Default, Deserialize)]
pub struct ListeningFileConfig {
    /// Wake phrases (e.g. `["hey vyra"]`)
    pub wake_phrases: Option<Vec<String>>,

    /// Delay between wake phrase and active capture
    pub activation_delay_ms: Option<u64>,

    /// Backoff after a wake-word recognition failure
    pub wake_retry_delay_ms: Option<u64>,

    /// Restart delay after a wake-word stream ends on its own
    pub wake_restart_delay_ms: Option<u64>,
}

/// Speech output configuration
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Rate used until the user picks one
    pub default_rate: Option<f32>,

    /// Pause between end of speech and the side effect
    pub effect_delay_ms: Option<u64>,
}

/// History configuration
#[derive(Debug, Default, Deserialize)]
pub struct HistoryFileConfig {
    /// Maximum retained exchanges
    pub capacity: Option<usize>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VyraConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> VyraConfigFile {
    config_file_path().map_or_else(VyraConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
#[must_use]
pub fn load_config_file_from(path: &Path) -> VyraConfigFile {
    if !path.exists() {
        return VyraConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VyraConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VyraConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/vyra/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("vyra").join("config.toml"))
}
