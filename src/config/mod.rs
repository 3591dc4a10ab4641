//! Configuration management for Vyra
//!
//! Values are layered `env > TOML file > defaults`.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::history::DEFAULT_CAPACITY;
use crate::session::DEFAULT_SPEECH_RATE;
use crate::voice::DEFAULT_WAKE_PHRASES;
use crate::{Error, Result};

use self::file::VyraConfigFile;

/// Hosted backend
pub const DEFAULT_PRIMARY_URL: &str = "https://voice-assistant-backend.onrender.com";

/// Backend run next to the assistant during development
pub const DEFAULT_FALLBACK_URL: &str = "http://localhost:5000";

/// Vyra configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote intent backend
    pub remote: RemoteConfig,

    /// Listening state machine
    pub listening: ListeningConfig,

    /// Speech output
    pub speech: SpeechConfig,

    /// Maximum retained conversation exchanges
    pub history_capacity: usize,

    /// Path to data directory (settings file)
    pub data_dir: PathBuf,
}

/// Remote backend configuration
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Primary base URL (`VYRA_BACKEND_URL`)
    pub primary_url: String,

    /// Fallback base URL (`VYRA_FALLBACK_BACKEND_URL`)
    pub fallback_url: String,

    /// Request AI-augmented answers
    pub use_ai: bool,

    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            use_ai: true,
            request_timeout: None,
        }
    }
}

/// Listening configuration
#[derive(Debug, Clone)]
pub struct ListeningConfig {
    /// Phrases that wake the assistant
    pub wake_phrases: Vec<String>,

    /// Wake phrase to active capture
    pub activation_delay: Duration,

    /// Backoff after a wake-word failure
    pub wake_retry_delay: Duration,

    /// Restart delay after a wake-word stream ends
    pub wake_restart_delay: Duration,
}

impl Default for ListeningConfig {
    fn default() -> Self {
        Self {
            wake_phrases: DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect(),
            activation_delay: Duration::from_millis(1500),
            wake_retry_delay: Duration::from_millis(1000),
            wake_restart_delay: Duration::from_millis(100),
        }
    }
}

/// Speech output configuration
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Rate used when none is stored
    pub default_rate: f32,

    /// Pause between end of speech and the side effect
    pub effect_delay: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            default_rate: DEFAULT_SPEECH_RATE,
            effect_delay: Duration::from_millis(500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            listening: ListeningConfig::default(),
            speech: SpeechConfig::default(),
            history_capacity: DEFAULT_CAPACITY,
            data_dir: default_data_dir(),
        }
    }
}

/// Default data directory: `~/.local/share/vyra` on Linux
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(|| PathBuf::from(".vyra"), |d| d.data_dir().join("vyra"))
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve a parsed config file, with `env` looked up first
    ///
    /// # Errors
    ///
    /// Returns error if a backend URL does not parse, the default speech rate
    /// is not positive or the history capacity is zero
    pub fn resolve(fc: VyraConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let remote = RemoteConfig {
            primary_url: env("VYRA_BACKEND_URL")
                .or(fc.remote.primary_url)
                .unwrap_or(defaults.remote.primary_url),
            fallback_url: env("VYRA_FALLBACK_BACKEND_URL")
                .or(fc.remote.fallback_url)
                .unwrap_or(defaults.remote.fallback_url),
            use_ai: fc.remote.use_ai.unwrap_or(defaults.remote.use_ai),
            request_timeout: fc.remote.request_timeout_secs.map(Duration::from_secs),
        };
        for (name, value) in [
            ("primary_url", &remote.primary_url),
            ("fallback_url", &remote.fallback_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("invalid remote.{name} {value:?}: {e}")))?;
        }

        let listening = ListeningConfig {
            wake_phrases: fc
                .listening
                .wake_phrases
                .unwrap_or(defaults.listening.wake_phrases),
            activation_delay: fc
                .listening
                .activation_delay_ms
                .map_or(defaults.listening.activation_delay, Duration::from_millis),
            wake_retry_delay: fc
                .listening
                .wake_retry_delay_ms
                .map_or(defaults.listening.wake_retry_delay, Duration::from_millis),
            wake_restart_delay: fc
                .listening
                .wake_restart_delay_ms
                .map_or(defaults.listening.wake_restart_delay, Duration::from_millis),
        };

        let speech = SpeechConfig {
            default_rate: fc.speech.default_rate.unwrap_or(defaults.speech.default_rate),
            effect_delay: fc
                .speech
                .effect_delay_ms
                .map_or(defaults.speech.effect_delay, Duration::from_millis),
        };
        if !(speech.default_rate.is_finite() && speech.default_rate > 0.0) {
            return Err(Error::Config(format!(
                "speech.default_rate must be positive, got {}",
                speech.default_rate
            )));
        }

        let history_capacity = fc.history.capacity.unwrap_or(defaults.history_capacity);
        if history_capacity == 0 {
            return Err(Error::Config("history.capacity must be at least 1".to_string()));
        }

        let data_dir = env("VYRA_DATA_DIR")
            .or(fc.data_dir)
            .map_or(defaults.data_dir, PathBuf::from);

        tracing::debug!(
            primary = %remote.primary_url,
            fallback = %remote.fallback_url,
            data_dir = %data_dir.display(),
            "configuration resolved"
        );

        Ok(Self {
            remote,
            listening,
            speech,
            history_capacity,
            data_dir,
        })
    }

    /// Path of the persisted settings file
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
