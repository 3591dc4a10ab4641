//! Session context: session id plus the persisted feature toggles
//!
//! The session id lives for one process run and is never written to the
//! store. The wake-word flag, remote flag and speech rate are read from the
//! store at startup and written back on every change.

mod store;

pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};

use crate::{Error, Result};

/// Settings key for the wake-word toggle
pub const WAKE_WORD_KEY: &str = "wake_word";
/// Settings key for the remote-intent toggle
pub const USE_AI_KEY: &str = "use_ai";
/// Settings key for the speech rate
pub const VOICE_SPEED_KEY: &str = "voice_speed";

/// Default speech rate multiplier
pub const DEFAULT_SPEECH_RATE: f32 = 1.0;

/// Per-run assistant state shared by the engine components
pub struct SessionContext {
    session_id: String,
    wake_word_enabled: bool,
    remote_intent_enabled: bool,
    speech_rate: f32,
    store: Box<dyn SettingsStore>,
}

impl SessionContext {
    /// Load persisted toggles from `store` and mint a fresh session id
    ///
    /// Unparseable or missing values fall back to defaults: both toggles off
    /// and `default_rate` for the speech rate.
    #[must_use]
    pub fn load(store: impl SettingsStore + 'static, default_rate: f32) -> Self {
        let wake_word_enabled = parse_flag(store.get(WAKE_WORD_KEY).as_deref());
        let remote_intent_enabled = parse_flag(store.get(USE_AI_KEY).as_deref());
        let speech_rate = store
            .get(VOICE_SPEED_KEY)
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|r| valid_rate(*r))
            .unwrap_or(default_rate);

        let session_id = generate_session_id();
        tracing::info!(
            session_id = %session_id,
            wake_word_enabled,
            remote_intent_enabled,
            speech_rate,
            "session started"
        );

        Self {
            session_id,
            wake_word_enabled,
            remote_intent_enabled,
            speech_rate,
            store: Box::new(store),
        }
    }

    /// Opaque id for this process run
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether wake-word listening is enabled
    #[must_use]
    pub const fn wake_word_enabled(&self) -> bool {
        self.wake_word_enabled
    }

    /// Whether utterances go to the remote backend first
    #[must_use]
    pub const fn remote_intent_enabled(&self) -> bool {
        self.remote_intent_enabled
    }

    /// Speech playback rate multiplier
    #[must_use]
    pub const fn speech_rate(&self) -> f32 {
        self.speech_rate
    }

    /// Enable or disable wake-word listening and persist it
    ///
    /// # Errors
    ///
    /// Returns error if the settings store cannot be written
    pub fn set_wake_word_enabled(&mut self, enabled: bool) -> Result<()> {
        self.wake_word_enabled = enabled;
        self.store.set(WAKE_WORD_KEY, bool_str(enabled))
    }

    /// Enable or disable remote intent resolution and persist it
    ///
    /// # Errors
    ///
    /// Returns error if the settings store cannot be written
    pub fn set_remote_intent_enabled(&mut self, enabled: bool) -> Result<()> {
        self.remote_intent_enabled = enabled;
        self.store.set(USE_AI_KEY, bool_str(enabled))
    }

    /// Change the speech rate and persist it
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` for a non-finite or non-positive rate, or an
    /// error if the settings store cannot be written
    pub fn set_speech_rate(&mut self, rate: f32) -> Result<()> {
        if !valid_rate(rate) {
            return Err(Error::InvalidSetting {
                key: VOICE_SPEED_KEY,
                reason: format!("speech rate must be a positive number, got {rate}"),
            });
        }
        self.speech_rate = rate;
        self.store.set(VOICE_SPEED_KEY, &rate.to_string())
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.session_id)
            .field("wake_word_enabled", &self.wake_word_enabled)
            .field("remote_intent_enabled", &self.remote_intent_enabled)
            .field("speech_rate", &self.speech_rate)
            .finish_non_exhaustive()
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

const fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn valid_rate(rate: f32) -> bool {
    rate.is_finite() && rate > 0.0
}

/// `session_<unix millis>_<9 random chars>`
fn generate_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{millis}_{}", &suffix[..9])
}
