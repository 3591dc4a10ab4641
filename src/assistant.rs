//! Assistant engine
//!
//! Turns utterances into intents (remote backend first when enabled, local
//! matcher otherwise), records every exchange, and realizes the reply as
//! speech followed by the optional side effect. Also owns the user-facing
//! settings operations, since each one persists through the session.

use std::sync::Arc;
use std::time::Duration;

use crate::Result;
use crate::effects::UrlOpener;
use crate::history::{ConversationLog, HistoryEntry};
use crate::intent::{Intent, TranscriptMatcher, Utterance};
use crate::remote::{BackendStatus, IntentBackend};
use crate::session::SessionContext;
use crate::voice::SpeechOutput;

/// Shown after the log is wiped
pub const HISTORY_CLEARED: &str = "Chat history cleared!";

const WAKE_ENABLED_DISPLAY: &str = "Wake word enabled. Say \"Hey Vyra\" to activate!";
const WAKE_ENABLED_SPOKEN: &str = "Wake word enabled. Just say Hey Vyra to activate me.";
const WAKE_DISABLED_DISPLAY: &str = "Wake word disabled. Tap the microphone to speak.";

/// Speaks replies and runs their side effects
#[derive(Clone)]
pub struct Realizer {
    speech: Arc<dyn SpeechOutput>,
    opener: Arc<dyn UrlOpener>,
    effect_delay: Duration,
}

impl Realizer {
    /// Create a realizer that waits `effect_delay` after speech before acting
    #[must_use]
    pub fn new(
        speech: Arc<dyn SpeechOutput>,
        opener: Arc<dyn UrlOpener>,
        effect_delay: Duration,
    ) -> Self {
        Self {
            speech,
            opener,
            effect_delay,
        }
    }

    /// Speak the reply, then run the side effect
    ///
    /// The side effect follows `effect_delay` after playback ends, or
    /// immediately if playback failed. Failures are logged, never returned.
    pub async fn realize(&self, intent: &Intent, rate: f32) {
        let spoke = self.say(intent.reply_text(), rate).await;

        let Some(effect) = intent.side_effect() else {
            return;
        };
        if spoke {
            tokio::time::sleep(self.effect_delay).await;
        }
        let url = effect.url();
        if let Err(e) = self.opener.open(&url) {
            tracing::warn!(url = %url, error = %e, "failed to run side effect");
        }
    }

    /// Speak `text`; returns whether playback completed
    pub async fn say(&self, text: &str, rate: f32) -> bool {
        match self.speech.speak(text, rate).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "speech playback failed");
                false
            }
        }
    }

    /// Show `text` without speaking it
    pub fn notify(&self, text: &str) {
        self.speech.display(text);
    }
}

impl std::fmt::Debug for Realizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realizer")
            .field("effect_delay", &self.effect_delay)
            .finish_non_exhaustive()
    }
}

/// Intent dispatch plus conversation state
pub struct Assistant {
    session: SessionContext,
    log: ConversationLog,
    matcher: TranscriptMatcher,
    backend: Option<Arc<dyn IntentBackend>>,
    use_ai: bool,
    realizer: Realizer,
}

impl Assistant {
    /// Local-only assistant
    #[must_use]
    pub fn new(
        session: SessionContext,
        log: ConversationLog,
        matcher: TranscriptMatcher,
        realizer: Realizer,
    ) -> Self {
        Self {
            session,
            log,
            matcher,
            backend: None,
            use_ai: false,
            realizer,
        }
    }

    /// Attach a remote backend, used while remote mode is enabled
    ///
    /// `use_ai` is forwarded with every request.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn IntentBackend>, use_ai: bool) -> Self {
        self.backend = Some(backend);
        self.use_ai = use_ai;
        self
    }

    /// Session settings
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Reply and side-effect realizer
    #[must_use]
    pub const fn realizer(&self) -> &Realizer {
        &self.realizer
    }

    /// Conversation history, most recent first
    #[must_use]
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.log.snapshot()
    }

    /// Resolve an utterance and record the exchange
    ///
    /// Remote failures fall back to the local matcher, so this always yields
    /// an intent.
    pub async fn dispatch(&mut self, utterance: &Utterance) -> Intent {
        let intent = match self.remote_backend() {
            Some(backend) => {
                match backend
                    .resolve(utterance, self.session.session_id(), self.use_ai)
                    .await
                {
                    Ok(intent) => intent,
                    Err(e) => {
                        tracing::warn!(error = %e, "remote resolution failed, using local matcher");
                        self.matcher.resolve(utterance.text())
                    }
                }
            }
            None => self.matcher.resolve(utterance.text()),
        };

        self.log.append(utterance.text(), intent.reply_text());
        tracing::debug!(history_len = self.log.len(), "recorded exchange");
        intent
    }

    /// Dispatch an utterance and realize the reply
    pub async fn respond(&mut self, utterance: &Utterance) -> Intent {
        let intent = self.dispatch(utterance).await;
        self.realizer
            .realize(&intent, self.session.speech_rate())
            .await;
        intent
    }

    /// Speak `text` at the session's rate
    pub async fn say(&self, text: &str) -> bool {
        self.realizer.say(text, self.session.speech_rate()).await
    }

    /// Enable or disable wake-word listening and tell the user
    ///
    /// # Errors
    ///
    /// Returns error if the setting cannot be persisted
    pub async fn set_wake_word(&mut self, enabled: bool) -> Result<()> {
        self.session.set_wake_word_enabled(enabled)?;
        tracing::info!(enabled, "wake word toggled");

        if enabled {
            self.realizer.notify(WAKE_ENABLED_DISPLAY);
            self.say(WAKE_ENABLED_SPOKEN).await;
        } else {
            self.realizer.notify(WAKE_DISABLED_DISPLAY);
        }
        Ok(())
    }

    /// Enable or disable remote resolution
    ///
    /// Enabling probes the backend; if it is offline, remote mode is switched
    /// back off. Returns the probe result, if one ran.
    ///
    /// # Errors
    ///
    /// Returns error if the setting cannot be persisted
    pub async fn set_remote_enabled(&mut self, enabled: bool) -> Result<Option<BackendStatus>> {
        self.session.set_remote_intent_enabled(enabled)?;
        tracing::info!(enabled, "remote mode toggled");

        if enabled {
            self.check_backend().await
        } else {
            self.realizer.notify("Remote mode off. Answering locally.");
            Ok(None)
        }
    }

    /// Probe the backend and report its status
    ///
    /// An offline backend disables remote mode. Returns `None` if no backend
    /// is attached.
    ///
    /// # Errors
    ///
    /// Returns error if disabling remote mode cannot be persisted
    pub async fn check_backend(&mut self) -> Result<Option<BackendStatus>> {
        let Some(backend) = self.backend.clone() else {
            return Ok(None);
        };

        let status = backend.health().await;
        self.realizer.notify(&format!("Backend: {status}"));

        if status == BackendStatus::Offline && self.session.remote_intent_enabled() {
            tracing::warn!("backend offline, disabling remote mode");
            self.session.set_remote_intent_enabled(false)?;
        }
        Ok(Some(status))
    }

    /// Change the speech rate
    ///
    /// # Errors
    ///
    /// Returns `InvalidSetting` for a non-positive rate, or an error if the
    /// setting cannot be persisted
    pub fn set_speech_rate(&mut self, rate: f32) -> Result<()> {
        self.session.set_speech_rate(rate)?;
        tracing::info!(rate, "speech rate changed");
        self.realizer.notify(&format!("Voice speed: {rate:.1}x"));
        Ok(())
    }

    /// Clear local history, then the backend's copy when remote mode is on
    ///
    /// A backend failure is logged and does not undo the local clear.
    pub async fn clear_history(&mut self) {
        self.log.clear();
        tracing::info!("local history cleared");

        if let Some(backend) = self.remote_backend() {
            match backend.clear_history(self.session.session_id()).await {
                Ok(()) => tracing::debug!("remote history cleared"),
                Err(e) => tracing::warn!(error = %e, "failed to clear remote history"),
            }
        }
        self.realizer.notify(HISTORY_CLEARED);
    }

    fn remote_backend(&self) -> Option<Arc<dyn IntentBackend>> {
        self.backend
            .as_ref()
            .filter(|_| self.session.remote_intent_enabled())
            .map(Arc::clone)
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("session", &self.session)
            .field("history_len", &self.log.len())
            .field("has_backend", &self.backend.is_some())
            .field("use_ai", &self.use_ai)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::effects::LogOpener;
    use crate::intent::SideEffect;
    use crate::session::MemorySettingsStore;
    use crate::{Error, Result};

    #[derive(Default)]
    struct ScriptedSpeech {
        fail: bool,
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechOutput for ScriptedSpeech {
        async fn speak(&self, text: &str, _rate: f32) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(Error::Speech("synthesizer unavailable".to_string()));
            }
            Ok(())
        }

        fn display(&self, _text: &str) {}
    }

    fn assistant(speech: Arc<ScriptedSpeech>, opener: Arc<LogOpener>) -> Assistant {
        Assistant::new(
            SessionContext::load(MemorySettingsStore::new(), 1.0),
            ConversationLog::default(),
            TranscriptMatcher::with_seed(1),
            Realizer::new(speech, opener, Duration::from_millis(500)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_side_effect_waits_for_speech() {
        let speech = Arc::new(ScriptedSpeech::default());
        let opener = Arc::new(LogOpener::new());
        let mut assistant = assistant(Arc::clone(&speech), Arc::clone(&opener));

        let started = tokio::time::Instant::now();
        let intent = assistant.respond(&Utterance::new("open youtube")).await;

        assert_eq!(
            intent.side_effect(),
            Some(&SideEffect::open_url("https://www.youtube.com"))
        );
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert_eq!(speech.spoken.lock().unwrap().len(), 1);
        assert_eq!(opener.opened(), vec!["https://www.youtube.com"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_side_effect_runs_immediately_when_speech_fails() {
        let speech = Arc::new(ScriptedSpeech {
            fail: true,
            ..ScriptedSpeech::default()
        });
        let opener = Arc::new(LogOpener::new());
        let mut assistant = assistant(speech, Arc::clone(&opener));

        let started = tokio::time::Instant::now();
        assistant.respond(&Utterance::new("open google")).await;

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(opener.opened(), vec!["https://www.google.com"]);
    }

    #[tokio::test]
    async fn test_dispatch_records_history() {
        let mut assistant = assistant(Arc::default(), Arc::default());
        assistant.dispatch(&Utterance::new("hello")).await;
        assistant.dispatch(&Utterance::new("who are you")).await;

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user, "who are you");
        assert_eq!(history[0].assistant, "I am Vyra, your web assistant!");
    }

    #[tokio::test]
    async fn test_rejected_speech_rate_keeps_previous() {
        let mut assistant = assistant(Arc::default(), Arc::default());
        assert!(assistant.set_speech_rate(-1.0).is_err());
        assert!(assistant.set_speech_rate(1.5).is_ok());
        assert!((assistant.session().speech_rate() - 1.5).abs() < f32::EPSILON);
    }
}
