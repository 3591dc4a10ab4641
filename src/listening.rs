//! Listening state machine
//!
//! Governs when speech is accepted. The machine is in exactly one of three
//! modes and reacts to named triggers (mic taps, wake-word toggles, capture
//! events, timer firings) by changing mode and returning [`Directive`]s for the
//! runtime to carry out. It never performs I/O itself.
//!
//! The mode is derived from the single open capture stream, so active and
//! wake-word listening cannot both be on. Each stream has a [`CaptureId`] and
//! each scheduled delay a [`TimerToken`]; events carrying an id or token that is
//! no longer current are dropped.
//!
//! ```text
//!            tap                         wake phrase
//!   Idle ───────────▶ ActiveListening ◀──────────────┐ (after delay)
//!    ▲  ▲                │ end/failure               │
//!    │  └────────────────┘                           │
//!    │         toggle off          end (wake on)     │
//!    └──────────────────── WakeWordListening ────────┘
//! ```

use std::time::Duration;

use crate::config::ListeningConfig;
use crate::intent::Utterance;
use crate::session::SessionContext;
use crate::voice::{CaptureEvent, CaptureId, CaptureKind, RecognitionError, WakePhraseDetector};

/// Reply spoken when the wake phrase is heard
pub const WAKE_ACKNOWLEDGEMENT: &str = "Yes?";

/// Shown when an active capture goes live
pub const LISTENING_NOTICE: &str = "I'm listening...";

/// Listening modes, exactly one active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListeningMode {
    /// No capture open
    Idle,
    /// Capturing a single utterance
    ActiveListening,
    /// Passively listening for the wake phrase
    WakeWordListening,
}

impl std::fmt::Display for ListeningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::ActiveListening => write!(f, "active_listening"),
            Self::WakeWordListening => write!(f, "wake_word_listening"),
        }
    }
}

/// Identifies one scheduled delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// User tapped the microphone
    MicTapped,
    /// Wake-word setting changed; the new value is read from the session
    WakeWordToggled,
    /// Event from the capture collaborator
    Capture(CaptureEvent),
    /// A scheduled delay elapsed
    TimerFired(TimerToken),
}

/// Work the runtime must carry out, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Open a capture stream
    StartCapture { id: CaptureId, kind: CaptureKind },
    /// Close a capture stream
    StopCapture { id: CaptureId, kind: CaptureKind },
    /// Deliver `TimerFired(token)` after `after`
    Schedule { token: TimerToken, after: Duration },
    /// Resolve and answer an utterance
    Dispatch(Utterance),
    /// Show a message
    Display(String),
    /// Speak a message
    Speak(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPurpose {
    /// Open active capture after a wake phrase
    Activate,
    /// Reopen wake-word capture after a failure or an unprompted end
    ResumeWakeWord,
}

#[derive(Debug, Clone, Copy)]
struct OpenCapture {
    id: CaptureId,
    kind: CaptureKind,
    stopping: bool,
}

/// Three-mode listening state machine
#[derive(Debug)]
pub struct ListeningStateMachine {
    capture: Option<OpenCapture>,
    timer: Option<(TimerToken, TimerPurpose)>,
    next_capture: u64,
    next_timer: u64,
    detector: WakePhraseDetector,
    activation_delay: Duration,
    wake_retry_delay: Duration,
    wake_restart_delay: Duration,
}

impl ListeningStateMachine {
    /// Idle machine configured from `config`
    ///
    /// # Errors
    ///
    /// Returns error if the configured wake phrases are all blank
    pub fn new(config: &ListeningConfig) -> crate::Result<Self> {
        Ok(Self {
            capture: None,
            timer: None,
            next_capture: 0,
            next_timer: 0,
            detector: WakePhraseDetector::new(&config.wake_phrases)?,
            activation_delay: config.activation_delay,
            wake_retry_delay: config.wake_retry_delay,
            wake_restart_delay: config.wake_restart_delay,
        })
    }

    /// Current mode
    #[must_use]
    pub fn mode(&self) -> ListeningMode {
        match self.capture.map(|c| c.kind) {
            None => ListeningMode::Idle,
            Some(CaptureKind::Active) => ListeningMode::ActiveListening,
            Some(CaptureKind::WakeWord) => ListeningMode::WakeWordListening,
        }
    }

    /// Whether a delayed transition is pending
    #[must_use]
    pub const fn has_pending_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Apply a trigger and return the resulting directives
    pub fn handle(&mut self, trigger: Trigger, session: &SessionContext) -> Vec<Directive> {
        let before = self.mode();
        let wake_enabled = session.wake_word_enabled();
        let mut out = Vec::new();

        match trigger {
            Trigger::MicTapped => self.on_mic_tapped(&mut out),
            Trigger::WakeWordToggled => self.on_wake_word_toggled(wake_enabled, &mut out),
            Trigger::Capture(event) => self.on_capture_event(event, wake_enabled, &mut out),
            Trigger::TimerFired(token) => self.on_timer(token, wake_enabled, &mut out),
        }

        let after = self.mode();
        if before != after {
            tracing::debug!(from = %before, to = %after, "listening mode changed");
        }
        out
    }

    fn on_mic_tapped(&mut self, out: &mut Vec<Directive>) {
        match self.capture {
            Some(open) if open.kind == CaptureKind::Active => {
                if !open.stopping {
                    tracing::debug!(id = %open.id, "tap to stop active capture");
                    self.capture = Some(OpenCapture {
                        stopping: true,
                        ..open
                    });
                    out.push(Directive::StopCapture {
                        id: open.id,
                        kind: open.kind,
                    });
                }
            }
            Some(open) => {
                self.close(open, out);
                self.timer = None;
                self.open(CaptureKind::Active, out);
            }
            None => {
                self.timer = None;
                self.open(CaptureKind::Active, out);
            }
        }
    }

    fn on_wake_word_toggled(&mut self, enabled: bool, out: &mut Vec<Directive>) {
        if enabled {
            if self.capture.is_none() && self.timer.is_none() {
                self.open(CaptureKind::WakeWord, out);
            }
            return;
        }

        if matches!(self.timer, Some((_, TimerPurpose::ResumeWakeWord))) {
            self.timer = None;
        }
        if let Some(open) = self.capture.filter(|c| c.kind == CaptureKind::WakeWord) {
            self.close(open, out);
        }
    }

    fn on_capture_event(&mut self, event: CaptureEvent, wake_enabled: bool, out: &mut Vec<Directive>) {
        let Some(open) = self.capture.filter(|c| c.id == event.id()) else {
            tracing::trace!(id = %event.id(), "ignoring event from stale capture");
            return;
        };

        match event {
            CaptureEvent::Started { .. } => {
                tracing::debug!(id = %open.id, kind = %open.kind, "capture started");
                if open.kind == CaptureKind::Active {
                    out.push(Directive::Display(LISTENING_NOTICE.to_string()));
                }
            }
            CaptureEvent::Transcript { text, .. } => match open.kind {
                CaptureKind::Active => {
                    if text.trim().is_empty() {
                        tracing::debug!(id = %open.id, "ignoring blank transcript");
                    } else {
                        tracing::info!(transcript = %text, "utterance captured");
                        out.push(Directive::Dispatch(Utterance::new(text)));
                    }
                }
                CaptureKind::WakeWord => {
                    if let Some(phrase) = self.detector.detect(&text) {
                        tracing::info!(phrase, transcript = %text, "wake phrase detected");
                        self.close(open, out);
                        // delay runs from detection, not from the end of the acknowledgement
                        self.schedule(TimerPurpose::Activate, self.activation_delay, out);
                        out.push(Directive::Speak(WAKE_ACKNOWLEDGEMENT.to_string()));
                    } else {
                        tracing::trace!(transcript = %text, "no wake phrase");
                    }
                }
            },
            CaptureEvent::Failed { error, .. } => {
                self.capture = None;
                self.on_failure(open, &error, wake_enabled, out);
            }
            CaptureEvent::Ended { .. } => {
                self.capture = None;
                if !wake_enabled {
                    return;
                }
                match open.kind {
                    CaptureKind::Active => self.open(CaptureKind::WakeWord, out),
                    CaptureKind::WakeWord => {
                        tracing::debug!(id = %open.id, "wake-word capture ended, restarting");
                        self.schedule(TimerPurpose::ResumeWakeWord, self.wake_restart_delay, out);
                    }
                }
            }
        }
    }

    fn on_failure(
        &mut self,
        open: OpenCapture,
        error: &RecognitionError,
        wake_enabled: bool,
        out: &mut Vec<Directive>,
    ) {
        match open.kind {
            CaptureKind::Active => {
                tracing::warn!(id = %open.id, error = %error, "active recognition failed");
                if *error != RecognitionError::Aborted {
                    out.push(Directive::Display(error.user_message().to_string()));
                }
                if let Some(prompt) = error.spoken_prompt() {
                    out.push(Directive::Speak(prompt.to_string()));
                }
                if wake_enabled {
                    self.schedule(TimerPurpose::ResumeWakeWord, self.wake_restart_delay, out);
                }
            }
            CaptureKind::WakeWord => {
                if !wake_enabled {
                    tracing::debug!(id = %open.id, error = %error, "wake-word capture stopped");
                    return;
                }
                // Streams we stop ourselves are already stale, so an abort here was external
                if *error == RecognitionError::Aborted {
                    tracing::debug!(id = %open.id, "wake-word capture aborted, restarting");
                    self.schedule(TimerPurpose::ResumeWakeWord, self.wake_restart_delay, out);
                    return;
                }
                tracing::warn!(id = %open.id, error = %error, "wake-word recognition failed, retrying");
                self.schedule(TimerPurpose::ResumeWakeWord, self.wake_retry_delay, out);
            }
        }
    }

    fn on_timer(&mut self, token: TimerToken, wake_enabled: bool, out: &mut Vec<Directive>) {
        let purpose = match self.timer {
            Some((pending, purpose)) if pending == token => purpose,
            _ => {
                tracing::trace!(token = token.0, "ignoring stale timer");
                return;
            }
        };
        self.timer = None;

        if self.capture.is_some() {
            return;
        }
        match purpose {
            TimerPurpose::Activate => self.open(CaptureKind::Active, out),
            TimerPurpose::ResumeWakeWord if wake_enabled => self.open(CaptureKind::WakeWord, out),
            TimerPurpose::ResumeWakeWord => {}
        }
    }

    fn open(&mut self, kind: CaptureKind, out: &mut Vec<Directive>) {
        self.next_capture += 1;
        let id = CaptureId(self.next_capture);
        self.capture = Some(OpenCapture {
            id,
            kind,
            stopping: false,
        });
        out.push(Directive::StartCapture { id, kind });
    }

    fn close(&mut self, open: OpenCapture, out: &mut Vec<Directive>) {
        self.capture = None;
        out.push(Directive::StopCapture {
            id: open.id,
            kind: open.kind,
        });
    }

    fn schedule(&mut self, purpose: TimerPurpose, after: Duration, out: &mut Vec<Directive>) {
        self.next_timer += 1;
        let token = TimerToken(self.next_timer);
        self.timer = Some((token, purpose));
        out.push(Directive::Schedule { token, after });
    }
}
