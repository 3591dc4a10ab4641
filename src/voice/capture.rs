//! Speech capture collaborator
//!
//! A recognizer opens one stream at a time, either an active (single
//! utterance) stream or a continuous wake-word stream. Streams are tagged with
//! a [`CaptureId`] chosen by the listening state machine; every event a stream
//! emits carries that id so stale events can be told apart from live ones.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;

/// Which recognition stream a capture belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// Single-utterance capture started by a tap or a wake phrase
    Active,
    /// Continuous passive capture listening for the wake phrase
    WakeWord,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::WakeWord => write!(f, "wake_word"),
        }
    }
}

/// Identifies one capture stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureId(pub u64);

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture-{}", self.0)
    }
}

/// Recognition-layer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// Stream ended without any speech
    #[error("no speech detected")]
    NoSpeechDetected,

    /// No usable input device
    #[error("audio capture unavailable")]
    AudioCaptureUnavailable,

    /// Microphone access refused
    #[error("microphone permission denied")]
    PermissionDenied,

    /// Device held by another application
    #[error("audio device busy")]
    DeviceBusy,

    /// Stream cancelled on request
    #[error("recognition aborted")]
    Aborted,

    /// Anything else the recognizer reports
    #[error("recognition failed: {0}")]
    Unknown(String),
}

impl RecognitionError {
    /// Map a recognizer error code (`no-speech`, `not-allowed`, ...)
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "no-speech" => Self::NoSpeechDetected,
            "audio-capture" | "not-found" => Self::AudioCaptureUnavailable,
            "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "not-readable" | "busy" => Self::DeviceBusy,
            "aborted" => Self::Aborted,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Fixed message shown to the user
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::NoSpeechDetected => "I didn't hear anything. Please try again.",
            Self::AudioCaptureUnavailable => "Microphone not detected. Please check your device.",
            Self::PermissionDenied => {
                "Microphone access denied. Please allow microphone permissions in your browser settings. Click the lock icon in the address bar to grant access."
            }
            Self::DeviceBusy => {
                "Microphone is being used by another application. Please close other apps and try again."
            }
            Self::Aborted => "Listening stopped.",
            Self::Unknown(_) => "Something went wrong. Please try again.",
        }
    }

    /// Spoken guidance, only for failures the user has to fix in settings
    #[must_use]
    pub const fn spoken_prompt(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied => Some("Please allow microphone permissions to use voice features"),
            _ => None,
        }
    }
}

/// Events a capture stream reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Stream is live
    Started { id: CaptureId },
    /// Recognized text
    Transcript { id: CaptureId, text: String },
    /// Stream failed
    Failed { id: CaptureId, error: RecognitionError },
    /// Stream closed (after a stop, a result or a failure)
    Ended { id: CaptureId },
}

impl CaptureEvent {
    /// Stream this event belongs to
    #[must_use]
    pub const fn id(&self) -> CaptureId {
        match self {
            Self::Started { id }
            | Self::Transcript { id, .. }
            | Self::Failed { id, .. }
            | Self::Ended { id } => *id,
        }
    }
}

/// Speech recognizer driven by the listening state machine
pub trait SpeechCapture: Send {
    /// Open a stream; events for it must carry `id`
    ///
    /// # Errors
    ///
    /// Returns the recognition error if the stream cannot be opened
    fn start(&mut self, kind: CaptureKind, id: CaptureId) -> Result<(), RecognitionError>;

    /// Close the stream `id`; it should still report `Ended`
    fn stop(&mut self, id: CaptureId);
}

#[derive(Debug, Default)]
struct OpenStream {
    current: Option<(CaptureId, CaptureKind)>,
}

/// Capture fed from typed text instead of a microphone
///
/// Each line handed to the paired [`ConsoleMicrophone`] counts as a
/// recognized phrase for whichever stream is open. Active streams end after
/// one phrase; wake-word streams stay open.
#[derive(Debug)]
pub struct ConsoleCapture {
    stream: Arc<Mutex<OpenStream>>,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

/// Input side of a [`ConsoleCapture`]
#[derive(Debug, Clone)]
pub struct ConsoleMicrophone {
    stream: Arc<Mutex<OpenStream>>,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

impl ConsoleCapture {
    /// Create a capture and its microphone; events go to `events`
    #[must_use]
    pub fn new(events: mpsc::UnboundedSender<CaptureEvent>) -> (Self, ConsoleMicrophone) {
        let stream = Arc::new(Mutex::new(OpenStream::default()));
        let mic = ConsoleMicrophone {
            stream: Arc::clone(&stream),
            events: events.clone(),
        };
        (Self { stream, events }, mic)
    }

    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("capture event receiver dropped");
        }
    }
}

impl SpeechCapture for ConsoleCapture {
    fn start(&mut self, kind: CaptureKind, id: CaptureId) -> Result<(), RecognitionError> {
        {
            let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((open, _)) = stream.current {
                tracing::warn!(open = %open, requested = %id, "capture already open");
                return Err(RecognitionError::DeviceBusy);
            }
            stream.current = Some((id, kind));
        }
        tracing::debug!(id = %id, kind = %kind, "console capture started");
        self.emit(CaptureEvent::Started { id });
        Ok(())
    }

    fn stop(&mut self, id: CaptureId) {
        let closed = {
            let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
            match stream.current {
                Some((open, _)) if open == id => {
                    stream.current = None;
                    true
                }
                _ => false,
            }
        };
        if closed {
            tracing::debug!(id = %id, "console capture stopped");
            self.emit(CaptureEvent::Ended { id });
        }
    }
}

impl ConsoleMicrophone {
    /// Deliver a typed line as speech
    ///
    /// Returns `false` if no stream is open. A blank line on an active stream
    /// is reported as "no speech".
    #[must_use]
    pub fn hear(&self, text: &str) -> bool {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((id, kind)) = stream.current else {
            return false;
        };

        let text = text.trim();
        match kind {
            CaptureKind::Active => {
                stream.current = None;
                drop(stream);
                if text.is_empty() {
                    self.emit(CaptureEvent::Failed {
                        id,
                        error: RecognitionError::NoSpeechDetected,
                    });
                } else {
                    self.emit(CaptureEvent::Transcript {
                        id,
                        text: text.to_string(),
                    });
                }
                self.emit(CaptureEvent::Ended { id });
            }
            CaptureKind::WakeWord => {
                drop(stream);
                if !text.is_empty() {
                    self.emit(CaptureEvent::Transcript {
                        id,
                        text: text.to_string(),
                    });
                }
            }
        }
        true
    }

    /// Kind of the open stream, if any
    #[must_use]
    pub fn open_stream(&self) -> Option<CaptureKind> {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .map(|(_, kind)| kind)
    }

    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("capture event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RecognitionError::from_code("no-speech"), RecognitionError::NoSpeechDetected);
        assert_eq!(RecognitionError::from_code("not-allowed"), RecognitionError::PermissionDenied);
        assert_eq!(RecognitionError::from_code("aborted"), RecognitionError::Aborted);
        assert_eq!(
            RecognitionError::from_code("network"),
            RecognitionError::Unknown("network".to_string())
        );
    }

    #[test]
    fn test_only_permission_denial_is_spoken() {
        assert!(RecognitionError::PermissionDenied.spoken_prompt().is_some());
        assert!(RecognitionError::NoSpeechDetected.spoken_prompt().is_none());
        assert!(RecognitionError::DeviceBusy.spoken_prompt().is_none());
    }

    #[test]
    fn test_active_stream_ends_after_one_phrase() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut capture, mic) = ConsoleCapture::new(tx);

        assert!(!mic.hear("nobody listening"));

        capture.start(CaptureKind::Active, CaptureId(1)).unwrap();
        assert_eq!(mic.open_stream(), Some(CaptureKind::Active));
        assert!(mic.hear("open google"));
        assert_eq!(mic.open_stream(), None);

        assert_eq!(rx.try_recv().unwrap(), CaptureEvent::Started { id: CaptureId(1) });
        assert_eq!(
            rx.try_recv().unwrap(),
            CaptureEvent::Transcript {
                id: CaptureId(1),
                text: "open google".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), CaptureEvent::Ended { id: CaptureId(1) });
    }

    #[test]
    fn test_wake_stream_stays_open() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut capture, mic) = ConsoleCapture::new(tx);

        capture.start(CaptureKind::WakeWord, CaptureId(3)).unwrap();
        assert!(mic.hear("background chatter"));
        assert_eq!(mic.open_stream(), Some(CaptureKind::WakeWord));

        capture.stop(CaptureId(3));
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.last(), Some(&CaptureEvent::Ended { id: CaptureId(3) }));
    }

    #[test]
    fn test_single_stream_at_a_time() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut capture, _mic) = ConsoleCapture::new(tx);

        capture.start(CaptureKind::WakeWord, CaptureId(1)).unwrap();
        assert_eq!(
            capture.start(CaptureKind::Active, CaptureId(2)),
            Err(RecognitionError::DeviceBusy)
        );
    }

    #[test]
    fn test_blank_active_line_is_no_speech() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut capture, mic) = ConsoleCapture::new(tx);

        capture.start(CaptureKind::Active, CaptureId(5)).unwrap();
        assert!(mic.hear("   "));
        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert!(events.contains(&CaptureEvent::Failed {
            id: CaptureId(5),
            error: RecognitionError::NoSpeechDetected
        }));
    }
}
