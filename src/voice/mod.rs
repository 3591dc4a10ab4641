//! Voice collaborators
//!
//! Speech capture, speech output and wake phrase detection. The engine only
//! talks to the [`SpeechCapture`] and [`SpeechOutput`] traits; the console
//! implementations let it run from a terminal.

mod capture;
mod playback;
mod wake_word;

pub use capture::{
    CaptureEvent, CaptureId, CaptureKind, ConsoleCapture, ConsoleMicrophone, RecognitionError,
    SpeechCapture,
};
pub use playback::{ConsoleSpeech, SpeechOutput};
pub use wake_word::{DEFAULT_WAKE_PHRASES, WakePhraseDetector};
