//! Wake phrase detection
//!
//! Checks recognized text from the passive (wake-word) recognition stream for
//! one of the configured trigger phrases.

use crate::{Error, Result};

/// Phrases that wake the assistant, including common misrecognitions
pub const DEFAULT_WAKE_PHRASES: [&str; 4] = ["hey vyra", "hi vyra", "hey vira", "hi vira"];

/// Detects wake phrases in transcripts
#[derive(Debug, Clone)]
pub struct WakePhraseDetector {
    phrases: Vec<String>,
}

impl WakePhraseDetector {
    /// Create a detector for `phrases`
    ///
    /// Phrases are lowercased and trimmed.
    ///
    /// # Errors
    ///
    /// Returns error if no non-blank phrase is given
    pub fn new<S: AsRef<str>>(phrases: impl IntoIterator<Item = S>) -> Result<Self> {
        let normalized: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if normalized.is_empty() {
            return Err(Error::Config("at least one wake phrase is required".to_string()));
        }

        tracing::debug!(phrases = ?normalized, "wake phrase detector initialized");
        Ok(Self { phrases: normalized })
    }

    /// First configured phrase contained in `transcript` (case-insensitive)
    #[must_use]
    pub fn detect(&self, transcript: &str) -> Option<&str> {
        let normalized = transcript.to_lowercase();
        self.phrases
            .iter()
            .find(|p| normalized.contains(p.as_str()))
            .map(String::as_str)
    }

    /// Configured phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl Default for WakePhraseDetector {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_WAKE_PHRASES.iter().map(ToString::to_string).collect(),
        }
    }
}
