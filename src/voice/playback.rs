//! Speech output collaborator

use std::io::Write;

use async_trait::async_trait;

use crate::{Error, Result};

/// Renders replies for the user: on-screen text plus synthesized speech
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak `text` at `rate`, resolving once playback has finished
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str, rate: f32) -> Result<()>;

    /// Show a message without speaking it
    fn display(&self, text: &str);
}

/// Writes replies to stdout
///
/// Stands in for a synthesizer when running headless; "speaking" prints the
/// line prefixed with the assistant's name.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSpeech;

impl ConsoleSpeech {
    fn write_line(line: &str) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{line}")?;
        handle.flush()
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn speak(&self, text: &str, rate: f32) -> Result<()> {
        tracing::debug!(rate, chars = text.len(), "speaking");
        Self::write_line(&format!("Vyra: {text}"))
            .map_err(|e| Error::Speech(format!("failed to write speech output: {e}")))
    }

    fn display(&self, text: &str) {
        if let Err(e) = Self::write_line(&format!("  {text}")) {
            tracing::debug!(error = %e, "failed to write display output");
        }
    }
}
