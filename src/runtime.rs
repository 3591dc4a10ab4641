//! Event loop
//!
//! Owns the listening state machine, the assistant and the capture
//! collaborator. Capture events, timer firings and console controls are
//! funnelled through one task; directives from the state machine are carried
//! out in order, and a capture that fails to start is fed back as a
//! recognition failure.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;

use crate::assistant::Assistant;
use crate::history::HistoryEntry;
use crate::listening::{Directive, ListeningStateMachine, TimerToken, Trigger};
use crate::voice::{CaptureEvent, SpeechCapture};
use crate::{Error, Result};

/// Shown by `/history` when nothing has been said yet
pub const EMPTY_HISTORY: &str = "No chat history yet. Start talking to Vyra!";

/// Console help text
pub const HELP: &str = "\
/tap            tap the microphone (start or stop listening)
/wake on|off    toggle wake-word listening
/ai on|off      toggle the remote backend
/speed <x>      set the speech rate (e.g. 1.2)
/history        show the conversation
/clear          clear the conversation
/status         show current settings
/quit           exit";

/// User controls outside of speech
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Mic button
    Tap,
    /// Wake-word switch
    WakeWord(bool),
    /// Remote backend switch
    Remote(bool),
    /// Speech rate slider
    Speed(f32),
    /// Show history
    History,
    /// Clear history
    Clear,
    /// Show settings and mode
    Status,
    /// Show available controls
    Help,
    /// Stop the loop
    Quit,
}

impl Control {
    /// Parse a `/`-prefixed console line
    ///
    /// # Errors
    ///
    /// Returns `Error::Command` for unknown commands or bad arguments
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let body = line.strip_prefix('/').unwrap_or(line);
        let mut parts = body.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next();

        let control = match (name.as_str(), arg) {
            ("tap" | "mic", None) => Self::Tap,
            ("wake", Some(value)) => Self::WakeWord(parse_switch(value)?),
            ("ai" | "remote", Some(value)) => Self::Remote(parse_switch(value)?),
            ("speed", Some(value)) => Self::Speed(
                value
                    .parse()
                    .map_err(|_| Error::Command(format!("speed must be a number, got {value:?}")))?,
            ),
            ("history", None) => Self::History,
            ("clear", None) => Self::Clear,
            ("status", None) => Self::Status,
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            _ => return Err(Error::Command(line.to_string())),
        };

        if parts.next().is_some() {
            return Err(Error::Command(format!("unexpected arguments in {line:?}")));
        }
        Ok(control)
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(Error::Command(format!("expected on or off, got {other:?}"))),
    }
}

/// Render history entries for display, most recent first
#[must_use]
pub fn format_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "You: {}\n  Vyra: {}\n  {}",
                entry.user,
                entry.assistant,
                entry
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

struct Core<C> {
    assistant: Assistant,
    machine: ListeningStateMachine,
    capture: C,
    timer_tx: mpsc::UnboundedSender<TimerToken>,
}

/// Single-task assistant runtime
pub struct Runtime<C> {
    core: Core<C>,
    capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerToken>,
}

impl<C: SpeechCapture> Runtime<C> {
    /// Create a runtime; `capture` must report its events on `capture_rx`
    #[must_use]
    pub fn new(
        assistant: Assistant,
        machine: ListeningStateMachine,
        capture: C,
        capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            core: Core {
                assistant,
                machine,
                capture,
                timer_tx,
            },
            capture_rx,
            timer_rx,
        }
    }

    /// Run until `Control::Quit` arrives or the control channel closes
    ///
    /// Starts wake-word listening if it is enabled and probes the backend if
    /// remote mode is on.
    pub async fn run(self, mut controls: mpsc::UnboundedReceiver<Control>) -> Assistant {
        let Self {
            mut core,
            mut capture_rx,
            mut timer_rx,
        } = self;

        core.startup().await;

        loop {
            tokio::select! {
                Some(event) = capture_rx.recv() => {
                    core.apply(Trigger::Capture(event)).await;
                }
                Some(token) = timer_rx.recv() => {
                    core.apply(Trigger::TimerFired(token)).await;
                }
                control = controls.recv() => {
                    match control {
                        None | Some(Control::Quit) => break,
                        Some(control) => core.control(control).await,
                    }
                }
            }
        }

        tracing::info!(mode = %core.machine.mode(), "runtime stopped");
        core.assistant
    }
}

impl<C: SpeechCapture> Core<C> {
    async fn startup(&mut self) {
        let session = self.assistant.session();
        tracing::info!(
            session_id = %session.session_id(),
            wake_word = session.wake_word_enabled(),
            remote = session.remote_intent_enabled(),
            "runtime started"
        );

        if self.assistant.session().remote_intent_enabled()
            && let Err(e) = self.assistant.check_backend().await
        {
            tracing::warn!(error = %e, "startup health check failed");
        }
        if self.assistant.session().wake_word_enabled() {
            self.apply(Trigger::WakeWordToggled).await;
        } else {
            self.assistant
                .realizer()
                .notify("Type /tap to speak, or /help for commands.");
        }
    }

    async fn control(&mut self, control: Control) {
        tracing::debug!(?control, "control received");
        if let Err(e) = self.try_control(control).await {
            tracing::warn!(error = %e, "control failed");
            self.assistant.realizer().notify(&e.to_string());
        }
    }

    async fn try_control(&mut self, control: Control) -> Result<()> {
        match control {
            Control::Tap => self.apply(Trigger::MicTapped).await,
            Control::WakeWord(enabled) => {
                self.assistant.set_wake_word(enabled).await?;
                self.apply(Trigger::WakeWordToggled).await;
            }
            Control::Remote(enabled) => {
                self.assistant.set_remote_enabled(enabled).await?;
            }
            Control::Speed(rate) => self.assistant.set_speech_rate(rate)?,
            Control::History => {
                let history = format_history(&self.assistant.history());
                self.assistant.realizer().notify(&history);
            }
            Control::Clear => self.assistant.clear_history().await,
            Control::Status => {
                let session = self.assistant.session();
                let status = format!(
                    "mode: {}, wake word: {}, remote: {}, speed: {:.1}x, session: {}",
                    self.machine.mode(),
                    on_off(session.wake_word_enabled()),
                    on_off(session.remote_intent_enabled()),
                    session.speech_rate(),
                    session.session_id()
                );
                self.assistant.realizer().notify(&status);
            }
            Control::Help => self.assistant.realizer().notify(HELP),
            Control::Quit => {}
        }
        Ok(())
    }

    /// Feed a trigger through the state machine and carry out the directives
    async fn apply(&mut self, trigger: Trigger) {
        let mut pending = VecDeque::from([trigger]);

        while let Some(trigger) = pending.pop_front() {
            let directives = self.machine.handle(trigger, self.assistant.session());
            for directive in directives {
                match directive {
                    Directive::StartCapture { id, kind } => {
                        if let Err(error) = self.capture.start(kind, id) {
                            tracing::warn!(id = %id, kind = %kind, error = %error, "capture failed to start");
                            pending.push_back(Trigger::Capture(CaptureEvent::Failed { id, error }));
                        }
                    }
                    Directive::StopCapture { id, .. } => self.capture.stop(id),
                    Directive::Schedule { token, after } => self.schedule(token, after),
                    Directive::Dispatch(utterance) => {
                        self.assistant.respond(&utterance).await;
                    }
                    Directive::Display(text) => self.assistant.realizer().notify(&text),
                    Directive::Speak(text) => {
                        self.assistant.say(&text).await;
                    }
                }
            }
        }
    }

    fn schedule(&self, token: TimerToken, after: Duration) {
        let tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if tx.send(token).is_err() {
                tracing::trace!(token = token.0, "runtime gone before timer fired");
            }
        });
    }
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_controls() {
        assert_eq!(Control::parse("/tap").unwrap(), Control::Tap);
        assert_eq!(Control::parse("/wake on").unwrap(), Control::WakeWord(true));
        assert_eq!(Control::parse("/AI off").unwrap(), Control::Remote(false));
        assert_eq!(Control::parse("/speed 1.5").unwrap(), Control::Speed(1.5));
        assert_eq!(Control::parse(" /quit ").unwrap(), Control::Quit);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Control::parse("/dance").is_err());
        assert!(Control::parse("/wake maybe").is_err());
        assert!(Control::parse("/speed fast").is_err());
        assert!(Control::parse("/tap now").is_err());
        assert!(Control::parse("/wake").is_err());
    }

    #[test]
    fn test_format_history() {
        assert_eq!(format_history(&[]), EMPTY_HISTORY);

        let entries = vec![HistoryEntry {
            user: "hello".to_string(),
            assistant: "Hello! How can I help you today?".to_string(),
            timestamp: chrono::Utc.with_ymd_and_hms(2024, 3, 5, 15, 7, 0).unwrap(),
        }];
        let rendered = format_history(&entries);
        assert!(rendered.starts_with("You: hello\n  Vyra: Hello! How can I help you today?"));
    }
}
