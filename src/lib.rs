//! Vyra - voice assistant front-end
//!
//! This library provides the core of the Vyra assistant:
//! - Intent resolution (keyword matcher, optional remote backend)
//! - Bounded conversation history
//! - Listening state machine (tap to talk, wake phrase)
//! - Persisted session settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Capture / Speech / Browser              │
//! │   SpeechCapture  │  SpeechOutput  │  UrlOpener       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events / directives
//! ┌────────────────────▼────────────────────────────────┐
//! │                     Runtime                          │
//! │   ListeningStateMachine  │  Assistant  │  Session    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ utterances
//! ┌────────────────────▼────────────────────────────────┐
//! │   RemoteIntentResolver  ──fallback──▶  Matcher       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod config;
pub mod effects;
pub mod error;
pub mod history;
pub mod intent;
pub mod listening;
pub mod remote;
pub mod runtime;
pub mod session;
pub mod voice;

pub use assistant::{Assistant, Realizer};
pub use config::Config;
pub use effects::{LogOpener, SystemOpener, UrlOpener};
pub use error::{Error, Result};
pub use history::{ConversationLog, HistoryEntry};
pub use intent::{Intent, Platform, SideEffect, TranscriptMatcher, Utterance};
pub use listening::{Directive, ListeningMode, ListeningStateMachine, TimerToken, Trigger};
pub use remote::{BackendStatus, IntentBackend, RemoteIntentResolver, ResolveError};
pub use runtime::{Control, Runtime};
pub use session::{FileSettingsStore, MemorySettingsStore, SessionContext, SettingsStore};
