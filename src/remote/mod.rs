//! Remote intent backend
//!
//! An optional HTTP service that resolves utterances (possibly with an LLM)
//! and keeps its own per-session chat history. Reached at a primary base URL
//! with a single fallback URL for transport-level failures.

mod client;
mod types;

use async_trait::async_trait;
use thiserror::Error;

use crate::intent::{Intent, Utterance};

pub use client::RemoteIntentResolver;

/// Remote resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Neither the primary nor the fallback endpoint could be reached
    #[error("backend unreachable")]
    Unreachable,

    /// Body was not a usable reply
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// Endpoint answered with a non-success status
    #[error("backend rejected request with status {status}")]
    Rejected {
        /// HTTP status code
        status: u16,
    },
}

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Backend answered
    Online {
        /// Whether AI answers are available
        ai_enabled: bool,
        /// Model serving AI answers, if reported
        ai_model: Option<String>,
        /// Answer came from the fallback endpoint
        via_fallback: bool,
    },
    /// Backend reachable but reported a failure status
    Unhealthy {
        /// HTTP status code
        status: u16,
    },
    /// Neither endpoint reachable
    Offline,
}

impl BackendStatus {
    /// Whether the backend can serve requests
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ai = |enabled: bool| if enabled { "AI Enabled" } else { "AI Disabled" };
        match self {
            Self::Online {
                ai_enabled,
                via_fallback: false,
                ..
            } => write!(f, "Online ({})", ai(*ai_enabled)),
            Self::Online {
                ai_enabled,
                via_fallback: true,
                ..
            } => write!(f, "Online (Local) - {}", ai(*ai_enabled)),
            Self::Unhealthy { status } => write!(f, "Unhealthy (HTTP {status})"),
            Self::Offline => write!(f, "Offline"),
        }
    }
}

/// Intent resolution service used when remote mode is on
#[async_trait]
pub trait IntentBackend: Send + Sync {
    /// Resolve an utterance for a session
    ///
    /// # Errors
    ///
    /// Returns the [`ResolveError`] describing why no intent was produced
    async fn resolve(
        &self,
        utterance: &Utterance,
        session_id: &str,
        use_augmented_mode: bool,
    ) -> Result<Intent, ResolveError>;

    /// Drop the server-side history for a session
    ///
    /// # Errors
    ///
    /// Returns the [`ResolveError`] describing why the request failed
    async fn clear_history(&self, session_id: &str) -> Result<(), ResolveError>;

    /// Probe backend availability
    async fn health(&self) -> BackendStatus;
}
