//! Intents: what the assistant says and does in reply to an utterance
//!
//! An [`Intent`] is produced either locally by the [`TranscriptMatcher`] or
//! by the remote backend, and is realized as a spoken reply plus an optional
//! [`SideEffect`].

mod matcher;
mod query;

pub use matcher::{Clock, FixedClock, JOKES, SystemClock, TranscriptMatcher};
pub use query::extract_query;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query used when stopword removal leaves nothing behind
pub const FALLBACK_QUERY: &str = "search";

/// Search platform targeted by [`SideEffect::SearchOn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// youtube.com video search
    YouTube,
    /// google.com web search
    Google,
}

impl Platform {
    /// Parse a platform name as sent by the backend ("youtube", "google")
    #[must_use]
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Some(Self::YouTube),
            "google" => Some(Self::Google),
            _ => None,
        }
    }

    /// Lowercase name, also the platform's stopword during query extraction
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Google => "google",
        }
    }

    /// Human-readable name used in replies
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Google => "Google",
        }
    }

    fn search_url(self, query: &str) -> String {
        let encoded = urlencoding::encode(query);
        match self {
            Self::YouTube => format!("https://www.youtube.com/results?search_query={encoded}"),
            Self::Google => format!("https://www.google.com/search?q={encoded}"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// An action beyond speaking
///
/// `SearchOn::query` is never empty; build it with [`SideEffect::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    /// Open a URL in the browser
    OpenUrl {
        /// Destination URL
        url: String,
    },
    /// Run a search on a platform
    SearchOn {
        /// Where to search
        platform: Platform,
        /// Search terms
        query: String,
    },
}

impl SideEffect {
    /// Open a URL
    #[must_use]
    pub fn open_url(url: impl Into<String>) -> Self {
        Self::OpenUrl { url: url.into() }
    }

    /// Search on a platform; a blank query becomes [`FALLBACK_QUERY`]
    #[must_use]
    pub fn search(platform: Platform, query: &str) -> Self {
        let query = query.trim();
        let query = if query.is_empty() { FALLBACK_QUERY } else { query };
        Self::SearchOn {
            platform,
            query: query.to_string(),
        }
    }

    /// The concrete URL this side effect opens
    #[must_use]
    pub fn url(&self) -> String {
        match self {
            Self::OpenUrl { url } => url.clone(),
            Self::SearchOn { platform, query } => platform.search_url(query),
        }
    }
}

/// Resolved meaning of an utterance: reply text plus optional side effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    reply_text: String,
    side_effect: Option<SideEffect>,
}

impl Intent {
    /// Create an intent
    ///
    /// Returns `None` if the reply text is blank.
    #[must_use]
    pub fn new(reply_text: impl Into<String>, side_effect: Option<SideEffect>) -> Option<Self> {
        let reply_text = reply_text.into();
        if reply_text.trim().is_empty() {
            return None;
        }
        Some(Self {
            reply_text,
            side_effect,
        })
    }

    /// Reply-only intent from text known to be non-empty
    #[must_use]
    pub(crate) fn reply(reply_text: impl Into<String>) -> Self {
        Self {
            reply_text: reply_text.into(),
            side_effect: None,
        }
    }

    /// Reply with a side effect, from text known to be non-empty
    #[must_use]
    pub(crate) fn acting(reply_text: impl Into<String>, side_effect: SideEffect) -> Self {
        Self {
            reply_text: reply_text.into(),
            side_effect: Some(side_effect),
        }
    }

    /// Text to speak
    #[must_use]
    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    /// Action to run after speaking, if any
    #[must_use]
    pub const fn side_effect(&self) -> Option<&SideEffect> {
        self.side_effect.as_ref()
    }
}

/// One completed spoken input captured as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    received_at: DateTime<Utc>,
}

impl Utterance {
    /// Utterance received now
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self::at(text, Utc::now())
    }

    /// Utterance received at a given instant
    #[must_use]
    pub fn at(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            received_at,
        }
    }

    /// Transcript as recognized
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Arrival timestamp
    #[must_use]
    pub const fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
