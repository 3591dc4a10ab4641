//! Wire types for the intent backend

use serde::{Deserialize, Serialize};

use crate::intent::{Platform, SideEffect};

/// Body of `POST /api/process-command`
#[derive(Debug, Serialize)]
pub struct ProcessCommandRequest<'a> {
    pub command: &'a str,
    pub session_id: &'a str,
    pub use_ai: bool,
}

/// Reply from `POST /api/process-command`
#[derive(Debug, Deserialize)]
pub struct ProcessCommandResponse {
    pub response: String,

    /// Kept untyped so a bad action only drops the side effect
    #[serde(default)]
    pub action: Option<serde_json::Value>,

    #[serde(default)]
    pub ai_powered: bool,
}

/// Body of `POST /api/clear-history`
#[derive(Debug, Serialize)]
pub struct ClearHistoryRequest<'a> {
    pub session_id: &'a str,
}

/// Reply from `GET /api/health`
#[derive(Debug, Default, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub ai_enabled: bool,

    #[serde(default)]
    pub ai_model: Option<String>,
}

/// Action attached to a backend reply
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionPayload {
    OpenUrl {
        url: String,
    },
    Search {
        platform: String,
        #[serde(default)]
        query: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ActionPayload {
    /// Parse an untyped action, `None` if it is absent or unusable
    #[must_use]
    pub fn parse(value: serde_json::Value) -> Option<SideEffect> {
        if value.is_null() {
            return None;
        }
        match serde_json::from_value::<Self>(value) {
            Ok(action) => action.into_side_effect(),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed action");
                None
            }
        }
    }

    fn into_side_effect(self) -> Option<SideEffect> {
        match self {
            Self::OpenUrl { url } => match url::Url::parse(&url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Some(SideEffect::open_url(url)),
                Ok(parsed) => {
                    tracing::warn!(scheme = parsed.scheme(), "dropping action with unsupported scheme");
                    None
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "dropping action with invalid url");
                    None
                }
            },
            Self::Search { platform, query } => {
                let Some(platform) = Platform::from_name(&platform) else {
                    tracing::warn!(platform = %platform, "dropping search on unknown platform");
                    return None;
                };
                Some(SideEffect::search(platform, query.as_deref().unwrap_or_default()))
            }
            Self::Unknown => {
                tracing::warn!("dropping action of unknown type");
                None
            }
        }
    }
}
