//! HTTP client for the intent backend

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;
use crate::config::RemoteConfig;
use crate::intent::{Intent, Utterance};

use super::types::{
    ActionPayload, ClearHistoryRequest, HealthResponse, ProcessCommandRequest,
    ProcessCommandResponse,
};
use super::{BackendStatus, IntentBackend, ResolveError};

/// Client for the intent backend with a single fallback endpoint
///
/// Transport failures (connection refused, DNS, timeouts) on the primary
/// endpoint are retried once against the fallback. An HTTP error status is an
/// answer, not an outage, and is returned as [`ResolveError::Rejected`].
#[derive(Debug, Clone)]
pub struct RemoteIntentResolver {
    primary_url: String,
    fallback_url: String,
    client: reqwest::Client,
}

impl RemoteIntentResolver {
    /// Create a resolver with a default HTTP client (no timeout)
    #[must_use]
    pub fn new(primary_url: &str, fallback_url: &str) -> Self {
        Self::with_client(primary_url, fallback_url, reqwest::Client::new())
    }

    /// Create a resolver from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(
            &config.primary_url,
            &config.fallback_url,
            builder.build()?,
        ))
    }

    fn with_client(primary_url: &str, fallback_url: &str, client: reqwest::Client) -> Self {
        Self {
            primary_url: primary_url.trim_end_matches('/').to_string(),
            fallback_url: fallback_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Primary base URL
    #[must_use]
    pub fn primary_url(&self) -> &str {
        &self.primary_url
    }

    /// Fallback base URL
    #[must_use]
    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    fn endpoints(&self) -> [(&str, bool); 2] {
        [
            (self.primary_url.as_str(), false),
            (self.fallback_url.as_str(), true),
        ]
    }

    /// POST `body` to `path`, primary first
    ///
    /// Returns the successful response and whether it came from the fallback.
    async fn post_with_fallback<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> std::result::Result<(reqwest::Response, bool), ResolveError> {
        for (base, via_fallback) in self.endpoints() {
            let url = format!("{base}{path}");
            match self.client.post(&url).json(body).send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok((response, via_fallback));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::warn!(url = %url, status, "backend rejected request");
                    return Err(ResolveError::Rejected { status });
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "backend request failed");
                }
            }
        }

        Err(ResolveError::Unreachable)
    }
}

#[async_trait]
impl IntentBackend for RemoteIntentResolver {
    async fn resolve(
        &self,
        utterance: &Utterance,
        session_id: &str,
        use_augmented_mode: bool,
    ) -> std::result::Result<Intent, ResolveError> {
        let request = ProcessCommandRequest {
            command: utterance.text(),
            session_id,
            use_ai: use_augmented_mode,
        };
        let (response, via_fallback) = self
            .post_with_fallback("/api/process-command", &request)
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::MalformedResponse(format!("failed to read body: {e}")))?;
        let parsed: ProcessCommandResponse = serde_json::from_str(&body)
            .map_err(|e| ResolveError::MalformedResponse(e.to_string()))?;

        let side_effect = parsed.action.and_then(ActionPayload::parse);
        let intent = Intent::new(parsed.response, side_effect)
            .ok_or_else(|| ResolveError::MalformedResponse("empty response text".to_string()))?;

        tracing::info!(
            via_fallback,
            ai_powered = parsed.ai_powered,
            has_side_effect = intent.side_effect().is_some(),
            "resolved utterance remotely"
        );
        Ok(intent)
    }

    async fn clear_history(&self, session_id: &str) -> std::result::Result<(), ResolveError> {
        let (_, via_fallback) = self
            .post_with_fallback("/api/clear-history", &ClearHistoryRequest { session_id })
            .await?;
        tracing::info!(session_id, via_fallback, "cleared remote history");
        Ok(())
    }

    async fn health(&self) -> BackendStatus {
        for (base, via_fallback) in self.endpoints() {
            let url = format!("{base}/api/health");
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    let health = response.json::<HealthResponse>().await.unwrap_or_else(|e| {
                        tracing::warn!(url = %url, error = %e, "unreadable health response");
                        HealthResponse::default()
                    });
                    let status = BackendStatus::Online {
                        ai_enabled: health.ai_enabled,
                        ai_model: health.ai_model,
                        via_fallback,
                    };
                    tracing::info!(url = %url, status = %status, "backend health checked");
                    return status;
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::warn!(url = %url, status, "backend unhealthy");
                    return BackendStatus::Unhealthy { status };
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "health check failed");
                }
            }
        }

        tracing::warn!("backend offline");
        BackendStatus::Offline
    }
}
