//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vyra::voice::SpeechOutput;
use vyra::{
    Assistant, BackendStatus, ConversationLog, Intent, IntentBackend, LogOpener, Realizer,
    ResolveError, SessionContext, SettingsStore, TranscriptMatcher, Utterance,
};

/// Speech output that records everything it is asked to say or show
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    displayed: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    /// Lines spoken so far
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    /// Lines displayed so far
    pub fn displayed(&self) -> Vec<String> {
        self.displayed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeech {
    async fn speak(&self, text: &str, _rate: f32) -> vyra::Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn display(&self, text: &str) {
        self.displayed.lock().unwrap().push(text.to_string());
    }
}

/// Scripted intent backend
pub struct FakeBackend {
    pub reply: std::result::Result<Intent, ResolveError>,
    pub clear: std::result::Result<(), ResolveError>,
    pub status: BackendStatus,
    pub resolved: Mutex<Vec<(String, String, bool)>>,
    pub cleared: Mutex<Vec<String>>,
}

impl FakeBackend {
    /// Backend answering every utterance with `reply`
    pub fn answering(reply: &str) -> Self {
        Self::with_reply(Ok(Intent::new(reply, None).unwrap()))
    }

    /// Backend that cannot be reached
    pub fn unreachable() -> Self {
        Self {
            clear: Err(ResolveError::Unreachable),
            status: BackendStatus::Offline,
            ..Self::with_reply(Err(ResolveError::Unreachable))
        }
    }

    fn with_reply(reply: std::result::Result<Intent, ResolveError>) -> Self {
        Self {
            reply,
            clear: Ok(()),
            status: BackendStatus::Online {
                ai_enabled: true,
                ai_model: None,
                via_fallback: false,
            },
            resolved: Mutex::default(),
            cleared: Mutex::default(),
        }
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolved.lock().unwrap().len()
    }
}

#[async_trait]
impl IntentBackend for FakeBackend {
    async fn resolve(
        &self,
        utterance: &Utterance,
        session_id: &str,
        use_augmented_mode: bool,
    ) -> std::result::Result<Intent, ResolveError> {
        self.resolved.lock().unwrap().push((
            utterance.text().to_string(),
            session_id.to_string(),
            use_augmented_mode,
        ));
        self.reply.clone()
    }

    async fn clear_history(&self, session_id: &str) -> std::result::Result<(), ResolveError> {
        self.cleared.lock().unwrap().push(session_id.to_string());
        self.clear.clone()
    }

    async fn health(&self) -> BackendStatus {
        self.status.clone()
    }
}

/// Collaborators of a test assistant, kept for inspection
#[derive(Default)]
pub struct Harness {
    pub speech: Arc<RecordingSpeech>,
    pub opener: Arc<LogOpener>,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assistant wired to this harness with a deterministic matcher
    pub fn assistant(&self, store: impl SettingsStore + 'static) -> Assistant {
        Assistant::new(
            SessionContext::load(store, 1.0),
            ConversationLog::default(),
            TranscriptMatcher::with_seed(7),
            Realizer::new(
                Arc::clone(&self.speech) as Arc<dyn SpeechOutput>,
                Arc::clone(&self.opener) as Arc<dyn vyra::UrlOpener>,
                Duration::from_millis(10),
            ),
        )
    }
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test server");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server failed");
    });
    format!("http://{addr}")
}

/// Base URL of a port nothing listens on
pub fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");
    drop(listener);
    format!("http://{addr}")
}

/// Poll `condition` until it holds, panicking after two seconds
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let wait = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}
