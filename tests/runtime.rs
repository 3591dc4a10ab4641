//! End-to-end runtime tests driven through the console microphone

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vyra::config::ListeningConfig;
use vyra::voice::{CaptureKind, ConsoleCapture, ConsoleMicrophone};
use vyra::{Assistant, Control, ListeningStateMachine, MemorySettingsStore, Runtime};

mod common;
use common::{Harness, eventually};

struct Running {
    mic: ConsoleMicrophone,
    controls: mpsc::UnboundedSender<Control>,
    task: JoinHandle<Assistant>,
}

impl Running {
    async fn stop(self) -> Assistant {
        self.controls.send(Control::Quit).unwrap();
        self.task.await.unwrap()
    }
}

fn fast_listening() -> ListeningConfig {
    ListeningConfig {
        activation_delay: Duration::from_millis(30),
        wake_retry_delay: Duration::from_millis(20),
        wake_restart_delay: Duration::from_millis(10),
        ..ListeningConfig::default()
    }
}

fn start(harness: &Harness, store: MemorySettingsStore) -> Running {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (capture, mic) = ConsoleCapture::new(event_tx);
    let machine = ListeningStateMachine::new(&fast_listening()).unwrap();
    let runtime = Runtime::new(harness.assistant(store), machine, capture, event_rx);

    let (controls, control_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(runtime.run(control_rx));
    Running {
        mic,
        controls,
        task,
    }
}

#[tokio::test]
async fn test_tap_to_talk() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::new());

    running.controls.send(Control::Tap).unwrap();
    eventually("active capture", || {
        running.mic.open_stream() == Some(CaptureKind::Active)
    })
    .await;

    assert!(running.mic.hear("open youtube"));
    eventually("side effect", || !harness.opener.opened().is_empty()).await;
    assert_eq!(running.mic.open_stream(), None);

    let assistant = running.stop().await;
    assert_eq!(harness.opener.opened(), vec!["https://www.youtube.com"]);
    assert_eq!(harness.speech.spoken(), vec!["Opening YouTube for you!"]);
    assert!(
        harness
            .speech
            .displayed()
            .contains(&"I'm listening...".to_string())
    );
    assert_eq!(assistant.history()[0].user, "open youtube");
}

#[tokio::test]
async fn test_wake_phrase_flow() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::with_values([("wake_word", "true")]));

    eventually("wake-word capture", || {
        running.mic.open_stream() == Some(CaptureKind::WakeWord)
    })
    .await;

    assert!(running.mic.hear("is this thing on"));
    assert!(running.mic.hear("Hey Vyra"));
    // Repeats from the same stream must not schedule a second activation
    let _ = running.mic.hear("hey vyra");

    eventually("active capture after wake phrase", || {
        running.mic.open_stream() == Some(CaptureKind::Active)
    })
    .await;
    assert!(running.mic.hear("who are you"));

    eventually("wake-word capture resumes", || {
        running.mic.open_stream() == Some(CaptureKind::WakeWord)
    })
    .await;

    // Give a duplicate activation time to show up if there were one
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.mic.open_stream(), Some(CaptureKind::WakeWord));

    let assistant = running.stop().await;
    assert_eq!(
        harness.speech.spoken(),
        vec!["Yes?", "I am Vyra, your web assistant!"]
    );
    assert_eq!(assistant.history().len(), 1);
}

#[tokio::test]
async fn test_tap_interrupts_wake_word() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::with_values([("wake_word", "true")]));

    eventually("wake-word capture", || {
        running.mic.open_stream() == Some(CaptureKind::WakeWord)
    })
    .await;

    running.controls.send(Control::Tap).unwrap();
    eventually("active capture", || {
        running.mic.open_stream() == Some(CaptureKind::Active)
    })
    .await;

    // Tap again to stop without speaking
    running.controls.send(Control::Tap).unwrap();
    eventually("back to wake word", || {
        running.mic.open_stream() == Some(CaptureKind::WakeWord)
    })
    .await;

    let assistant = running.stop().await;
    assert!(assistant.history().is_empty());
}

#[tokio::test]
async fn test_toggling_wake_word() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::new());

    running.controls.send(Control::WakeWord(true)).unwrap();
    eventually("wake-word capture", || {
        running.mic.open_stream() == Some(CaptureKind::WakeWord)
    })
    .await;

    running.controls.send(Control::WakeWord(false)).unwrap();
    eventually("capture closed", || running.mic.open_stream().is_none()).await;

    let assistant = running.stop().await;
    assert!(!assistant.session().wake_word_enabled());
    assert!(
        harness
            .speech
            .displayed()
            .contains(&"Wake word disabled. Tap the microphone to speak.".to_string())
    );
}

#[tokio::test]
async fn test_silence_reports_no_speech() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::new());

    running.controls.send(Control::Tap).unwrap();
    eventually("active capture", || {
        running.mic.open_stream() == Some(CaptureKind::Active)
    })
    .await;
    assert!(running.mic.hear("   "));

    eventually("no speech message", || {
        harness
            .speech
            .displayed()
            .contains(&"I didn't hear anything. Please try again.".to_string())
    })
    .await;

    let assistant = running.stop().await;
    assert!(assistant.history().is_empty());
    assert!(harness.speech.spoken().is_empty());
}

#[tokio::test]
async fn test_controls_report_history_and_status() {
    let harness = Harness::new();
    let running = start(&harness, MemorySettingsStore::new());

    running.controls.send(Control::History).unwrap();
    running.controls.send(Control::Speed(0.0)).unwrap();
    running.controls.send(Control::Speed(1.2)).unwrap();
    running.controls.send(Control::Status).unwrap();

    eventually("status line", || {
        harness
            .speech
            .displayed()
            .iter()
            .any(|line| line.starts_with("mode: idle"))
    })
    .await;

    let displayed = harness.speech.displayed();
    assert!(displayed.contains(&"No chat history yet. Start talking to Vyra!".to_string()));
    assert!(displayed.iter().any(|line| line.starts_with("invalid setting voice_speed")));
    assert!(displayed.contains(&"Voice speed: 1.2x".to_string()));
    assert!(displayed.iter().any(|line| line.contains("speed: 1.2x")));

    running.stop().await;
}
