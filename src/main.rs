use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use vyra::voice::{ConsoleCapture, ConsoleMicrophone, ConsoleSpeech, SpeechOutput};
use vyra::{
    Assistant, Config, Control, ConversationLog, FileSettingsStore, IntentBackend,
    ListeningStateMachine, LogOpener, Realizer, RemoteIntentResolver, Runtime, SessionContext,
    SystemOpener, TranscriptMatcher, UrlOpener, Utterance,
};

/// Vyra - voice assistant you can talk to from the terminal
///
/// Lines typed on stdin are treated as recognized speech; lines starting with
/// `/` are controls (`/help` lists them).
#[derive(Parser)]
#[command(name = "vyra", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for persisted settings
    #[arg(long, env = "VYRA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log URLs instead of opening them in a browser
    #[arg(long)]
    no_browser: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single request and exit
    Ask {
        /// What to say to Vyra
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Check whether the remote backend is reachable
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; stdout belongs to the conversation
    let filter = match cli.verbose {
        0 => "warn",
        1 => "warn,vyra=info",
        2 => "info,vyra=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let backend = Arc::new(RemoteIntentResolver::from_config(&config.remote)?);

    if matches!(cli.command, Some(Command::Health)) {
        let status = backend.health().await;
        println!("{status}");
        anyhow::ensure!(status.is_online(), "backend is not available");
        return Ok(());
    }

    let session = SessionContext::load(
        FileSettingsStore::open(config.settings_path()),
        config.speech.default_rate,
    );
    let speech: Arc<dyn SpeechOutput> = Arc::new(ConsoleSpeech);
    let opener: Arc<dyn UrlOpener> = if cli.no_browser {
        Arc::new(LogOpener::new())
    } else {
        Arc::new(SystemOpener)
    };
    let mut assistant = Assistant::new(
        session,
        ConversationLog::new(config.history_capacity),
        TranscriptMatcher::new(),
        Realizer::new(speech, opener, config.speech.effect_delay),
    )
    .with_backend(backend, config.remote.use_ai);

    if let Some(Command::Ask { text }) = cli.command {
        assistant.respond(&Utterance::new(text.join(" "))).await;
        return Ok(());
    }

    tracing::info!(
        data_dir = %config.data_dir.display(),
        backend = %config.remote.primary_url,
        "starting vyra"
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (capture, mic) = ConsoleCapture::new(event_tx);
    let machine = ListeningStateMachine::new(&config.listening)?;

    let (control_tx, control_rx) = mpsc::unbounded_channel();
    spawn_stdin_reader(mic, control_tx);

    Runtime::new(assistant, machine, capture, event_rx)
        .run(control_rx)
        .await;
    Ok(())
}

/// Read stdin on a blocking thread; controls go to the runtime, everything
/// else to the microphone
fn spawn_stdin_reader(mic: ConsoleMicrophone, controls: mpsc::UnboundedSender<Control>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read stdin");
                    break;
                }
            };
            let text = line.trim();

            if text.starts_with('/') {
                match Control::parse(text) {
                    Ok(control) => {
                        if controls.send(control).is_err() {
                            break;
                        }
                    }
                    Err(e) => println!("  {e}. Type /help for commands."),
                }
            } else if !mic.hear(text) && !text.is_empty() {
                println!("  The microphone is off. Type /tap to speak.");
            }
        }

        // stdin closed
        let _ = controls.send(Control::Quit);
    });
}
