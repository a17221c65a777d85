//! Application entry point — Voice Translator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create the [`tokio`] runtime (multi-thread).
//! 4. Build the translation and speech providers from config.
//! 5. Load the [`LanguageCatalog`] (degrades to a built-in table offline).
//! 6. Open the audio devices and the Whisper model, degrading gracefully.
//! 7. Spawn the [`Orchestrator`] and run the line-oriented front end until
//!    `/quit` or end of input.
//! 8. Remove every temporary audio file that is left.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use voice_translator::{
    audio::{AudioOutput, CpalMicrophone, OutputError, PlaybackHandle, RodioOutput},
    catalog::{display_name, LanguageCatalog},
    config::{AppConfig, AppPaths},
    pipeline::{Command, Orchestrator, Pane, Services, ViewEvent},
    status::{NoticeLevel, StatusReporter},
    stt::{NoModelRecognizer, SpeechRecognizer, TranscribeParams, WhisperRecognizer},
    translate,
    tts::{AudioPlaybackController, GoogleTts, PlaybackSettings, SpeechSynthesizer, TempAudioRegistry},
    voice::VoiceCaptureController,
};

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Languages,
    Status,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Command(Command::EditSource(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("translate", _) => Input::Command(Command::Translate),
        ("swap", _) => Input::Command(Command::Swap),
        ("from", lang) if !lang.is_empty() => Input::Command(Command::SelectSource(lang.into())),
        ("to", lang) if !lang.is_empty() => Input::Command(Command::SelectDest(lang.into())),
        ("speak", _) => Input::Command(Command::Speak(Pane::Source)),
        ("speak-dest", _) => Input::Command(Command::Speak(Pane::Dest)),
        ("stop", _) => Input::Command(Command::StopSpeech),
        ("voice", _) => Input::Command(Command::StartVoiceInput),
        ("languages", _) => Input::Languages,
        ("status", _) => Input::Status,
        ("help", _) => Input::Help,
        ("quit" | "exit", _) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

const HELP: &str = "\
Type text to set the source pane, or:
  /translate          translate the source pane
  /from <language>    source language (or 'auto')
  /to <language>      destination language
  /swap               swap source and destination
  /speak              read the source pane aloud
  /speak-dest         read the translation aloud
  /stop               stop playback
  /voice              speak into the microphone
  /languages          list languages
  /status             show the current status
  /quit               exit";

// ---------------------------------------------------------------------------
// Terminal view
// ---------------------------------------------------------------------------

/// What the terminal knows about the application, rebuilt from events.
#[derive(Default)]
struct View {
    selection: String,
    status: String,
}

impl View {
    fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::SourceReplaced(text) => println!("you said: {text}"),
            ViewEvent::Translated(text) => println!("=> {text}"),
            ViewEvent::SelectionChanged { source, dest } => {
                let source = source
                    .name()
                    .map(display_name)
                    .unwrap_or_else(|| "Auto".to_string());
                self.selection = format!("{source} → {}", display_name(&dest));
                println!("[{}]", self.selection);
            }
            ViewEvent::Notice(notice) => match notice.level {
                NoticeLevel::Info => println!("✓ {}", notice.message),
                NoticeLevel::Warning => println!("! {}", notice.message),
                NoticeLevel::Error => println!("✗ {}", notice.message),
            },
            ViewEvent::Status(status) => {
                log::debug!("status: {status}");
                self.status = status;
            }
        }
    }

    fn print_status(&self) {
        println!("[{}] {}", self.selection, self.status);
    }
}

fn print_languages(catalog: &LanguageCatalog) {
    for entry in catalog.entries() {
        let mut tags = Vec::new();
        if catalog.is_tts_capable(&entry.code) {
            tags.push("speech");
        }
        if catalog.is_recognition_capable(&entry.code) {
            tags.push("voice input");
        }
        if tags.is_empty() {
            println!("  {} ({})", display_name(&entry.name), entry.code);
        } else {
            println!(
                "  {} ({}) [{}]",
                display_name(&entry.name),
                entry.code,
                tags.join(", ")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Device fallbacks
// ---------------------------------------------------------------------------

/// Stand-in when no output device could be opened, so the rest of the
/// application still works.
struct NoAudioOutput {
    reason: String,
}

impl AudioOutput for NoAudioOutput {
    fn play(&self, _path: &Path) -> Result<PlaybackHandle, OutputError> {
        Err(OutputError::NoDevice(self.reason.clone()))
    }
}

fn load_recognizer(config: &AppConfig) -> Arc<dyn SpeechRecognizer> {
    let model_path = AppPaths::new().model_file(&config.voice.model);
    match WhisperRecognizer::load(&model_path, TranscribeParams::default()) {
        Ok(recognizer) => {
            log::info!("Whisper model loaded: {}", model_path.display());
            Arc::new(recognizer)
        }
        Err(e) => {
            log::warn!(
                "Could not load Whisper model ({}): {e}. Voice input will report an error.",
                model_path.display()
            );
            Arc::new(NoModelRecognizer::new(format!(
                "no speech model at {}",
                model_path.display()
            )))
        }
    }
}

fn open_output() -> Arc<dyn AudioOutput> {
    match RodioOutput::new() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            log::warn!("Audio output unavailable: {e}");
            Arc::new(NoAudioOutput {
                reason: e.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

async fn run(config: AppConfig) -> Result<()> {
    let translator = translate::from_config(&config.translation);
    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(GoogleTts::from_config(&config.speech));

    let (catalog, catalog_status) =
        LanguageCatalog::load(translator.as_ref(), synthesizer.as_ref()).await;
    let catalog = Arc::new(catalog);
    log::info!("{} languages available", catalog.len());

    let registry = TempAudioRegistry::new();
    let (status, status_rx) = StatusReporter::channel();

    let playback = Arc::new(AudioPlaybackController::new(
        synthesizer,
        open_output(),
        registry.clone(),
        Arc::clone(&catalog),
        status.clone(),
        PlaybackSettings::from(&config.speech),
    ));
    let voice = Arc::new(VoiceCaptureController::new(
        Arc::new(CpalMicrophone::new()),
        load_recognizer(&config),
        Arc::clone(&catalog),
        status,
        &config.voice,
    ));

    let services = Services {
        translator,
        catalog: Arc::clone(&catalog),
        catalog_status,
        playback,
        voice,
    };
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel::<Command>(32);
    let orchestrator = Orchestrator::new(services, &config, status_rx, event_tx);
    let pipeline = tokio::spawn(orchestrator.run(command_rx));

    println!("{HELP}");
    let mut view = View::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Input::Command(command) => command_tx.send(command).await?,
                    Input::Languages => print_languages(&catalog),
                    Input::Status => view.print_status(),
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Unknown(input) => println!("unknown command: {input} (try /help)"),
                    Input::Empty => {}
                }
            }
            Some(event) = event_rx.recv() => view.apply(event),
        }
    }

    // Closing the channel stops playback and lets running work finish.
    drop(command_tx);
    while let Some(event) = event_rx.recv().await {
        view.apply(event);
    }
    if let Err(e) = pipeline.await {
        log::error!("pipeline task failed: {e}");
    }

    registry.cleanup();
    Ok(())
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Voice Translator starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let result = rt.block_on(run(config));
    // A pending stdin read would otherwise keep the runtime alive.
    rt.shutdown_background();
    result
}
