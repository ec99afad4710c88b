use std::io;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::Args;
use lektio_core::audio::AudioTrack;
use lektio_core::client::groq::{ChatSettings, GroqClient};
use lektio_core::pipeline::{run_generation, GenerateOptions};
use lektio_core::render::render_transcript;
use lektio_core::summary::SummaryTargets;
use lektio_core::transcribe::{run_transcription, TranscribeOptions};
use lektio_core::{AudioError, PipelineEvent, StudyPack, TranscribeError};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::output::{OutputError, RunDir};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("client error: {0}")]
    Client(#[from] TranscribeError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0} already in progress")]
    Busy(&'static str),
    #[error("missing AUDIO input (see lektio --help)")]
    MissingInput,
    #[error("transcription did not complete")]
    TranscribeFailed,
    #[error("study package generation failed")]
    GenerateFailed,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// WAV recording to process
    pub audio: Option<PathBuf>,

    /// Transcription window length in seconds
    #[arg(long)]
    pub window_secs: Option<u64>,

    /// Spoken language code, or auto
    #[arg(long)]
    pub language: Option<String>,

    /// Transcription model override
    #[arg(long)]
    pub transcribe_model: Option<String>,

    /// Chat model override for notes and study items
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Number of exam questions to generate
    #[arg(long)]
    pub questions: Option<usize>,

    /// Number of flashcards to generate
    #[arg(long)]
    pub flashcards: Option<usize>,

    /// Number of glossary entries to generate
    #[arg(long)]
    pub glossary: Option<usize>,

    /// Base directory for the run artifacts
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Stop after writing the transcript
    #[arg(long)]
    pub transcript_only: bool,
}

/// One background worker at a time. Starting a task while the previous
/// one is still running is rejected instead of queued.
struct TaskSlot {
    label: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            handle: None,
        }
    }

    fn spawn<F>(&mut self, name: &str, task: F) -> Result<(), RunError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_active() {
            return Err(RunError::Busy(self.label));
        }
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(task)
            .map_err(RunError::Io)?;
        self.handle = Some(handle);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[derive(Debug, Default)]
struct DrainSummary {
    failed: bool,
    canceled: bool,
    pack: Option<StudyPack>,
}

pub fn run(config: &Config, args: &RunArgs) -> Result<(), RunError> {
    config.validate()?;
    let audio_path = args.audio.as_ref().ok_or(RunError::MissingInput)?;

    let api_key = std::env::var("GROQ_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .unwrap_or_else(|| config.auth.api_key.clone());

    let chat = ChatSettings {
        model: args
            .chat_model
            .clone()
            .unwrap_or_else(|| config.generate.model.clone()),
        temperature: config.generate.temperature,
        max_tokens: config.generate.max_tokens,
    };
    let client = Arc::new(GroqClient::new(&api_key, chat)?);

    let transcribe_options = TranscribeOptions {
        model: args
            .transcribe_model
            .clone()
            .unwrap_or_else(|| config.transcribe.model.clone()),
        language: normalize_language(
            args.language
                .as_deref()
                .unwrap_or(&config.transcribe.language),
        ),
        window_secs: args.window_secs.unwrap_or(config.transcribe.window_secs),
    };

    let generate_options = GenerateOptions {
        chunk_chars: config.generate.chunk_chars,
        summary: SummaryTargets {
            min_words: config.generate.summary_words_min,
            max_words: config.generate.summary_words_max,
        },
        questions: args.questions.unwrap_or(config.generate.questions),
        flashcards: args.flashcards.unwrap_or(config.generate.flashcards),
        glossary: args.glossary.unwrap_or(config.generate.glossary),
    };

    let output_base = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.dir));

    eprintln!("loading {}", audio_path.display());
    let track = AudioTrack::load_wav(audio_path)?;
    eprintln!("loaded {} ms of audio", track.total_ms());

    let cancel = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&cancel))?;

    let mut slot = TaskSlot::new("a pipeline task");
    let (tx, rx) = mpsc::channel::<PipelineEvent>();
    let (segments_tx, segments_rx) = mpsc::channel();

    {
        let client = Arc::clone(&client);
        let cancel = Arc::clone(&cancel);
        let tx = tx.clone();
        slot.spawn("lektio-transcribe", move || {
            let segments =
                run_transcription(&*client, &track, &transcribe_options, &cancel, &tx);
            let _ = segments_tx.send(segments);
        })?;
    }

    let summary = drain_events(&rx);
    slot.join();

    let segments = segments_rx.try_recv().unwrap_or_default();
    if segments.is_empty() {
        empty_run_outcome(&summary)?;
        eprintln!("canceled before any audio was transcribed");
        return Ok(());
    }

    let transcript = render_transcript(&segments);
    let run_dir = RunDir::create(&output_base)?;
    let transcript_path = run_dir.write_transcript(&transcript)?;
    eprintln!("wrote {}", transcript_path.display());

    if summary.failed {
        return Err(RunError::TranscribeFailed);
    }
    if summary.canceled {
        eprintln!("canceled; partial transcript kept");
        return Ok(());
    }
    if args.transcript_only {
        return Ok(());
    }

    {
        let client = Arc::clone(&client);
        let tx = tx.clone();
        let transcript = transcript.clone();
        slot.spawn("lektio-generate", move || {
            run_generation(&*client, &transcript, &generate_options, &tx);
        })?;
    }

    let summary = drain_events(&rx);
    slot.join();

    let pack = match summary.pack {
        Some(pack) if !summary.failed => pack,
        _ => return Err(RunError::GenerateFailed),
    };

    let written = run_dir.write_pack(&pack)?;
    for path in &written {
        eprintln!("wrote {}", path.display());
    }
    println!("{}", run_dir.path.display());
    Ok(())
}

/// No windows completed: a cancel is a clean exit, anything else is a
/// transcription failure.
fn empty_run_outcome(summary: &DrainSummary) -> Result<(), RunError> {
    if summary.canceled {
        Ok(())
    } else {
        Err(RunError::TranscribeFailed)
    }
}

fn normalize_language(language: &str) -> Option<String> {
    let language = language.trim();
    if language.is_empty() || language.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(language.to_string())
    }
}

/// Polls the event channel at a fixed cadence until the worker signals
/// completion, mirroring events to the terminal as they arrive.
fn drain_events(rx: &Receiver<PipelineEvent>) -> DrainSummary {
    let mut summary = DrainSummary::default();
    loop {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(PipelineEvent::Append(text)) => println!("{text}"),
            Ok(PipelineEvent::Progress(pct)) => eprintln!("progress {pct:5.1}%"),
            Ok(PipelineEvent::Status(status)) => {
                if status == "canceled" {
                    summary.canceled = true;
                }
                eprintln!("status: {status}");
            }
            Ok(PipelineEvent::Error(message)) => {
                summary.failed = true;
                eprintln!("error: {message}");
            }
            Ok(PipelineEvent::Results(pack)) => summary.pack = Some(pack),
            Ok(PipelineEvent::EnableGenerate) => {}
            Ok(PipelineEvent::Done) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    summary
}
