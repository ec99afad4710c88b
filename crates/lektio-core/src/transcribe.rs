use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use crate::audio::{AudioTrack, TARGET_SAMPLE_RATE, encode_wav};
use crate::client::{CompletionClient, TranscribeRequest};
use crate::windows::{format_range_label, plan_windows};
use crate::{PipelineEvent, TranscriptSegment};

const TRANSCRIBE_TEMPERATURE: f32 = 0.0;

/// Per-run transcription parameters.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub model: String,
    /// `None` lets the provider auto-detect.
    pub language: Option<String>,
    pub window_secs: u64,
}

/// Drive sequential per-window transcription over the whole recording.
///
/// Windows are processed strictly in order. The cancellation flag is polled
/// once per window, before any work for that window starts; segments already
/// produced are retained, later windows are never dispatched. Any export or
/// provider failure aborts the remaining windows (fail-fast). A terminal
/// `Done` event is always emitted.
pub fn run_transcription(
    client: &dyn CompletionClient,
    track: &AudioTrack,
    options: &TranscribeOptions,
    cancel: &AtomicBool,
    tx: &Sender<PipelineEvent>,
) -> Vec<TranscriptSegment> {
    let total_ms = track.total_ms();
    let windows = plan_windows(total_ms, options.window_secs);
    let count = windows.len();
    let mut segments = Vec::with_capacity(count);
    let mut interrupted = false;

    for window in windows {
        if cancel.load(Ordering::Relaxed) {
            let _ = tx.send(PipelineEvent::Status("canceled".into()));
            interrupted = true;
            break;
        }

        // The encoded artifact lives only for this one call.
        let wav_bytes = encode_wav(
            track.slice_ms(window.start_ms, window.end_ms),
            TARGET_SAMPLE_RATE,
        );
        let request = TranscribeRequest {
            wav_bytes: &wav_bytes,
            model: &options.model,
            temperature: TRANSCRIBE_TEMPERATURE,
            language: options.language.as_deref(),
        };

        let text = match client.transcribe(&request) {
            Ok(text) => text,
            Err(e) => {
                let _ = tx.send(PipelineEvent::Error(format!(
                    "transcription failed on chunk {}/{count}: {e}",
                    window.index + 1
                )));
                interrupted = true;
                break;
            }
        };

        let _ = tx.send(PipelineEvent::Append(format!(
            "{}\n{text}\n\n",
            format_range_label(&window)
        )));
        let _ = tx.send(PipelineEvent::Progress(
            window.end_ms as f64 / total_ms as f64 * 100.0,
        ));
        let _ = tx.send(PipelineEvent::Status(format!(
            "chunk {}/{count} completed",
            window.index + 1
        )));

        segments.push(TranscriptSegment { window, text });
    }

    if !interrupted {
        let _ = tx.send(PipelineEvent::Status("transcription completed".into()));
    }
    let _ = tx.send(PipelineEvent::Done);

    segments
}
