use std::path::Path;

use hound::{SampleFormat, WavReader};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::AudioError;

/// Transcription-friendly rate; the whole recording is normalized to this
/// once, before any window is sliced.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

const SAMPLES_PER_MS: u64 = TARGET_SAMPLE_RATE as u64 / 1000;
const RESAMPLE_CHUNK: usize = 1024;

/// The loaded recording as mono 16 kHz f32 PCM. Immutable once built.
pub struct AudioTrack {
    samples: Vec<f32>,
}

impl AudioTrack {
    /// Decode a WAV file and normalize it to mono 16 kHz.
    pub fn load_wav(path: &Path) -> Result<Self, AudioError> {
        let mut reader = WavReader::open(path).map_err(|e| AudioError::Open(e.to_string()))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AudioError::Decode(e.to_string()))?,
            SampleFormat::Int => {
                let scale = match spec.bits_per_sample {
                    8 => 1.0 / f32::from(i8::MAX),
                    16 => 1.0 / f32::from(i16::MAX),
                    24 => 1.0 / 8_388_607.0,
                    32 => 1.0 / i32::MAX as f32,
                    bits => {
                        return Err(AudioError::Unsupported(format!(
                            "{bits}-bit integer samples"
                        )));
                    }
                };
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| AudioError::Decode(e.to_string()))?
            }
        };

        Self::from_interleaved(&interleaved, spec.sample_rate, spec.channels)
    }

    /// Build a track from interleaved PCM at an arbitrary rate and channel
    /// count. Downmixes to mono, then resamples to 16 kHz if needed.
    pub fn from_interleaved(
        interleaved: &[f32],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, AudioError> {
        if channels == 0 {
            return Err(AudioError::Unsupported("zero channels".into()));
        }
        if sample_rate == 0 {
            return Err(AudioError::Unsupported("zero sample rate".into()));
        }

        let mono = downmix(interleaved, channels);
        let samples = if sample_rate == TARGET_SAMPLE_RATE {
            mono
        } else {
            resample_to_target(&mono, sample_rate)?
        };

        Ok(Self { samples })
    }

    /// Total length in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.samples.len() as u64 / SAMPLES_PER_MS
    }

    /// Half-open slice `[start_ms, end_ms)`; the end is clamped to the track.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> &[f32] {
        let start = (start_ms * SAMPLES_PER_MS).min(self.samples.len() as u64) as usize;
        let end = (end_ms * SAMPLES_PER_MS).min(self.samples.len() as u64) as usize;
        &self.samples[start..end.max(start)]
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    let channels = channels as usize;
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample mono audio to 16 kHz using a windowed sinc filter. The final
/// partial block is zero-padded; the padding adds under one block of
/// trailing silence.
fn resample_to_target(input: &[f32], input_rate: u32) -> Result<Vec<f32>, AudioError> {
    let ratio = f64::from(TARGET_SAMPLE_RATE) / f64::from(input_rate);
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        oversampling_factor: 256,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| AudioError::ResamplerInit(e.to_string()))?;

    let mut output = Vec::with_capacity((input.len() as f64 * ratio) as usize + RESAMPLE_CHUNK);
    let mut block = vec![0.0f32; RESAMPLE_CHUNK];

    for chunk in input.chunks(RESAMPLE_CHUNK) {
        block[..chunk.len()].copy_from_slice(chunk);
        block[chunk.len()..].fill(0.0);
        let result = resampler
            .process(&[&block], None)
            .map_err(|e| AudioError::ResampleFailed(e.to_string()))?;
        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    Ok(output)
}

/// Encode f32 PCM samples as a WAV artifact (RIFF/WAVE, IEEE float32, mono).
/// The buffer lives only for the duration of one transcription call.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 32;
    let block_align = num_channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * u32::from(block_align);
    let data_size = (samples.len() * 4) as u32;
    // IEEE float needs the extended fmt chunk (size 18) plus a fact chunk.
    let fmt_chunk_size: u32 = 18;
    let fact_chunk_size: u32 = 4;
    let file_size = 4 + (8 + fmt_chunk_size) + (8 + fact_chunk_size) + (8 + data_size);

    let mut buf = Vec::with_capacity(12 + file_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk (IEEE float = format code 3)
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&fmt_chunk_size.to_le_bytes());
    buf.extend_from_slice(&3u16.to_le_bytes());
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // cbSize = 0

    // fact sub-chunk (required for non-PCM)
    buf.extend_from_slice(b"fact");
    buf.extend_from_slice(&fact_chunk_size.to_le_bytes());
    buf.extend_from_slice(&(samples.len() as u32).to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }

    buf
}
