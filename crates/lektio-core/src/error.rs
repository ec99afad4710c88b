use thiserror::Error;

/// Errors from loading and slicing the source recording.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio open failed: {0}")]
    Open(String),

    #[error("audio decode failed: {0}")]
    Decode(String),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    #[error("resampler initialization failed: {0}")]
    ResamplerInit(String),

    #[error("resample failed: {0}")]
    ResampleFailed(String),
}

/// Errors from the transcription capability of a completion client.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from the chat completion capability of a completion client.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
