pub mod groq;

use crate::{GenerateError, TranscribeError};

pub use groq::GroqClient;

/// One transcription call: an encoded WAV artifact plus decoding hints.
/// Requests are stateless; nothing here carries identity or session state.
pub struct TranscribeRequest<'a> {
    pub wav_bytes: &'a [u8],
    pub model: &'a str,
    pub temperature: f32,
    /// `None` means auto-detect; the field is omitted from the wire call.
    pub language: Option<&'a str>,
}

/// Narrow synchronous interface over "transcribe audio" and "complete chat
/// prompt". Everything above depends only on this trait, never on a
/// concrete provider.
pub trait CompletionClient: Send {
    fn name(&self) -> &'static str;

    /// Transcribe one encoded audio artifact to plain text.
    fn transcribe(&self, req: &TranscribeRequest<'_>) -> Result<String, TranscribeError>;

    /// Run one chat completion. Returns empty text when the provider
    /// returns no choices; any transport or provider problem is an error.
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerateError>;
}
