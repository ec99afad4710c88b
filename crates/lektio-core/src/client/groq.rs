use serde::Deserialize;
use serde_json::json;
use ureq::Agent;
use ureq::unversioned::multipart::{Form, Part};

use crate::http::default_agent;
use crate::{GenerateError, TranscribeError};

use super::{CompletionClient, TranscribeRequest};

const GROQ_TRANSCRIPTIONS_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Chat completion parameters fixed at construction; no call varies them.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Cloud completion client backed by the Groq OpenAI-compatible API.
pub struct GroqClient {
    agent: Agent,
    api_key: String,
    chat: ChatSettings,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl GroqClient {
    pub fn new(api_key: &str, chat: ChatSettings) -> Result<Self, TranscribeError> {
        let api_key = Some(api_key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| TranscribeError::NotConfigured("API key not set".into()))?
            .to_string();
        Ok(Self {
            agent: default_agent(),
            api_key,
            chat,
        })
    }

    fn build_chat_body(&self, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": self.chat.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.chat.temperature,
            "max_tokens": self.chat.max_tokens,
        })
    }

    fn build_transcribe_form<'a>(
        req: &'a TranscribeRequest<'a>,
        temperature: &'a str,
    ) -> Result<Form<'a>, TranscribeError> {
        let mut form = Form::new()
            .text("model", req.model)
            .text("temperature", temperature)
            .text("response_format", "json");
        if let Some(language) = req.language {
            form = form.text("language", language);
        }
        Ok(form.part(
            "file",
            Part::bytes(req.wav_bytes)
                .file_name("audio.wav")
                .mime_str("audio/wav")
                .map_err(|e| TranscribeError::Network(format!("{e}")))?,
        ))
    }

    fn parse_chat_response(body: &str) -> Result<String, GenerateError> {
        let response: ChatResponse =
            serde_json::from_str(body).map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        // No choices is an empty completion, not an error.
        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default())
    }
}

impl CompletionClient for GroqClient {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn transcribe(&self, req: &TranscribeRequest<'_>) -> Result<String, TranscribeError> {
        // The form borrows this for its whole lifetime.
        let temperature = req.temperature.to_string();
        let form = Self::build_transcribe_form(req, &temperature)?;

        let response = self
            .agent
            .post(GROQ_TRANSCRIPTIONS_URL)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(form)
            .map_err(|e| TranscribeError::Network(format!("{e}")))?;

        let parsed: TranscriptionResponse = response
            .into_body()
            .read_json()
            .map_err(|e| TranscribeError::InvalidResponse(format!("{e}")))?;

        Ok(parsed.text.trim().to_string())
    }

    fn complete(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let body = self.build_chat_body(system, user);

        let response = self
            .agent
            .post(GROQ_CHAT_URL)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| GenerateError::Network(format!("{e}")))?;

        let raw = response
            .into_body()
            .read_to_string()
            .map_err(|e| GenerateError::Network(format!("{e}")))?;

        Self::parse_chat_response(raw.trim())
    }
}
