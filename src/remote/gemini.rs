//! `GeminiClient`: the production [`ScriptureSource`] and
//! [`SpeechSynthesizer`].
//!
//! Every request is a `POST {base_url}/v1beta/models/{model}:generateContent`.
//! All connection details come from [`RemoteConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};

use super::error::RemoteError;
use super::prompt;
use super::{ScriptureSource, SpeechSynthesizer};
use crate::audio::{SpeechStyle, VoiceId};
use crate::config::RemoteConfig;
use crate::model::{Chapter, DailyHighlight};

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl GeminiClient {
    /// Build a client from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Send one `generateContent` request and return the parsed envelope.
    async fn generate(&self, model: &str, body: Value) -> Result<Value, RemoteError> {
        let key = self.config.api_key.as_deref().unwrap_or("");
        if key.is_empty() {
            return Err(RemoteError::MissingApiKey);
        }

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: truncate(&body, 300),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }

    async fn generate_json<T: serde::de::DeserializeOwned>(
        &self,
        prompt: String,
        system: Option<&str>,
        schema: Value,
    ) -> Result<T, RemoteError> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        let envelope = self.generate(&self.config.text_model, body).await?;
        let text = response_text(&envelope)?;
        serde_json::from_str(&text).map_err(|e| RemoteError::Schema(e.to_string()))
    }
}

fn chapter_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "bookName": { "type": "STRING" },
            "chapterNumber": { "type": "INTEGER" },
            "verses": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "number": { "type": "INTEGER" },
                        "text": { "type": "STRING" }
                    },
                    "required": ["number", "text"]
                }
            }
        },
        "required": ["bookName", "chapterNumber", "verses"]
    })
}

fn daily_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "verse": { "type": "STRING" },
            "reference": { "type": "STRING" }
        },
        "required": ["verse", "reference"]
    })
}

// ---------------------------------------------------------------------------
// Envelope helpers
// ---------------------------------------------------------------------------

/// Concatenated text parts of the first candidate.
fn response_text(envelope: &Value) -> Result<String, RemoteError> {
    let parts = envelope["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or(RemoteError::EmptyResponse)?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(RemoteError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Raw PCM bytes from the first inline-data part of the first candidate.
fn response_audio(envelope: &Value) -> Result<Vec<u8>, RemoteError> {
    let data = envelope["candidates"][0]["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.iter().find_map(|p| p["inlineData"]["data"].as_str()))
        .filter(|d| !d.is_empty())
        .ok_or(RemoteError::EmptyResponse)?;

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| RemoteError::Parse(format!("audio payload is not base64: {e}")))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

#[async_trait]
impl ScriptureSource for GeminiClient {
    async fn generate_chapter(&self, book_name: &str, chapter: u32) -> Result<Chapter, RemoteError> {
        self.generate_json(
            prompt::chapter_prompt(book_name, chapter),
            Some(prompt::CHAPTER_SYSTEM_INSTRUCTION),
            chapter_schema(),
        )
        .await
    }

    async fn generate_reflection(&self, chapter_text: &str) -> Result<String, RemoteError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt::reflection_prompt(chapter_text) }] }],
            "systemInstruction": { "parts": [{ "text": prompt::REFLECTION_SYSTEM_INSTRUCTION }] },
            "generationConfig": { "thinkingConfig": { "thinkingBudget": 0 } }
        });
        let envelope = self.generate(&self.config.text_model, body).await?;
        response_text(&envelope)
    }

    async fn generate_daily_verse(&self) -> Result<DailyHighlight, RemoteError> {
        self.generate_json(prompt::DAILY_VERSE_PROMPT.to_string(), None, daily_schema())
            .await
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(
        &self,
        text: &str,
        voice: VoiceId,
        style: SpeechStyle,
    ) -> Result<Vec<u8>, RemoteError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt::speech_prompt(text, style) }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice.api_name() }
                    }
                }
            }
        });
        let envelope = self.generate(&self.config.speech_model, body).await?;
        response_audio(&envelope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
