//! Google Gemini client
//!
//! Replies stream over `streamGenerateContent?alt=sse`; welcome, summary
//! and challenge text use one-shot `generateContent` calls.

use super::prompt::{self, Speaker, Turn};
use super::{FragmentStream, GenerationClient, GenerationError};
use crate::catalog::{Mood, Persona};
use crate::store::state::ChatMessage;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(60);

/// Gemini client implementation
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.base_url, self.model)
    }

    async fn post(
        &self,
        url: &str,
        request: &GeminiRequest,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, GenerationError> {
        let mut builder = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                GenerationError::network(format!("Connection failed: {e}"))
            } else {
                GenerationError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<GeminiErrorResponse>(&body)
            .map_or(body, |e| e.error.message);
        Err(GenerationError::from_status(status.as_u16(), &message))
    }

    /// One-shot call returning the concatenated candidate text
    async fn generate_text(
        &self,
        system: Option<String>,
        user_prompt: String,
    ) -> Result<String, GenerationError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::Text { text: user_prompt }],
            }],
            system_instruction: system.map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text { text }],
            }),
        };

        let response = self
            .post(&self.endpoint("generateContent"), &request, Some(ONE_SHOT_TIMEOUT))
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::network(format!("Failed to read response: {e}")))?;
        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(GenerationError::unknown("Empty response"));
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn stream_reply(
        &self,
        persona: &Persona,
        mood: Option<&Mood>,
        history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError> {
        let request = GeminiRequest {
            contents: prompt::conversation(history)
                .into_iter()
                .map(GeminiContent::from)
                .collect(),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: prompt::system_instruction(persona, mood),
                }],
            }),
        };

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, &request, None).await?;

        let fragments = response
            .bytes_stream()
            .scan(SseDecoder::default(), |decoder, chunk| {
                let items: Vec<Result<String, GenerationError>> = match chunk {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .filter_map(|payload| parse_stream_chunk(&payload).transpose())
                        .collect(),
                    Err(e) => vec![Err(GenerationError::stream(format!(
                        "Stream interrupted: {e}"
                    )))],
                };
                futures::future::ready(Some(futures::stream::iter(items)))
            })
            .flatten();

        Ok(fragments.boxed())
    }

    async fn welcome_message(
        &self,
        persona: &Persona,
        mood: &Mood,
    ) -> Result<String, GenerationError> {
        self.generate_text(
            Some(prompt::system_instruction(persona, Some(mood))),
            prompt::welcome_prompt(persona, mood),
        )
        .await
    }

    async fn chat_summary(
        &self,
        persona_name: &str,
        history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        self.generate_text(None, prompt::summary_prompt(persona_name, history))
            .await
    }

    async fn daily_challenge(&self) -> Result<String, GenerationError> {
        self.generate_text(None, prompt::DAILY_CHALLENGE_PROMPT.to_string())
            .await
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Server-sent events
// ============================================================================

/// Splits a byte stream into SSE `data:` payloads
///
/// Lines may arrive split across chunks; a partial line stays buffered until
/// its newline shows up.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() && data != "[DONE]" {
                    payloads.push(data.to_string());
                }
            }
        }
        payloads
    }
}

/// Text carried by one streamed response chunk, if any
fn parse_stream_chunk(payload: &str) -> Result<Option<String>, GenerationError> {
    let chunk: GeminiResponse = serde_json::from_str(payload)
        .map_err(|e| GenerationError::stream(format!("Unreadable stream chunk: {e}")))?;
    if let Some(reason) = chunk
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(GenerationError::new(
            super::GenerationErrorKind::InvalidRequest,
            format!("Prompt blocked: {reason}"),
        ));
    }
    let text = chunk.text();
    Ok((!text.is_empty()).then_some(text))
}

/// Split a `data:` URL into its MIME type and base64 payload
fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let (meta, data) = url.strip_prefix("data:")?.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    (!mime_type.is_empty()).then_some((mime_type, data))
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

impl From<Turn> for GeminiContent {
    fn from(turn: Turn) -> Self {
        let role = match turn.speaker {
            Speaker::User => "user",
            Speaker::Model => "model",
        };
        let mut parts: Vec<GeminiPart> = turn
            .image_urls
            .iter()
            .filter_map(|url| {
                let parsed = parse_data_url(url);
                if parsed.is_none() {
                    tracing::debug!("Skipping image that is not a base64 data URL");
                }
                parsed
            })
            .map(|(mime_type, data)| GeminiPart::InlineData {
                inline_data: GeminiBlob {
                    mime_type: mime_type.to_string(),
                    data: data.to_string(),
                },
            })
            .collect();
        if !turn.text.is_empty() {
            parts.push(GeminiPart::Text { text: turn.text });
        }
        Self {
            role: Some(role.to_string()),
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

impl GeminiResponse {
    /// Text of the first candidate, thought parts excluded
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
