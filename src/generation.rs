//! Text generation service abstraction
//!
//! Replies arrive as a lazy stream of text fragments; welcome, summary and
//! daily challenge text are one-shot calls.

mod error;
mod gemini;
mod prompt;

pub use error::{GenerationError, GenerationErrorKind};
pub use gemini::GeminiClient;

use crate::catalog::{Mood, Persona};
use crate::store::state::ChatMessage;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Fragments of one streamed reply, in order
pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

/// Common interface for generation providers
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Open a reply stream for the given history
    async fn stream_reply(
        &self,
        persona: &Persona,
        mood: Option<&Mood>,
        history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError>;

    /// Opening line that acknowledges the mood picked at check-in
    async fn welcome_message(&self, persona: &Persona, mood: &Mood)
        -> Result<String, GenerationError>;

    /// Short summary stored with a saved chat
    async fn chat_summary(
        &self,
        persona_name: &str,
        history: &[ChatMessage],
    ) -> Result<String, GenerationError>;

    /// Text of today's self-care challenge
    async fn daily_challenge(&self) -> Result<String, GenerationError>;

    fn model_id(&self) -> &str;
}

/// Logging wrapper for generation clients
pub struct LoggingClient {
    inner: Arc<dyn GenerationClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn GenerationClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }

    fn log_outcome<T>(&self, call: &str, start: Instant, result: &Result<T, GenerationError>) {
        let duration = start.elapsed();
        match result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    call,
                    duration_ms = %duration.as_millis(),
                    "Generation request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    call,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Generation request failed"
                );
            }
        }
    }
}

#[async_trait]
impl GenerationClient for LoggingClient {
    async fn stream_reply(
        &self,
        persona: &Persona,
        mood: Option<&Mood>,
        history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError> {
        let start = Instant::now();
        let result = self.inner.stream_reply(persona, mood, history).await;
        self.log_outcome("stream_reply", start, &result);

        let model_id = self.model_id.clone();
        result.map(|stream| {
            let mut fragments = 0usize;
            stream
                .inspect(move |item| match item {
                    Ok(_) => fragments += 1,
                    Err(e) => tracing::warn!(
                        model = %model_id,
                        fragments,
                        error = %e.message,
                        "Reply stream failed"
                    ),
                })
                .boxed()
        })
    }

    async fn welcome_message(
        &self,
        persona: &Persona,
        mood: &Mood,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = self.inner.welcome_message(persona, mood).await;
        self.log_outcome("welcome_message", start, &result);
        result
    }

    async fn chat_summary(
        &self,
        persona_name: &str,
        history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = self.inner.chat_summary(persona_name, history).await;
        self.log_outcome("chat_summary", start, &result);
        result
    }

    async fn daily_challenge(&self) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = self.inner.daily_challenge().await;
        self.log_outcome("daily_challenge", start, &result);
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Stand-in used when no API key is configured; every call fails
pub struct UnavailableClient;

impl UnavailableClient {
    fn error() -> GenerationError {
        GenerationError::unavailable("No generation service configured (set GEMINI_API_KEY)")
    }
}

#[async_trait]
impl GenerationClient for UnavailableClient {
    async fn stream_reply(
        &self,
        _persona: &Persona,
        _mood: Option<&Mood>,
        _history: &[ChatMessage],
    ) -> Result<FragmentStream, GenerationError> {
        Err(Self::error())
    }

    async fn welcome_message(
        &self,
        _persona: &Persona,
        _mood: &Mood,
    ) -> Result<String, GenerationError> {
        Err(Self::error())
    }

    async fn chat_summary(
        &self,
        _persona_name: &str,
        _history: &[ChatMessage],
    ) -> Result<String, GenerationError> {
        Err(Self::error())
    }

    async fn daily_challenge(&self) -> Result<String, GenerationError> {
        Err(Self::error())
    }

    fn model_id(&self) -> &str {
        "unavailable"
    }
}
