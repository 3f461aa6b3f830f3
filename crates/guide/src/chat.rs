//! Tutor chat session.
//!
//! A session owns one [`Transcript`]. Each `send` appends the user turn,
//! re-sends the whole transcript, and appends the reply. When the call
//! fails a synthetic assistant turn is appended instead, so every attempt
//! grows the transcript by exactly two entries.

use gongbu_core::error::GuideError;
use gongbu_core::message::{Message, Transcript};
use gongbu_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::builder::GeneratedGuide;
use crate::prompt;

/// Text of the assistant turn recorded when the endpoint could not answer.
pub const FALLBACK_REPLY: &str = "죄송해요, 지금은 답변을 가져오지 못했어요. 잠시 후 다시 질문해 주세요.";

pub struct ChatSession {
    id: String,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    transcript: Transcript,
    /// Unit title of the guide the session was opened from.
    topic: Option<String>,
}

impl ChatSession {
    /// Open a session with a free-text system instruction.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            transcript: Transcript::new(system),
            topic: None,
        }
    }

    /// Open a session seeded from a generated guide.
    pub fn for_guide(provider: Arc<dyn Provider>, model: impl Into<String>, generated: &GeneratedGuide) -> Self {
        let system = prompt::chat_prompt(&generated.request, &generated.guide);
        let topic = if generated.guide.unit_title.is_empty() {
            generated.request.unit_range.clone()
        } else {
            generated.guide.unit_title.clone()
        };
        Self {
            topic: Some(topic),
            ..Self::new(provider, model, system)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Send one user turn and return the assistant reply.
    ///
    /// On failure the transcript still gains the user turn and a fallback
    /// assistant turn, and the classified error is returned.
    pub async fn send(&mut self, text: &str) -> Result<Message, GuideError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GuideError::InvalidRequest("message must not be empty".into()));
        }

        self.transcript.push(Message::user(text));

        let request = ProviderRequest::new(&self.model, self.transcript.messages().to_vec())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        debug!(session = %self.id, turns = self.transcript.turns().len(), "Sending tutor turn");

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = Message::assistant(response.message.content);
                self.transcript.push(reply.clone());
                Ok(reply)
            }
            Err(e) => {
                warn!(session = %self.id, provider = %self.provider.name(), error = %e, "Tutor reply failed");
                self.transcript.push(Message::fallback(FALLBACK_REPLY));
                Err(GuideError::from(e))
            }
        }
    }
}
