//! Study guide request builder.
//!
//! # Flow
//!
//! 1. Validate the selection (subject, grade, unit range)
//! 2. Pull the subject's concepts with their exam metadata from the store
//! 3. Rank and truncate to the subject's cap
//! 4. Format the retrieval-grounded prompt
//! 5. Ask the endpoint for strict JSON and classify the reply
//!
//! A selection with no stored concepts is [`GuideError::NotFound`]. Store
//! failures never abort a request: they are logged and the builder falls
//! back to the general-knowledge prompt.

use gongbu_config::{AppConfig, GuideConfig};
use gongbu_core::error::{GuideError, StoreError};
use gongbu_core::message::Message;
use gongbu_core::model::{ConceptContext, EducationLevel};
use gongbu_core::provider::{Provider, ProviderRequest};
use gongbu_core::store::{ConceptFilter, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{prompt, ranking};

/// What the student selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRequest {
    pub subject: String,
    pub school_level: EducationLevel,
    pub grade: String,
    /// Free-text unit selection, e.g. "1단원" or "2-1 ~ 2-3".
    pub unit_range: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl GuideRequest {
    /// Reject blank required fields.
    pub fn validate(&self) -> Result<(), GuideError> {
        for (field, value) in [
            ("subject", &self.subject),
            ("grade", &self.grade),
            ("unit_range", &self.unit_range),
        ] {
            if value.trim().is_empty() {
                return Err(GuideError::InvalidRequest(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// The structured guide returned by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGuide {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub unit_title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_concepts: Vec<KeyConcept>,
    #[serde(default)]
    pub exam_points: Vec<ExamPoint>,
    #[serde(default)]
    pub trap_warnings: Vec<String>,
    #[serde(default)]
    pub practice_questions: Vec<PracticeQuestion>,
    #[serde(default)]
    pub study_tips: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyConcept {
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    /// Model-assigned grade, usually "A", "B" or "C".
    #[serde(default)]
    pub importance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamPoint {
    pub point: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// A guide plus what it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedGuide {
    pub request: GuideRequest,
    pub guide: StudyGuide,
    /// Titles of the concepts injected into the prompt, in prompt order.
    pub sources: Vec<String>,
    /// `false` when the general-knowledge prompt was used.
    pub grounded: bool,
    pub model: String,
}

/// Builds study guides from stored concepts and the chat-completion endpoint.
pub struct StudyGuideBuilder {
    provider: Arc<dyn Provider>,
    store: Arc<dyn Store>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    guide: GuideConfig,
}

impl StudyGuideBuilder {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn Store>, model: impl Into<String>) -> Self {
        let guide = GuideConfig::default();
        Self {
            provider,
            store,
            model: model.into(),
            temperature: guide.guide_temperature,
            max_tokens: None,
            guide,
        }
    }

    /// Build from application configuration.
    pub fn from_config(provider: Arc<dyn Provider>, store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            provider,
            store,
            model: config.default_model.clone(),
            temperature: config.guide.guide_temperature,
            max_tokens: Some(config.default_max_tokens),
            guide: config.guide.clone(),
        }
    }

    /// Override the per-subject caps and temperatures.
    pub fn with_guide_config(mut self, guide: GuideConfig) -> Self {
        self.temperature = guide.guide_temperature;
        self.guide = guide;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Retrieve, rank and truncate the concepts for a request.
    pub async fn retrieve(&self, request: &GuideRequest) -> Result<Vec<ConceptContext>, StoreError> {
        let filter = ConceptFilter {
            subject: request.subject.trim().to_string(),
            education_level: Some(request.school_level),
        };

        let rows = self.store.concept_contexts(&filter).await?;

        let cap = self.guide.cap_for(&request.subject);
        let total = rows.len();
        let picked = ranking::select(rows, cap);
        debug!(subject = %filter.subject, total, cap, kept = picked.len(), "Ranked concepts");
        Ok(picked)
    }

    /// Generate a study guide for the selection.
    pub async fn build(&self, request: &GuideRequest) -> Result<GeneratedGuide, GuideError> {
        request.validate()?;

        let contexts = match self.retrieve(request).await {
            Ok(rows) if rows.is_empty() => {
                info!(subject = %request.subject, level = %request.school_level, "No concepts for selection");
                return Err(GuideError::NotFound);
            }
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    store = %self.store.name(),
                    subject = %request.subject,
                    error = %e,
                    "Concept lookup failed, using general knowledge"
                );
                Vec::new()
            }
        };
        let grounded = !contexts.is_empty();
        let user_prompt = prompt::guide_prompt(request, &contexts);

        info!(
            subject = %request.subject,
            grade = %request.grade,
            unit = %request.unit_range,
            concepts = contexts.len(),
            grounded,
            "Requesting study guide"
        );

        let provider_request = ProviderRequest::new(
            &self.model,
            vec![Message::system(prompt::GUIDE_SYSTEM_PROMPT), Message::user(user_prompt)],
        )
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens)
        .json_only();

        let response = self.provider.complete(provider_request).await.map_err(|e| {
            warn!(provider = %self.provider.name(), error = %e, "Study guide request failed");
            GuideError::from(e)
        })?;

        let guide = parse_guide(&response.message.content)?;

        Ok(GeneratedGuide {
            request: request.clone(),
            guide,
            sources: contexts.iter().map(|c| c.concept.title.clone()).collect(),
            grounded,
            model: if response.model.is_empty() { self.model.clone() } else { response.model },
        })
    }
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// JavaScript-style truthiness of a JSON value.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Classify a model reply.
///
/// A missing or falsy `isValid` is [`GuideError::NotFound`]; anything that
/// is not a JSON object is [`GuideError::Api`].
pub fn parse_guide(content: &str) -> Result<StudyGuide, GuideError> {
    let body = strip_code_fence(content);
    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| GuideError::Api(format!("Malformed JSON in model reply: {e}")))?;

    let Some(object) = value.as_object_mut() else {
        return Err(GuideError::Api("Model reply is not a JSON object".into()));
    };

    if !object.get("isValid").is_some_and(is_truthy) {
        debug!("Model flagged the selection as invalid");
        return Err(GuideError::NotFound);
    }
    object.insert("isValid".into(), Value::Bool(true));

    serde_json::from_value(value)
        .map_err(|e| GuideError::Api(format!("Model reply does not match the guide schema: {e}")))
}
