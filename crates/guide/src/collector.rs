//! Admin content collection.
//!
//! Submissions carry the textbook's natural key (publisher, grade, subject)
//! and the unit number. Parents are looked up first and only created when
//! missing, so resubmitting the same textbook never duplicates it.

use chrono::Utc;
use gongbu_config::AppConfig;
use gongbu_core::error::{GuideError, StoreError};
use gongbu_core::message::Message;
use gongbu_core::model::{ConceptContext, ContentChunk, EducationLevel, Textbook, Unit};
use gongbu_core::provider::{Provider, ProviderRequest};
use gongbu_core::store::{Store, TextbookKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::prompt;

/// One admin form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSubmission {
    pub publisher: String,
    pub school_level: EducationLevel,
    pub grade: String,
    pub subject: String,
    pub unit_number: u32,
    #[serde(default)]
    pub unit_title: String,
    /// e.g. "본문", "탐구", "정리"
    pub content_type: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
}

/// Ids written or reused by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectReceipt {
    pub textbook_id: String,
    pub unit_id: String,
    pub chunk_id: String,
    pub textbook_created: bool,
    pub unit_created: bool,
}

/// Input for AI-assisted draft text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub subject: String,
    pub school_level: EducationLevel,
    pub grade: String,
    pub unit_number: u32,
    pub unit_title: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn require(field: &str, value: &str) -> Result<(), GuideError> {
    if value.trim().is_empty() {
        Err(GuideError::InvalidRequest(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

pub struct ContentCollector {
    store: Arc<dyn Store>,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
}

impl ContentCollector {
    pub fn new(store: Arc<dyn Store>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            store,
            provider,
            model: model.into(),
            temperature: 0.7,
        }
    }

    /// Build from application configuration. Drafts use `default_temperature`.
    pub fn from_config(store: Arc<dyn Store>, provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(store, provider, &config.default_model).with_temperature(config.default_temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Store one content chunk, creating its textbook and unit if needed.
    pub async fn collect(&self, submission: ContentSubmission) -> Result<CollectReceipt, GuideError> {
        require("publisher", &submission.publisher)?;
        require("grade", &submission.grade)?;
        require("subject", &submission.subject)?;
        require("content_type", &submission.content_type)?;
        require("title", &submission.title)?;
        require("body", &submission.body)?;
        if submission.unit_number == 0 {
            return Err(GuideError::InvalidRequest("unit_number starts at 1".into()));
        }

        let key = TextbookKey {
            publisher: submission.publisher.clone(),
            grade: submission.grade.clone(),
            subject: submission.subject.clone(),
        }
        .normalized();

        let (textbook, textbook_created) = self.ensure_textbook(&key, submission.school_level).await?;
        let (unit, unit_created) = self
            .ensure_unit(&textbook.id, submission.unit_number, submission.unit_title.trim())
            .await?;

        let chunk_id = self
            .store
            .insert_chunk(ContentChunk {
                id: String::new(),
                unit_id: unit.id.clone(),
                content_type: submission.content_type.trim().to_string(),
                title: submission.title.trim().to_string(),
                body: submission.body,
                page_range: submission.page_range.filter(|p| !p.trim().is_empty()),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            textbook = %textbook.id,
            unit = %unit.id,
            chunk = %chunk_id,
            textbook_created,
            unit_created,
            "Collected content chunk"
        );

        Ok(CollectReceipt {
            textbook_id: textbook.id,
            unit_id: unit.id,
            chunk_id,
            textbook_created,
            unit_created,
        })
    }

    async fn ensure_textbook(
        &self,
        key: &TextbookKey,
        school_level: EducationLevel,
    ) -> Result<(Textbook, bool), GuideError> {
        if let Some(existing) = self.store.find_textbook(key).await? {
            debug!(textbook = %existing.id, "Reusing textbook");
            return Ok((existing, false));
        }

        let inserted = self
            .store
            .insert_textbook(Textbook {
                id: String::new(),
                publisher: key.publisher.clone(),
                school_level,
                grade: key.grade.clone(),
                subject: key.subject.clone(),
            })
            .await;

        match inserted {
            Ok(textbook) => Ok((textbook, true)),
            // Lost a race with a concurrent submission.
            Err(StoreError::Constraint(_)) => match self.store.find_textbook(key).await? {
                Some(existing) => Ok((existing, false)),
                None => Err(GuideError::Store(StoreError::Constraint(format!(
                    "textbook ({}, {}, {}) conflicts but cannot be found",
                    key.publisher, key.grade, key.subject
                )))),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_unit(&self, textbook_id: &str, unit_number: u32, title: &str) -> Result<(Unit, bool), GuideError> {
        if let Some(existing) = self.store.find_unit(textbook_id, unit_number).await? {
            return Ok((existing, false));
        }

        let title = if title.is_empty() { format!("{unit_number}단원") } else { title.to_string() };
        let inserted = self
            .store
            .insert_unit(Unit {
                id: String::new(),
                textbook_id: textbook_id.to_string(),
                unit_number,
                title,
            })
            .await;

        match inserted {
            Ok(unit) => Ok((unit, true)),
            Err(StoreError::Constraint(reason)) => match self.store.find_unit(textbook_id, unit_number).await? {
                Some(existing) => Ok((existing, false)),
                None => Err(GuideError::Store(StoreError::Constraint(reason))),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a concept bundle after checking it is well formed.
    pub async fn add_concept(&self, mut context: ConceptContext) -> Result<String, GuideError> {
        // Retrieval matches the trimmed subject exactly.
        context.concept.subject = context.concept.subject.trim().to_string();
        context.concept.title = context.concept.title.trim().to_string();
        let concept = &context.concept;
        require("subject", &concept.subject)?;
        require("title", &concept.title)?;
        require("description", &concept.description)?;
        if let Some(logic) = &context.logic {
            if !(1..=5).contains(&logic.frequency_weight) {
                return Err(GuideError::InvalidRequest(format!(
                    "frequency_weight must be between 1 and 5, got {}",
                    logic.frequency_weight
                )));
            }
        }
        if context.traps.iter().any(|t| t.description.trim().is_empty())
            || context.patterns.iter().any(|p| p.description.trim().is_empty())
            || context.calculations.iter().any(|c| c.description.trim().is_empty())
        {
            return Err(GuideError::InvalidRequest("linked rows need a description".into()));
        }

        let title = concept.title.clone();
        let id = self.store.insert_concept(context).await?;
        info!(concept = %id, title = %title, "Added concept");
        Ok(id)
    }

    /// Ask the endpoint for freeform draft text.
    pub async fn draft(&self, request: &DraftRequest) -> Result<String, GuideError> {
        require("subject", &request.subject)?;
        require("grade", &request.grade)?;
        require("unit_title", &request.unit_title)?;
        require("content_type", &request.content_type)?;

        let provider_request = ProviderRequest::new(
            &self.model,
            vec![
                Message::system(prompt::DRAFT_SYSTEM_PROMPT),
                Message::user(prompt::draft_prompt(request)),
            ],
        )
        .with_temperature(self.temperature);

        let response = self.provider.complete(provider_request).await.map_err(|e| {
            warn!(provider = %self.provider.name(), error = %e, "Draft generation failed");
            GuideError::from(e)
        })?;

        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Err(GuideError::Api("Model returned an empty draft".into()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RacingTextbookStore, ScriptedProvider};
    use gongbu_core::model::{AppearanceLogic, Concept, Importance, TrapPoint};
    use gongbu_core::store::ConceptFilter;
    use gongbu_store::InMemoryStore;

    fn submission(title: &str) -> ContentSubmission {
        ContentSubmission {
            publisher: "미래엔".into(),
            school_level: EducationLevel::Middle,
            grade: "1".into(),
            subject: "사회".into(),
            unit_number: 2,
            unit_title: "다양한 기후 지역".into(),
            content_type: "본문".into(),
            title: title.into(),
            body: "열대 기후는 연중 기온이 높다.".into(),
            page_range: Some("34-37".into()),
        }
    }

    fn collector(store: Arc<InMemoryStore>) -> ContentCollector {
        ContentCollector::new(store, Arc::new(ScriptedProvider::replies(&[])), "m")
    }

    #[tokio::test]
    async fn first_submission_creates_parents() {
        let store = Arc::new(InMemoryStore::new());
        let receipt = collector(store.clone()).collect(submission("열대 기후")).await.unwrap();
        assert!(receipt.textbook_created);
        assert!(receipt.unit_created);
        assert_eq!(store.chunks_for_unit(&receipt.unit_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubmission_reuses_textbook_and_unit() {
        let store = Arc::new(InMemoryStore::new());
        let collector = collector(store.clone());
        let first = collector.collect(submission("열대 기후")).await.unwrap();

        let mut again = submission("건조 기후");
        again.publisher = " 미래엔 ".into();
        let second = collector.collect(again).await.unwrap();

        assert_eq!(first.textbook_id, second.textbook_id);
        assert_eq!(first.unit_id, second.unit_id);
        assert!(!second.textbook_created);
        assert!(!second.unit_created);
        assert_eq!(store.textbook_count().await, 1);
        assert_eq!(store.unit_count().await, 1);
        assert_eq!(store.chunks_for_unit(&first.unit_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lost_textbook_race_reuses_the_winner() {
        let store = Arc::new(RacingTextbookStore::new());
        let collector = ContentCollector::new(store.clone(), Arc::new(ScriptedProvider::replies(&[])), "m");

        let receipt = collector.collect(submission("열대 기후")).await.unwrap();
        assert!(!receipt.textbook_created);
        assert!(receipt.unit_created);
        assert_eq!(store.inner.textbook_count().await, 1);

        let key = TextbookKey {
            publisher: "미래엔".into(),
            grade: "1".into(),
            subject: "사회".into(),
        };
        let winner = store.inner.find_textbook(&key).await.unwrap().unwrap();
        assert_eq!(receipt.textbook_id, winner.id);
    }

    #[tokio::test]
    async fn new_unit_under_existing_textbook() {
        let store = Arc::new(InMemoryStore::new());
        let collector = collector(store.clone());
        let first = collector.collect(submission("a")).await.unwrap();
        let mut next = submission("b");
        next.unit_number = 3;
        next.unit_title = String::new();
        let second = collector.collect(next).await.unwrap();

        assert_eq!(first.textbook_id, second.textbook_id);
        assert!(second.unit_created);
        let unit = store.find_unit(&second.textbook_id, 3).await.unwrap().unwrap();
        assert_eq!(unit.title, "3단원");
    }

    #[tokio::test]
    async fn blank_fields_and_zero_unit_rejected() {
        let collector = collector(Arc::new(InMemoryStore::new()));
        let mut blank = submission("t");
        blank.body = "  ".into();
        assert!(matches!(collector.collect(blank).await, Err(GuideError::InvalidRequest(_))));

        let mut zero = submission("t");
        zero.unit_number = 0;
        assert!(matches!(collector.collect(zero).await, Err(GuideError::InvalidRequest(_))));
    }

    fn concept_bundle(weight: u8) -> ConceptContext {
        let mut ctx = ConceptContext::new(Concept {
            id: String::new(),
            subject: "사회".into(),
            title: "기후 요소".into(),
            description: "기온, 강수량, 바람".into(),
            importance: Importance::A,
            education_level: EducationLevel::Middle,
            formula: None,
            key_terms: vec!["기온".into()],
        });
        ctx.logic = Some(AppearanceLogic {
            concept_id: String::new(),
            condition_context: "기후 그래프 제시".into(),
            reasoning_required: "기후 구분".into(),
            question_type: "자료 분석".into(),
            frequency_weight: weight,
            test_frequency: None,
        });
        ctx.traps.push(TrapPoint {
            concept_id: String::new(),
            description: "날씨와 기후 혼동".into(),
            correction: None,
        });
        ctx
    }

    #[tokio::test]
    async fn add_concept_stores_bundle() {
        let store = Arc::new(InMemoryStore::new());
        let id = collector(store.clone()).add_concept(concept_bundle(4)).await.unwrap();
        let rows = store
            .concept_contexts(&ConceptFilter {
                subject: "사회".into(),
                education_level: None,
            })
            .await
            .unwrap();
        assert_eq!(rows[0].concept.id, id);
        assert_eq!(rows[0].traps.len(), 1);
    }

    #[tokio::test]
    async fn add_concept_trims_subject_and_title() {
        let store = Arc::new(InMemoryStore::new());
        let mut bundle = concept_bundle(3);
        bundle.concept.subject = " 사회 ".into();
        bundle.concept.title = " 기후 요소\n".into();
        collector(store.clone()).add_concept(bundle).await.unwrap();

        let rows = store
            .concept_contexts(&ConceptFilter {
                subject: "사회".into(),
                education_level: Some(EducationLevel::Middle),
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].concept.title, "기후 요소");
    }

    #[tokio::test]
    async fn add_concept_checks_weight_range() {
        let collector = collector(Arc::new(InMemoryStore::new()));
        for weight in [0, 6] {
            assert!(matches!(
                collector.add_concept(concept_bundle(weight)).await,
                Err(GuideError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn draft_returns_trimmed_text() {
        let provider = Arc::new(ScriptedProvider::replies(&["  열대 기후 지역은...  \n"]));
        let collector = ContentCollector::new(Arc::new(InMemoryStore::new()), provider.clone(), "m");
        let text = collector
            .draft(&DraftRequest {
                subject: "사회".into(),
                school_level: EducationLevel::Middle,
                grade: "1".into(),
                unit_number: 2,
                unit_title: "다양한 기후 지역".into(),
                content_type: "본문".into(),
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(text, "열대 기후 지역은...");
        let sent = provider.requests();
        assert!(sent[0].response_format.is_none());
        assert_eq!(sent[0].messages[0].content, prompt::DRAFT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn configured_collector_drafts_at_default_temperature() {
        let provider = Arc::new(ScriptedProvider::replies(&["초안"]));
        let mut config = AppConfig::default();
        config.default_temperature = 0.3;
        config.guide.chat_temperature = 1.1;
        let collector = ContentCollector::from_config(Arc::new(InMemoryStore::new()), provider.clone(), &config);
        collector
            .draft(&DraftRequest {
                subject: "사회".into(),
                school_level: EducationLevel::Middle,
                grade: "1".into(),
                unit_number: 1,
                unit_title: "지역".into(),
                content_type: "정리".into(),
                notes: None,
            })
            .await
            .unwrap();
        let sent = provider.requests();
        assert_eq!(sent[0].temperature, 0.3);
        assert_eq!(sent[0].model, config.default_model);
    }

    #[tokio::test]
    async fn empty_draft_is_api_error() {
        let provider = Arc::new(ScriptedProvider::replies(&["   "]));
        let collector = ContentCollector::new(Arc::new(InMemoryStore::new()), provider, "m");
        let request = DraftRequest {
            subject: "사회".into(),
            school_level: EducationLevel::Middle,
            grade: "1".into(),
            unit_number: 1,
            unit_title: "지역".into(),
            content_type: "정리".into(),
            notes: None,
        };
        assert!(matches!(collector.draft(&request).await, Err(GuideError::Api(_))));
    }
}
