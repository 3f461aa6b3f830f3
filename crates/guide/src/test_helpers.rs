//! Shared test doubles.

use async_trait::async_trait;
use gongbu_core::error::{ProviderError, StoreError};
use gongbu_core::message::Message;
use gongbu_core::model::{ConceptContext, ContentChunk, Profile, Textbook, Unit};
use gongbu_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use gongbu_core::store::{ConceptFilter, Store, TextbookKey};
use gongbu_store::InMemoryStore;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Returns scripted outcomes in order and records every request.
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            }),
            Some(Err(e)) => Err(e),
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: "no scripted reply left".into(),
            }),
        }
    }
}

fn down() -> StoreError {
    StoreError::Storage("database unavailable".into())
}

/// A store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }
    async fn concept_contexts(&self, _: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError> {
        Err(down())
    }
    async fn insert_concept(&self, _: ConceptContext) -> Result<String, StoreError> {
        Err(down())
    }
    async fn find_textbook(&self, _: &TextbookKey) -> Result<Option<Textbook>, StoreError> {
        Err(down())
    }
    async fn insert_textbook(&self, _: Textbook) -> Result<Textbook, StoreError> {
        Err(down())
    }
    async fn find_unit(&self, _: &str, _: u32) -> Result<Option<Unit>, StoreError> {
        Err(down())
    }
    async fn insert_unit(&self, _: Unit) -> Result<Unit, StoreError> {
        Err(down())
    }
    async fn insert_chunk(&self, _: ContentChunk) -> Result<String, StoreError> {
        Err(down())
    }
    async fn chunks_for_unit(&self, _: &str) -> Result<Vec<ContentChunk>, StoreError> {
        Err(down())
    }
    async fn profile(&self, _: &str) -> Result<Option<Profile>, StoreError> {
        Err(down())
    }
    async fn upsert_profile(&self, _: Profile) -> Result<(), StoreError> {
        Err(down())
    }
}

/// In-memory store whose profile lookups can be slowed down or broken.
pub struct FlakyProfileStore {
    pub inner: InMemoryStore,
    delay: Mutex<Duration>,
    failing: AtomicBool,
    missing: AtomicBool,
}

impl FlakyProfileStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            delay: Mutex::new(Duration::ZERO),
            failing: AtomicBool::new(false),
            missing: AtomicBool::new(false),
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every profile lookup behave as if the row was deleted.
    pub fn set_missing(&self, missing: bool) {
        self.missing.store(missing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyProfileStore {
    fn name(&self) -> &str {
        "flaky"
    }
    async fn concept_contexts(&self, filter: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError> {
        self.inner.concept_contexts(filter).await
    }
    async fn insert_concept(&self, context: ConceptContext) -> Result<String, StoreError> {
        self.inner.insert_concept(context).await
    }
    async fn find_textbook(&self, key: &TextbookKey) -> Result<Option<Textbook>, StoreError> {
        self.inner.find_textbook(key).await
    }
    async fn insert_textbook(&self, textbook: Textbook) -> Result<Textbook, StoreError> {
        self.inner.insert_textbook(textbook).await
    }
    async fn find_unit(&self, textbook_id: &str, unit_number: u32) -> Result<Option<Unit>, StoreError> {
        self.inner.find_unit(textbook_id, unit_number).await
    }
    async fn insert_unit(&self, unit: Unit) -> Result<Unit, StoreError> {
        self.inner.insert_unit(unit).await
    }
    async fn insert_chunk(&self, chunk: ContentChunk) -> Result<String, StoreError> {
        self.inner.insert_chunk(chunk).await
    }
    async fn chunks_for_unit(&self, unit_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        self.inner.chunks_for_unit(unit_id).await
    }
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(down());
        }
        if self.missing.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.profile(user_id).await
    }
    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.inner.upsert_profile(profile).await
    }
}

/// In-memory store where another writer always inserts the textbook first.
///
/// The first `find_textbook` misses; `insert_textbook` stores the row as the
/// concurrent winner and then reports a constraint violation.
pub struct RacingTextbookStore {
    pub inner: InMemoryStore,
    finds: AtomicUsize,
}

impl RacingTextbookStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            finds: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Store for RacingTextbookStore {
    fn name(&self) -> &str {
        "racing"
    }
    async fn concept_contexts(&self, filter: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError> {
        self.inner.concept_contexts(filter).await
    }
    async fn insert_concept(&self, context: ConceptContext) -> Result<String, StoreError> {
        self.inner.insert_concept(context).await
    }
    async fn find_textbook(&self, key: &TextbookKey) -> Result<Option<Textbook>, StoreError> {
        if self.finds.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(None);
        }
        self.inner.find_textbook(key).await
    }
    async fn insert_textbook(&self, textbook: Textbook) -> Result<Textbook, StoreError> {
        self.inner.insert_textbook(textbook).await?;
        Err(StoreError::Constraint("UNIQUE constraint failed: textbooks".into()))
    }
    async fn find_unit(&self, textbook_id: &str, unit_number: u32) -> Result<Option<Unit>, StoreError> {
        self.inner.find_unit(textbook_id, unit_number).await
    }
    async fn insert_unit(&self, unit: Unit) -> Result<Unit, StoreError> {
        self.inner.insert_unit(unit).await
    }
    async fn insert_chunk(&self, chunk: ContentChunk) -> Result<String, StoreError> {
        self.inner.insert_chunk(chunk).await
    }
    async fn chunks_for_unit(&self, unit_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        self.inner.chunks_for_unit(unit_id).await
    }
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.inner.profile(user_id).await
    }
    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.inner.upsert_profile(profile).await
    }
}
