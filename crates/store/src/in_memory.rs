//! In-memory store — useful for testing and demo sessions.

use async_trait::async_trait;
use gongbu_core::error::StoreError;
use gongbu_core::model::{ConceptContext, ContentChunk, Profile, Textbook, Unit};
use gongbu_core::store::{ConceptFilter, Store, TextbookKey};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ensure_id;

#[derive(Default)]
struct Tables {
    concepts: Vec<ConceptContext>,
    textbooks: Vec<Textbook>,
    units: Vec<Unit>,
    chunks: Vec<ContentChunk>,
    profiles: Vec<Profile>,
}

/// A store that keeps every table in a Vec behind one lock.
/// Enforces the same natural-key uniqueness as the SQL schema.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textbook rows (diagnostics and tests).
    pub async fn textbook_count(&self) -> usize {
        self.tables.read().await.textbooks.len()
    }

    /// Number of unit rows (diagnostics and tests).
    pub async fn unit_count(&self) -> usize {
        self.tables.read().await.units.len()
    }
}

/// Point every linked row at the concept's id.
pub(crate) fn relink(context: &mut ConceptContext) {
    let id = context.concept.id.clone();
    if let Some(logic) = context.logic.as_mut() {
        logic.concept_id = id.clone();
    }
    for trap in &mut context.traps {
        trap.concept_id = id.clone();
    }
    for pattern in &mut context.patterns {
        pattern.concept_id = id.clone();
    }
    for calc in &mut context.calculations {
        calc.concept_id = id.clone();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn concept_contexts(&self, filter: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .concepts
            .iter()
            .filter(|c| c.concept.subject == filter.subject)
            .filter(|c| {
                filter
                    .education_level
                    .is_none_or(|level| c.concept.education_level == level)
            })
            .cloned()
            .collect())
    }

    async fn insert_concept(&self, mut context: ConceptContext) -> Result<String, StoreError> {
        ensure_id(&mut context.concept.id);
        relink(&mut context);
        let id = context.concept.id.clone();

        let mut tables = self.tables.write().await;
        if tables.concepts.iter().any(|c| c.concept.id == id) {
            return Err(StoreError::Constraint(format!("concept {id} already exists")));
        }
        tables.concepts.push(context);
        Ok(id)
    }

    async fn find_textbook(&self, key: &TextbookKey) -> Result<Option<Textbook>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .textbooks
            .iter()
            .find(|t| t.publisher == key.publisher && t.grade == key.grade && t.subject == key.subject)
            .cloned())
    }

    async fn insert_textbook(&self, mut textbook: Textbook) -> Result<Textbook, StoreError> {
        ensure_id(&mut textbook.id);
        let mut tables = self.tables.write().await;
        let duplicate = tables.textbooks.iter().any(|t| {
            t.publisher == textbook.publisher
                && t.grade == textbook.grade
                && t.subject == textbook.subject
        });
        if duplicate {
            return Err(StoreError::Constraint(format!(
                "textbook ({}, {}, {}) already exists",
                textbook.publisher, textbook.grade, textbook.subject
            )));
        }
        tables.textbooks.push(textbook.clone());
        Ok(textbook)
    }

    async fn find_unit(&self, textbook_id: &str, unit_number: u32) -> Result<Option<Unit>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .units
            .iter()
            .find(|u| u.textbook_id == textbook_id && u.unit_number == unit_number)
            .cloned())
    }

    async fn insert_unit(&self, mut unit: Unit) -> Result<Unit, StoreError> {
        ensure_id(&mut unit.id);
        let mut tables = self.tables.write().await;
        if !tables.textbooks.iter().any(|t| t.id == unit.textbook_id) {
            return Err(StoreError::Constraint(format!(
                "textbook {} does not exist",
                unit.textbook_id
            )));
        }
        if tables
            .units
            .iter()
            .any(|u| u.textbook_id == unit.textbook_id && u.unit_number == unit.unit_number)
        {
            return Err(StoreError::Constraint(format!(
                "unit {} of textbook {} already exists",
                unit.unit_number, unit.textbook_id
            )));
        }
        tables.units.push(unit.clone());
        Ok(unit)
    }

    async fn insert_chunk(&self, mut chunk: ContentChunk) -> Result<String, StoreError> {
        ensure_id(&mut chunk.id);
        let mut tables = self.tables.write().await;
        if !tables.units.iter().any(|u| u.id == chunk.unit_id) {
            return Err(StoreError::Constraint(format!("unit {} does not exist", chunk.unit_id)));
        }
        let id = chunk.id.clone();
        tables.chunks.push(chunk);
        Ok(id)
    }

    async fn chunks_for_unit(&self, unit_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        let tables = self.tables.read().await;
        let mut chunks: Vec<ContentChunk> = tables
            .chunks
            .iter()
            .filter(|c| c.unit_id == unit_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.created_at);
        Ok(chunks)
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.profiles.iter_mut().find(|p| p.user_id == profile.user_id) {
            Some(existing) => *existing = profile,
            None => tables.profiles.push(profile),
        }
        Ok(())
    }
}
