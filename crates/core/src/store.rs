//! Store trait — the relational backend holding curriculum and content rows.
//!
//! Implementations: SQLite via `sqlx`, in-memory (for testing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;
use crate::model::{ConceptContext, ContentChunk, EducationLevel, Profile, Textbook, Unit};

/// Which concepts to pull for a study guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptFilter {
    pub subject: String,
    /// `None` matches every level.
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
}

/// Natural key of a textbook row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextbookKey {
    pub publisher: String,
    pub grade: String,
    pub subject: String,
}

impl TextbookKey {
    /// Whitespace-trimmed copy, so that " 비상" and "비상" resolve to one row.
    pub fn normalized(&self) -> Self {
        Self {
            publisher: self.publisher.trim().to_string(),
            grade: self.grade.trim().to_string(),
            subject: self.subject.trim().to_string(),
        }
    }
}

/// The core Store trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Concepts matching the filter, each joined with its logic, traps,
    /// graph patterns and calculation foci. Order is unspecified.
    async fn concept_contexts(&self, filter: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError>;

    /// Insert a concept together with its linked rows. Empty ids are assigned.
    async fn insert_concept(&self, context: ConceptContext) -> Result<String, StoreError>;

    async fn find_textbook(&self, key: &TextbookKey) -> Result<Option<Textbook>, StoreError>;

    /// Insert a textbook. Fails with [`StoreError::Constraint`] on a duplicate natural key.
    async fn insert_textbook(&self, textbook: Textbook) -> Result<Textbook, StoreError>;

    async fn find_unit(&self, textbook_id: &str, unit_number: u32) -> Result<Option<Unit>, StoreError>;

    /// Insert a unit. Fails with [`StoreError::Constraint`] on a duplicate (textbook, number).
    async fn insert_unit(&self, unit: Unit) -> Result<Unit, StoreError>;

    async fn insert_chunk(&self, chunk: ContentChunk) -> Result<String, StoreError>;

    /// Chunks of one unit, oldest first.
    async fn chunks_for_unit(&self, unit_id: &str) -> Result<Vec<ContentChunk>, StoreError>;

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError>;
}
