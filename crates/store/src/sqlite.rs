//! SQLite store over `sqlx`.
//!
//! One database file holds the curriculum tables (`concepts`,
//! `appearance_logic`, `trap_points`, `graph_patterns`, `calculation_focus`),
//! the collected content (`textbooks`, `units`, `content_chunks`) and
//! `profiles`. Natural keys are enforced with UNIQUE constraints so a racing
//! duplicate insert surfaces as [`StoreError::Constraint`].

use async_trait::async_trait;
use chrono::Utc;
use gongbu_core::error::StoreError;
use gongbu_core::model::{
    AppearanceLogic, CalculationFocus, Concept, ConceptContext, ContentChunk, GraphPattern,
    Profile, Textbook, TrapPoint, Unit,
};
use gongbu_core::store::{ConceptFilter, Store, TextbookKey};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

use crate::ensure_id;
use crate::in_memory::relink;

const SCHEMA: &[(&str, &str)] = &[
    (
        "concepts table",
        r#"
        CREATE TABLE IF NOT EXISTS concepts (
            id              TEXT PRIMARY KEY,
            subject         TEXT NOT NULL,
            title           TEXT NOT NULL,
            description     TEXT NOT NULL,
            importance      TEXT NOT NULL CHECK (importance IN ('A', 'B', 'C')),
            education_level TEXT NOT NULL,
            formula         TEXT,
            key_terms       TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    ),
    (
        "appearance_logic table",
        r#"
        CREATE TABLE IF NOT EXISTS appearance_logic (
            concept_id         TEXT PRIMARY KEY REFERENCES concepts(id) ON DELETE CASCADE,
            condition_context  TEXT NOT NULL,
            reasoning_required TEXT NOT NULL,
            question_type      TEXT NOT NULL,
            frequency_weight   INTEGER NOT NULL CHECK (frequency_weight BETWEEN 1 AND 5),
            test_frequency     TEXT
        )
        "#,
    ),
    (
        "trap_points table",
        r#"
        CREATE TABLE IF NOT EXISTS trap_points (
            iid         INTEGER PRIMARY KEY AUTOINCREMENT,
            concept_id  TEXT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            correction  TEXT
        )
        "#,
    ),
    (
        "graph_patterns table",
        r#"
        CREATE TABLE IF NOT EXISTS graph_patterns (
            iid            INTEGER PRIMARY KEY AUTOINCREMENT,
            concept_id     TEXT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
            description    TEXT NOT NULL,
            interpretation TEXT
        )
        "#,
    ),
    (
        "calculation_focus table",
        r#"
        CREATE TABLE IF NOT EXISTS calculation_focus (
            iid         INTEGER PRIMARY KEY AUTOINCREMENT,
            concept_id  TEXT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            example     TEXT
        )
        "#,
    ),
    (
        "textbooks table",
        r#"
        CREATE TABLE IF NOT EXISTS textbooks (
            id           TEXT PRIMARY KEY,
            publisher    TEXT NOT NULL,
            school_level TEXT NOT NULL,
            grade        TEXT NOT NULL,
            subject      TEXT NOT NULL,
            UNIQUE (publisher, grade, subject)
        )
        "#,
    ),
    (
        "units table",
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id          TEXT PRIMARY KEY,
            textbook_id TEXT NOT NULL REFERENCES textbooks(id) ON DELETE CASCADE,
            unit_number INTEGER NOT NULL,
            title       TEXT NOT NULL,
            UNIQUE (textbook_id, unit_number)
        )
        "#,
    ),
    (
        "content_chunks table",
        r#"
        CREATE TABLE IF NOT EXISTS content_chunks (
            iid          INTEGER PRIMARY KEY AUTOINCREMENT,
            id           TEXT UNIQUE NOT NULL,
            unit_id      TEXT NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            content_type TEXT NOT NULL,
            title        TEXT NOT NULL,
            body         TEXT NOT NULL,
            page_range   TEXT,
            created_at   TEXT NOT NULL
        )
        "#,
    ),
    (
        "profiles table",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id      TEXT PRIMARY KEY,
            display_name TEXT NOT NULL DEFAULT '',
            role         TEXT NOT NULL DEFAULT 'student'
        )
        "#,
    ),
    (
        "concepts subject index",
        "CREATE INDEX IF NOT EXISTS idx_concepts_subject ON concepts(subject, education_level)",
    ),
];

/// A SQLite-backed [`Store`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite url: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to ":memory:" is a separate database.
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!(url = %url, "SQLite store initialized");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create every table and index if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for (label, sql) in SCHEMA {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }
        debug!(statements = SCHEMA.len(), "SQLite migrations complete");
        Ok(())
    }

    fn row_to_concept(row: &SqliteRow) -> Result<Concept, StoreError> {
        let importance: String = col(row, "importance")?;
        let level: String = col(row, "education_level")?;
        let key_terms: String = col(row, "key_terms")?;
        Ok(Concept {
            id: col(row, "id")?,
            subject: col(row, "subject")?,
            title: col(row, "title")?,
            description: col(row, "description")?,
            importance: importance.parse().map_err(StoreError::QueryFailed)?,
            education_level: level.parse().map_err(StoreError::QueryFailed)?,
            formula: col(row, "formula")?,
            key_terms: serde_json::from_str(&key_terms).unwrap_or_default(),
        })
    }

    fn row_to_logic(row: &SqliteRow) -> Result<Option<AppearanceLogic>, StoreError> {
        let concept_id: Option<String> = col(row, "logic_concept_id")?;
        let Some(concept_id) = concept_id else {
            return Ok(None);
        };
        let weight: i64 = col(row, "frequency_weight")?;
        Ok(Some(AppearanceLogic {
            concept_id,
            condition_context: col(row, "condition_context")?,
            reasoning_required: col(row, "reasoning_required")?,
            question_type: col(row, "question_type")?,
            frequency_weight: u8::try_from(weight)
                .map_err(|_| StoreError::QueryFailed(format!("frequency_weight out of range: {weight}")))?,
            test_frequency: col(row, "test_frequency")?,
        }))
    }

    fn row_to_textbook(row: &SqliteRow) -> Result<Textbook, StoreError> {
        let level: String = col(row, "school_level")?;
        Ok(Textbook {
            id: col(row, "id")?,
            publisher: col(row, "publisher")?,
            school_level: level.parse().map_err(StoreError::QueryFailed)?,
            grade: col(row, "grade")?,
            subject: col(row, "subject")?,
        })
    }

    fn row_to_unit(row: &SqliteRow) -> Result<Unit, StoreError> {
        let number: i64 = col(row, "unit_number")?;
        Ok(Unit {
            id: col(row, "id")?,
            textbook_id: col(row, "textbook_id")?,
            unit_number: u32::try_from(number)
                .map_err(|_| StoreError::QueryFailed(format!("unit_number out of range: {number}")))?,
            title: col(row, "title")?,
        })
    }

    fn row_to_chunk(row: &SqliteRow) -> Result<ContentChunk, StoreError> {
        let created_at_str: String = col(row, "created_at")?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(ContentChunk {
            id: col(row, "id")?,
            unit_id: col(row, "unit_id")?,
            content_type: col(row, "content_type")?,
            title: col(row, "title")?,
            body: col(row, "body")?,
            page_range: col(row, "page_range")?,
            created_at,
        })
    }

    /// Linked rows of one supplementary table for every concept matching the filter.
    async fn linked_rows(
        &self,
        table: &str,
        extra_column: &str,
        filter: &ConceptFilter,
    ) -> Result<HashMap<String, Vec<(String, Option<String>)>>, StoreError> {
        let sql = format!(
            "SELECT t.concept_id, t.description, t.{extra_column} AS extra
             FROM {table} t
             JOIN concepts c ON c.id = t.concept_id
             WHERE c.subject = ?1 AND (?2 IS NULL OR c.education_level = ?2)
             ORDER BY t.iid"
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.subject)
            .bind(filter.education_level.map(|l| l.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{table}: {e}")))?;

        let mut grouped: HashMap<String, Vec<(String, Option<String>)>> = HashMap::new();
        for row in &rows {
            let concept_id: String = col(row, "concept_id")?;
            grouped
                .entry(concept_id)
                .or_default()
                .push((col(row, "description")?, col(row, "extra")?));
        }
        Ok(grouped)
    }
}

/// Read one column, naming it in the error.
fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

/// Classify a write error: unique/foreign-key violations become constraint errors.
fn write_error(what: &str, e: sqlx::Error) -> StoreError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            StoreError::Constraint(format!("{what}: {db}"))
        }
        Some(db) if db.is_check_violation() => StoreError::Constraint(format!("{what}: {db}")),
        _ => StoreError::Storage(format!("{what}: {e}")),
    }
}

#[async_trait]
impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn concept_contexts(&self, filter: &ConceptFilter) -> Result<Vec<ConceptContext>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.subject, c.title, c.description, c.importance,
                   c.education_level, c.formula, c.key_terms,
                   l.concept_id AS logic_concept_id, l.condition_context,
                   l.reasoning_required, l.question_type, l.frequency_weight,
                   l.test_frequency
            FROM concepts c
            LEFT JOIN appearance_logic l ON l.concept_id = c.id
            WHERE c.subject = ?1 AND (?2 IS NULL OR c.education_level = ?2)
            ORDER BY c.rowid
            "#,
        )
        .bind(&filter.subject)
        .bind(filter.education_level.map(|l| l.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("concepts: {e}")))?;

        let mut traps = self.linked_rows("trap_points", "correction", filter).await?;
        let mut patterns = self.linked_rows("graph_patterns", "interpretation", filter).await?;
        let mut calcs = self.linked_rows("calculation_focus", "example", filter).await?;

        let mut contexts = Vec::with_capacity(rows.len());
        for row in &rows {
            let concept = Self::row_to_concept(row)?;
            let id = concept.id.clone();
            let mut ctx = ConceptContext::new(concept);
            ctx.logic = Self::row_to_logic(row)?;
            ctx.traps = traps
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|(description, correction)| TrapPoint {
                    concept_id: id.clone(),
                    description,
                    correction,
                })
                .collect();
            ctx.patterns = patterns
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|(description, interpretation)| GraphPattern {
                    concept_id: id.clone(),
                    description,
                    interpretation,
                })
                .collect();
            ctx.calculations = calcs
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|(description, example)| CalculationFocus {
                    concept_id: id.clone(),
                    description,
                    example,
                })
                .collect();
            contexts.push(ctx);
        }

        debug!(subject = %filter.subject, rows = contexts.len(), "Loaded concept contexts");
        Ok(contexts)
    }

    async fn insert_concept(&self, mut context: ConceptContext) -> Result<String, StoreError> {
        ensure_id(&mut context.concept.id);
        relink(&mut context);
        let concept = &context.concept;
        let key_terms = serde_json::to_string(&concept.key_terms).unwrap_or_else(|_| "[]".into());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Storage(format!("begin: {e}")))?;

        sqlx::query(
            "INSERT INTO concepts (id, subject, title, description, importance, education_level, formula, key_terms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&concept.id)
        .bind(&concept.subject)
        .bind(&concept.title)
        .bind(&concept.description)
        .bind(concept.importance.as_str())
        .bind(concept.education_level.as_str())
        .bind(&concept.formula)
        .bind(&key_terms)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error("insert concept", e))?;

        if let Some(logic) = &context.logic {
            sqlx::query(
                "INSERT INTO appearance_logic
                 (concept_id, condition_context, reasoning_required, question_type, frequency_weight, test_frequency)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&logic.concept_id)
            .bind(&logic.condition_context)
            .bind(&logic.reasoning_required)
            .bind(&logic.question_type)
            .bind(i64::from(logic.frequency_weight))
            .bind(&logic.test_frequency)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error("insert appearance logic", e))?;
        }

        for trap in &context.traps {
            sqlx::query("INSERT INTO trap_points (concept_id, description, correction) VALUES (?1, ?2, ?3)")
                .bind(&trap.concept_id)
                .bind(&trap.description)
                .bind(&trap.correction)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error("insert trap point", e))?;
        }

        for pattern in &context.patterns {
            sqlx::query("INSERT INTO graph_patterns (concept_id, description, interpretation) VALUES (?1, ?2, ?3)")
                .bind(&pattern.concept_id)
                .bind(&pattern.description)
                .bind(&pattern.interpretation)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error("insert graph pattern", e))?;
        }

        for calc in &context.calculations {
            sqlx::query("INSERT INTO calculation_focus (concept_id, description, example) VALUES (?1, ?2, ?3)")
                .bind(&calc.concept_id)
                .bind(&calc.description)
                .bind(&calc.example)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_error("insert calculation focus", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Storage(format!("commit: {e}")))?;

        Ok(context.concept.id)
    }

    async fn find_textbook(&self, key: &TextbookKey) -> Result<Option<Textbook>, StoreError> {
        let row = sqlx::query(
            "SELECT id, publisher, school_level, grade, subject FROM textbooks
             WHERE publisher = ?1 AND grade = ?2 AND subject = ?3",
        )
        .bind(&key.publisher)
        .bind(&key.grade)
        .bind(&key.subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("textbooks: {e}")))?;

        row.as_ref().map(Self::row_to_textbook).transpose()
    }

    async fn insert_textbook(&self, mut textbook: Textbook) -> Result<Textbook, StoreError> {
        ensure_id(&mut textbook.id);
        sqlx::query(
            "INSERT INTO textbooks (id, publisher, school_level, grade, subject) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&textbook.id)
        .bind(&textbook.publisher)
        .bind(textbook.school_level.as_str())
        .bind(&textbook.grade)
        .bind(&textbook.subject)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert textbook", e))?;
        Ok(textbook)
    }

    async fn find_unit(&self, textbook_id: &str, unit_number: u32) -> Result<Option<Unit>, StoreError> {
        let row = sqlx::query(
            "SELECT id, textbook_id, unit_number, title FROM units WHERE textbook_id = ?1 AND unit_number = ?2",
        )
        .bind(textbook_id)
        .bind(i64::from(unit_number))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("units: {e}")))?;

        row.as_ref().map(Self::row_to_unit).transpose()
    }

    async fn insert_unit(&self, mut unit: Unit) -> Result<Unit, StoreError> {
        ensure_id(&mut unit.id);
        sqlx::query("INSERT INTO units (id, textbook_id, unit_number, title) VALUES (?1, ?2, ?3, ?4)")
            .bind(&unit.id)
            .bind(&unit.textbook_id)
            .bind(i64::from(unit.unit_number))
            .bind(&unit.title)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("insert unit", e))?;
        Ok(unit)
    }

    async fn insert_chunk(&self, mut chunk: ContentChunk) -> Result<String, StoreError> {
        ensure_id(&mut chunk.id);
        sqlx::query(
            "INSERT INTO content_chunks (id, unit_id, content_type, title, body, page_range, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&chunk.id)
        .bind(&chunk.unit_id)
        .bind(&chunk.content_type)
        .bind(&chunk.title)
        .bind(&chunk.body)
        .bind(&chunk.page_range)
        .bind(chunk.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("insert content chunk", e))?;
        Ok(chunk.id)
    }

    async fn chunks_for_unit(&self, unit_id: &str) -> Result<Vec<ContentChunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, unit_id, content_type, title, body, page_range, created_at
             FROM content_chunks WHERE unit_id = ?1 ORDER BY iid",
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("content_chunks: {e}")))?;

        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query("SELECT user_id, display_name, role FROM profiles WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("profiles: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = col(&row, "role")?;
        Ok(Some(Profile {
            user_id: col(&row, "user_id")?,
            display_name: col(&row, "display_name")?,
            role: role.parse().map_err(StoreError::QueryFailed)?,
        }))
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (user_id, display_name, role) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name, role = excluded.role",
        )
        .bind(&profile.user_id)
        .bind(&profile.display_name)
        .bind(profile.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("upsert profile", e))?;
        Ok(())
    }
}
