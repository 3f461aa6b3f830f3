//! Curriculum and content entities.
//!
//! These rows are owned by the relational store. The application only relies
//! on linkage by identifier (`concept_id`, `textbook_id`, `unit_id`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Exam importance grade of a concept. `A` is the most important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Importance {
    A,
    B,
    C,
}

impl Importance {
    /// Numeric rank where a larger value means more important.
    pub fn rank(self) -> u8 {
        match self {
            Importance::A => 3,
            Importance::B => 2,
            Importance::C => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Importance::A => "A",
            Importance::B => "B",
            Importance::C => "C",
        }
    }
}

impl PartialOrd for Importance {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Importance {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Importance::A),
            "B" => Ok(Importance::B),
            "C" => Ok(Importance::C),
            other => Err(format!("unknown importance grade '{other}'")),
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// School level a concept or textbook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationLevel {
    Middle,
    High,
}

impl EducationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::Middle => "middle",
            EducationLevel::High => "high",
        }
    }

    /// Korean label used inside prompts.
    pub fn label_ko(self) -> &'static str {
        match self {
            EducationLevel::Middle => "중학교",
            EducationLevel::High => "고등학교",
        }
    }
}

impl FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "middle" | "중학교" | "중등" => Ok(EducationLevel::Middle),
            "high" | "고등학교" | "고등" => Ok(EducationLevel::High),
            other => Err(format!("unknown school level '{other}'")),
        }
    }
}

impl std::fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single curriculum fact tracked for exam relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    pub subject: String,
    pub title: String,
    pub description: String,
    pub importance: Importance,
    pub education_level: EducationLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_terms: Vec<String>,
}

/// How and how often a concept shows up on exams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceLogic {
    pub concept_id: String,
    pub condition_context: String,
    pub reasoning_required: String,
    pub question_type: String,
    /// 1–5; higher means more likely to appear.
    pub frequency_weight: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_frequency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapPoint {
    pub concept_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPattern {
    pub concept_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationFocus {
    pub concept_id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// A concept joined with all of its exam-prep metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptContext {
    pub concept: Concept,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<AppearanceLogic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traps: Vec<TrapPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<GraphPattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calculations: Vec<CalculationFocus>,
}

impl ConceptContext {
    pub fn new(concept: Concept) -> Self {
        Self {
            concept,
            logic: None,
            traps: Vec::new(),
            patterns: Vec::new(),
            calculations: Vec::new(),
        }
    }

    /// Frequency weight of the linked logic row, 0 when there is none.
    pub fn frequency_weight(&self) -> u8 {
        self.logic.as_ref().map(|l| l.frequency_weight).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Textbook {
    pub id: String,
    pub publisher: String,
    pub school_level: EducationLevel,
    pub grade: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub textbook_id: String,
    pub unit_number: u32,
    pub title: String,
}

/// A piece of source material collected by an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    pub id: String,
    pub unit_id: String,
    pub content_type: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_range: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub role: UserRole,
}
