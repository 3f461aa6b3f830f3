//! # Gongbu Core
//!
//! Domain types, traits, and error definitions for the Gongbu study-guide
//! service. This crate has **no framework dependencies**: it defines the
//! curriculum model and the seams (LLM provider, relational store) that the
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! External collaborators are traits here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the chat-completion endpoint or database via configuration
//! - Testing the guide pipeline with scripted providers and in-memory stores
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod model;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GuideError, ProviderError, Result, StoreError};
pub use message::{Message, Role, Transcript};
pub use model::{
    AppearanceLogic, CalculationFocus, Concept, ConceptContext, ContentChunk, EducationLevel,
    GraphPattern, Importance, Profile, Textbook, TrapPoint, Unit, UserRole,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat};
pub use store::{ConceptFilter, Store, TextbookKey};
