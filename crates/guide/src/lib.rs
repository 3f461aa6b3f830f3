//! The study-guide side of Gongbu.
//!
//! - [`builder`]: retrieval-grounded study guide generation
//! - [`chat`]: tutor follow-up sessions over a guide
//! - [`collector`]: admin content and concept curation
//! - [`role`]: cached per-user role lookups with a timeout
//! - [`notice`]: the global notice banner
//!
//! [`ranking`] and [`prompt`] hold the pure parts of the pipeline.

pub mod builder;
pub mod chat;
pub mod collector;
pub mod notice;
pub mod prompt;
pub mod ranking;
pub mod role;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use builder::{GeneratedGuide, GuideRequest, StudyGuide, StudyGuideBuilder};
pub use chat::ChatSession;
pub use collector::{CollectReceipt, ContentCollector, ContentSubmission, DraftRequest};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use role::RoleCache;
