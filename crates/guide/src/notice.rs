//! Global notice banner.

use chrono::{DateTime, Utc};
use gongbu_core::error::GuideError;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub posted_by: String,
    pub posted_at: DateTime<Utc>,
}

/// Holds at most one notice. Everyone reads it; admins replace or clear it.
#[derive(Default)]
pub struct NoticeBoard {
    current: RwLock<Option<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Notice> {
        self.current.read().await.clone()
    }

    /// Replace the notice.
    pub async fn post(
        &self,
        message: &str,
        level: NoticeLevel,
        posted_by: &str,
    ) -> Result<Notice, GuideError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(GuideError::InvalidRequest("notice message must not be empty".into()));
        }
        let notice = Notice {
            message: message.to_string(),
            level,
            posted_by: posted_by.to_string(),
            posted_at: Utc::now(),
        };
        *self.current.write().await = Some(notice.clone());
        info!(by = %posted_by, level = ?level, "Notice posted");
        Ok(notice)
    }

    /// Remove the notice, returning what was shown.
    pub async fn clear(&self) -> Option<Notice> {
        self.current.write().await.take()
    }
}
