//! Review session lifecycle
//!
//! A session progresses through
//! created -> searching -> analyzing -> completed, with `generating` entered
//! by the review composer and `error` reachable from any state. `completed`
//! and `error` are terminal for a run; a new run may start from `created` or
//! a terminal state only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Created,
    Searching,
    Analyzing,
    Generating,
    Completed,
    Error,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Created => "created",
            ReviewStatus::Searching => "searching",
            ReviewStatus::Analyzing => "analyzing",
            ReviewStatus::Generating => "generating",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(ReviewStatus::Created),
            "searching" => Some(ReviewStatus::Searching),
            "analyzing" => Some(ReviewStatus::Analyzing),
            "generating" => Some(ReviewStatus::Generating),
            "completed" => Some(ReviewStatus::Completed),
            "error" => Some(ReviewStatus::Error),
            _ => None,
        }
    }

    /// Terminal for a pipeline run
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Completed | ReviewStatus::Error)
    }

    /// Whether a new pipeline run may start from this status
    pub fn can_start(&self) -> bool {
        matches!(self, ReviewStatus::Created) || self.is_terminal()
    }
}

/// One literature review project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub id: Uuid,
    pub title: String,
    pub domain: Option<String>,
    pub research_question: Option<String>,
    pub status: ReviewStatus,
    /// Final narrative review, persisted by the atomic composer path only
    pub final_review: Option<String>,
    /// Human-readable description of the pipeline's current unit of work
    pub current_step: Option<String>,
    /// Populated when status is `error`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewSession {
    pub fn new(title: String, domain: Option<String>, research_question: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            domain,
            research_question,
            status: ReviewStatus::Created,
            final_review: None,
            current_step: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The question papers are scored against; falls back to the title
    pub fn question(&self) -> &str {
        self.research_question.as_deref().unwrap_or(&self.title)
    }

    pub fn domain_or_default(&self) -> &str {
        self.domain.as_deref().unwrap_or("general")
    }
}
