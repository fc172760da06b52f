//! Insight trail types
//!
//! Insights form an append-only reasoning log per review session. Step
//! numbers are 1-based, contiguous and assigned in creation order; they are
//! the timeline's sort key and are never reused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Direct observation from a single paper
    Observation,
    /// Cross-paper connection or consensus
    Connection,
    /// Theme identified across papers
    Theme,
    /// Research gap
    Gap,
    /// Contradictory findings
    Contradiction,
    /// Final synthesis step
    Conclusion,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Observation => "observation",
            InsightType::Connection => "connection",
            InsightType::Theme => "theme",
            InsightType::Gap => "gap",
            InsightType::Contradiction => "contradiction",
            InsightType::Conclusion => "conclusion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "observation" => Some(InsightType::Observation),
            "connection" => Some(InsightType::Connection),
            "theme" => Some(InsightType::Theme),
            "gap" => Some(InsightType::Gap),
            "contradiction" => Some(InsightType::Contradiction),
            "conclusion" => Some(InsightType::Conclusion),
            _ => None,
        }
    }
}

/// One persisted step of the reasoning trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub review_id: Uuid,
    /// Set for per-paper insights, None for cross-paper ones
    pub paper_id: Option<Uuid>,
    pub step_number: i64,
    pub insight_type: InsightType,
    pub content: String,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An insight not yet persisted; the store assigns id and step number
#[derive(Debug, Clone, PartialEq)]
pub struct InsightDraft {
    pub insight_type: InsightType,
    pub content: String,
    pub reasoning: Option<String>,
    pub paper_id: Option<Uuid>,
}

impl InsightDraft {
    pub fn new(insight_type: InsightType, content: impl Into<String>) -> Self {
        Self {
            insight_type,
            content: content.into(),
            reasoning: None,
            paper_id: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn for_paper(mut self, paper_id: Uuid) -> Self {
        self.paper_id = Some(paper_id);
        self
    }
}
