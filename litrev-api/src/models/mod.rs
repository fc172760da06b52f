//! Domain models

pub mod analysis;
pub mod insight;
pub mod paper;
pub mod review;

pub use analysis::{describe_step, AnalysisStatus};
pub use insight::{Insight, InsightDraft, InsightType};
pub use paper::{Paper, PaperSource, SearchResult};
pub use review::{ReviewSession, ReviewStatus};
