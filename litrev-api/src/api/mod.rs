//! HTTP API handlers for litrev-api

pub mod analysis;
pub mod health;
pub mod papers;
pub mod reviews;
pub mod sse;

pub use analysis::analysis_routes;
pub use health::health_routes;
pub use papers::paper_routes;
pub use reviews::review_routes;
pub use sse::{analysis_event_stream, sse_routes};
