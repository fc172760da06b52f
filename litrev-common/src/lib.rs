//! # litrev common library
//!
//! Shared code for the literature review assistant:
//! - Common error and result types
//! - Configuration loading (ENV -> TOML -> defaults)
//! - Analysis event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use config::Settings;
pub use error::{Error, Result};
pub use events::{AnalysisEvent, EventBus};
