//! Configuration loading
//!
//! Each setting resolves with ENV -> TOML -> compiled default priority.
//! The TOML file path comes from `LITREV_CONFIG` (default `litrev.toml` in
//! the working directory); a missing file is not an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";
const DEFAULT_DATABASE_PATH: &str = "litrev.db";
const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
const DEFAULT_PUBMED_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_PUBMED_RATE_LIMIT_MS: u64 = 340; // ~3 requests per second
const DEFAULT_SEMANTIC_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub database_path: PathBuf,

    /// OpenAI-compatible chat completion endpoint
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,

    pub pubmed_base_url: String,
    pub pubmed_rate_limit_ms: u64,

    pub semantic_scholar_base_url: String,
    /// Optional, for higher rate limits
    pub semantic_scholar_api_key: Option<String>,
}

/// On-disk TOML configuration; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub database_path: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub pubmed_base_url: Option<String>,
    pub pubmed_rate_limit_ms: Option<u64>,
    pub semantic_scholar_base_url: Option<String>,
    pub semantic_scholar_api_key: Option<String>,
}

impl Settings {
    /// Load configuration from the default TOML location plus environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("LITREV_CONFIG").unwrap_or_else(|_| "litrev.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load configuration from a specific TOML file plus environment
    pub fn load_from(toml_path: &Path) -> Result<Self> {
        let file = if toml_path.exists() {
            let content = std::fs::read_to_string(toml_path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", toml_path.display(), e)))?;
            let parsed: TomlConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", toml_path.display(), e)))?;
            info!("Loaded configuration file: {}", toml_path.display());
            parsed
        } else {
            TomlConfig::default()
        };

        let pubmed_rate_limit_ms = match env_var("LITREV_PUBMED_RATE_LIMIT_MS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("LITREV_PUBMED_RATE_LIMIT_MS is not an integer: {}", raw)))?,
            None => file.pubmed_rate_limit_ms.unwrap_or(DEFAULT_PUBMED_RATE_LIMIT_MS),
        };

        let settings = Self {
            bind_address: resolve("LITREV_BIND", file.bind_address, DEFAULT_BIND_ADDRESS),
            database_path: PathBuf::from(resolve(
                "LITREV_DATABASE_PATH",
                file.database_path,
                DEFAULT_DATABASE_PATH,
            )),
            llm_api_key: resolve("LITREV_LLM_API_KEY", file.llm_api_key, ""),
            llm_base_url: resolve("LITREV_LLM_BASE_URL", file.llm_base_url, DEFAULT_LLM_BASE_URL),
            llm_model: resolve("LITREV_LLM_MODEL", file.llm_model, DEFAULT_LLM_MODEL),
            pubmed_base_url: resolve(
                "LITREV_PUBMED_BASE_URL",
                file.pubmed_base_url,
                DEFAULT_PUBMED_BASE_URL,
            ),
            pubmed_rate_limit_ms,
            semantic_scholar_base_url: resolve(
                "LITREV_S2_BASE_URL",
                file.semantic_scholar_base_url,
                DEFAULT_SEMANTIC_SCHOLAR_BASE_URL,
            ),
            semantic_scholar_api_key: env_var("LITREV_S2_API_KEY").or(file.semantic_scholar_api_key),
        };

        if settings.llm_api_key.trim().is_empty() {
            warn!(
                "No LLM API key configured (LITREV_LLM_API_KEY); \
                 relevance scoring, synthesis and composition will fail"
            );
        }

        Ok(settings)
    }
}

fn resolve(env_name: &str, file_value: Option<String>, default: &str) -> String {
    env_var(env_name)
        .or(file_value)
        .unwrap_or_else(|| default.to_string())
}

/// Treat unset and empty environment variables the same
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let settings = Settings::load_from(Path::new("/nonexistent/litrev.toml")).unwrap();
        assert_eq!(settings.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(settings.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.pubmed_rate_limit_ms, DEFAULT_PUBMED_RATE_LIMIT_MS);
        assert!(settings.semantic_scholar_api_key.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm_model = \"test-model\"\npubmed_rate_limit_ms = 100"
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.llm_model, "test-model");
        assert_eq!(settings.pubmed_rate_limit_ms, 100);
        // Untouched fields keep their defaults
        assert_eq!(settings.llm_base_url, DEFAULT_LLM_BASE_URL);
    }
}
