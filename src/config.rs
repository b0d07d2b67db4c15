use crate::error::{RagError, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Read a required variable. Set-but-empty counts as unset.
fn required<F>(lookup: &F, var: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| RagError::Configuration {
            var: var.to_string(),
        })
}

fn optional<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Load variables from `env_file`, or from `./.env` when present.
///
/// Variables already set in the process environment take precedence.
pub fn load_dotenv(env_file: Option<&Path>) -> std::result::Result<(), dotenv::Error> {
    match env_file {
        Some(path) => dotenv::from_path(path),
        None => {
            dotenv::dotenv().ok();
            Ok(())
        }
    }
}

fn env_lookup(var: &str) -> Option<String> {
    env::var(var).ok()
}

/// Configuration for the OpenAI embedding and chat APIs
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub base_url: String,
}

impl OpenAIConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = required(&lookup, "OPENAI_API_KEY")?;
        let embedding_model = optional(&lookup, "OPENAI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL);
        let llm_model = optional(&lookup, "OPENAI_LLM_MODEL", DEFAULT_LLM_MODEL);
        let base_url = optional(&lookup, "OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(OpenAIConfig {
            api_key,
            embedding_model,
            llm_model,
            base_url,
        })
    }
}

/// Connection settings for the pgvector store
#[derive(Debug, Clone, PartialEq)]
pub struct PgVectorConfig {
    pub url: String,
    pub collection: String,
}

impl PgVectorConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, "PGVECTOR_URL")?;
        let collection = required(&lookup, "PGVECTOR_COLLECTION")?;

        Ok(PgVectorConfig { url, collection })
    }
}

/// Everything the ingestion entry point needs.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub pgvector: PgVectorConfig,
    pub pdf_path: PathBuf,
    pub openai: OpenAIConfig,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Validates every variable up front; nothing on disk is touched here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pgvector = PgVectorConfig::from_lookup(&lookup)?;
        let pdf_path = PathBuf::from(required(&lookup, "PDF_PATH")?);
        let openai = OpenAIConfig::from_lookup(&lookup)?;

        Ok(IngestConfig {
            pgvector,
            pdf_path,
            openai,
        })
    }
}

/// Everything the chat entry point needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub pgvector: PgVectorConfig,
    pub openai: OpenAIConfig,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pgvector = PgVectorConfig::from_lookup(&lookup)?;
        let openai = OpenAIConfig::from_lookup(&lookup)?;

        Ok(ChatConfig { pgvector, openai })
    }
}
