//! Configuration loading and validation.
//!
//! Unlike a local per-repo engine, this service has no notion of "the
//! current repo" to anchor a project config file next to -- every repo it
//! serves is named per-request. Configuration is therefore resolved purely
//! from environment variables over compiled-in defaults:
//!
//! 1. Environment variables (see each field's doc comment for the name).
//! 2. Compiled-in defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration for ragrepo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Forge client settings.
    #[serde(default)]
    pub forge: ForgeConfig,

    /// Chunker settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding model settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector store settings.
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// LLM (answer composer) settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// CORS allow-list.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Forge client (C1) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Optional bearer token (`GITHUB_TOKEN`) extending API rate limits.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout for raw file fetches, in seconds.
    #[serde(default = "ForgeConfig::default_raw_timeout_secs")]
    pub raw_timeout_secs: u64,

    /// Per-request timeout for tree listing / branch resolution, in seconds.
    #[serde(default = "ForgeConfig::default_tree_timeout_secs")]
    pub tree_timeout_secs: u64,

    /// Maximum raw file body size to fetch, in bytes. Larger bodies are skipped.
    #[serde(default = "ForgeConfig::default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            token: std::env::var("GITHUB_TOKEN").ok(),
            raw_timeout_secs: Self::default_raw_timeout_secs(),
            tree_timeout_secs: Self::default_tree_timeout_secs(),
            max_body_bytes: Self::default_max_body_bytes(),
        }
    }
}

impl ForgeConfig {
    fn default_raw_timeout_secs() -> u64 {
        15
    }
    fn default_tree_timeout_secs() -> u64 {
        20
    }
    fn default_max_body_bytes() -> u64 {
        500 * 1024
    }
}

/// Chunker (C3) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Lower bound on chunk size in characters.
    #[serde(default = "ChunkingConfig::default_min_chars")]
    pub min_chars: usize,
    /// Upper bound on chunk size in characters.
    #[serde(default = "ChunkingConfig::default_max_chars")]
    pub max_chars: usize,
    /// Lines of overlap between consecutive chunks.
    #[serde(default = "ChunkingConfig::default_overlap")]
    pub overlap: usize,
    /// Characters of a file body embedded for the file-level vector.
    #[serde(default = "ChunkingConfig::default_file_embed_prefix")]
    pub file_embed_prefix_chars: usize,
    /// Characters of chunk text retained in stored metadata.
    #[serde(default = "ChunkingConfig::default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: Self::default_min_chars(),
            max_chars: Self::default_max_chars(),
            overlap: Self::default_overlap(),
            file_embed_prefix_chars: Self::default_file_embed_prefix(),
            preview_chars: Self::default_preview_chars(),
        }
    }
}

impl ChunkingConfig {
    fn default_min_chars() -> usize {
        900
    }
    fn default_max_chars() -> usize {
        1800
    }
    fn default_overlap() -> usize {
        15
    }
    fn default_file_embed_prefix() -> usize {
        10_000
    }
    fn default_preview_chars() -> usize {
        1_000
    }
}

/// Embedding model (C5) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model selector. See `embedder::model_manager::resolve_model_spec`.
    #[serde(default = "EmbeddingConfig::default_model_name")]
    pub model_name: String,
    /// Batch size for embedding inference.
    #[serde(default = "EmbeddingConfig::default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: Self::default_model_name(),
            batch_size: Self::default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    fn default_model_name() -> String {
        std::env::var("EMBEDDING_MODEL").unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string())
    }
    fn default_batch_size() -> usize {
        32
    }
}

/// Vector store (C6) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Connection URL for the Qdrant backend.
    #[serde(default = "VectorStoreConfig::default_url")]
    pub url: String,
    /// Optional API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum number of physical collections the adapter may create
    /// (`PINECONE_MAX_INDEXES`, kept for spec fidelity even against a
    /// Qdrant-backed store).
    #[serde(default = "VectorStoreConfig::default_max_indexes")]
    pub max_indexes: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            api_key: std::env::var("PINECONE_API_KEY").ok(),
            max_indexes: Self::default_max_indexes(),
        }
    }
}

impl VectorStoreConfig {
    fn default_url() -> String {
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string())
    }
    fn default_max_indexes() -> usize {
        std::env::var("PINECONE_MAX_INDEXES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10)
    }
}

/// Retrieval (C8) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of files narrowed to in stage one.
    #[serde(default = "RetrievalConfig::default_top_files")]
    pub top_files: usize,
    /// Default number of chunks returned after merge-ranking.
    #[serde(default = "RetrievalConfig::default_top_chunks")]
    pub top_chunks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_files: Self::default_top_files(),
            top_chunks: Self::default_top_chunks(),
        }
    }
}

impl RetrievalConfig {
    fn default_top_files() -> usize {
        8
    }
    fn default_top_chunks() -> usize {
        12
    }
}

/// LLM / answer composer (C9) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key. `GROQ_API_KEY` is tried first, then `API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible chat completions endpoint.
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    /// Chat completion model name.
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GROQ_API_KEY").ok().or_else(|| std::env::var("API_KEY").ok()),
            base_url: Self::default_base_url(),
            model: Self::default_model(),
        }
    }
}

impl LlmConfig {
    fn default_base_url() -> String {
        "https://api.groq.com/openai/v1".to_string()
    }
    fn default_model() -> String {
        "llama-3.3-70b-versatile".to_string()
    }
}

/// CORS allow-list settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Comma-separated hosts or origin URLs from `ALLOWED_ORIGINS`. Empty
    /// means "allow every origin".
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: Self::default_level() }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        std::env::var("RAGREPO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
    }
}

impl Config {
    /// Build configuration from environment variables over compiled-in defaults.
    pub fn from_env() -> Self {
        let mut cors = CorsConfig::default();
        if let Ok(raw) = std::env::var("ALLOWED_ORIGINS") {
            cors.allowed_origins = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect();
        }

        Self {
            forge: ForgeConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            cors,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_defaults_match_spec() {
        let c = ChunkingConfig::default();
        assert_eq!(c.min_chars, 900);
        assert_eq!(c.max_chars, 1800);
        assert_eq!(c.overlap, 15);
    }

    #[test]
    fn retrieval_defaults_match_spec() {
        let r = RetrievalConfig::default();
        assert_eq!(r.top_files, 8);
        assert_eq!(r.top_chunks, 12);
    }

    #[test]
    fn cors_empty_by_default() {
        let c = CorsConfig::default();
        assert!(c.allowed_origins.is_empty());
    }
}
