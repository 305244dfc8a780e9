//! Configuration for the RAG system
//!
//! Values are resolved from defaults, then an optional TOML file (path in
//! `RAG_CONFIG`), then environment variables. Binaries call [`load_env_file`]
//! first so a `.env` file fills in variables the process does not set. [`RagConfig::validate`] must pass
//! before any provider is constructed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::providers::openai::MAX_EMBEDDING_BATCH;
use crate::providers::IndexSpec;

/// Environment variable holding an optional TOML config path
pub const CONFIG_PATH_VAR: &str = "RAG_CONFIG";

/// Env file read by the binaries at startup
pub const ENV_FILE: &str = ".env";

/// Index name used when none is configured (in-memory backend)
pub const DEFAULT_LOCAL_INDEX: &str = "local";

/// Load `path` into the process environment without overriding variables
/// that are already set. Returns `false` when the file does not exist.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(Error::config(format!(
            "invalid env file {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI account configuration (embeddings and chat)
    pub openai: OpenAiConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ingestion run configuration
    pub ingestion: IngestionConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Answer generation configuration
    pub generation: GenerationConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
}

/// API key wrapper that never prints its value
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret value, for request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed CORS origins; `*` allows any origin without credentials
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
                "http://localhost:3002".to_string(),
                "https://longevity-alpha.vercel.app".to_string(),
            ],
        }
    }
}

/// OpenAI API configuration shared by the embedder and the chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (required)
    pub api_key: Secret,
    /// Base URL of the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for failed embedding requests (chat is never retried)
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model to use
    pub model: String,
    /// Embedding dimensions; must match the vector index
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1024,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Ingestion run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Directory scanned for documents
    pub data_dir: PathBuf,
    /// Chunks per embedding/upsert batch
    pub batch_size: usize,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            batch_size: 50,
            recursive: false,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages fetched per question
    pub top_k: usize,
    /// Matches scoring below this are dropped
    pub min_score: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: None,
        }
    }
}

/// Chat completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Chat model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the answer
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// Vector database backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Pinecone serverless index
    #[default]
    Pinecone,
    /// Process-local brute-force store (development and tests)
    Memory,
}

impl FromStr for VectorBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" => Ok(Self::Memory),
            other => Err(Error::config(format!(
                "unknown vector backend '{}' (expected 'pinecone' or 'memory')",
                other
            ))),
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend provider
    pub backend: VectorBackend,
    /// Pinecone API key
    pub api_key: Secret,
    /// Index name
    pub index_name: String,
    /// Serverless cloud used when the index has to be created
    pub cloud: String,
    /// Serverless region used when the index has to be created
    pub region: String,
    /// Data plane host; resolved from the control plane when unset
    pub host: Option<String>,
    /// Namespace inside the index
    pub namespace: Option<String>,
    /// Control plane URL
    pub control_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// How long to wait for a freshly created index to become ready
    pub ready_timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            api_key: Secret::default(),
            index_name: String::new(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            host: None,
            namespace: None,
            control_url: "https://api.pinecone.io".to_string(),
            timeout_secs: 30,
            ready_timeout_secs: 120,
        }
    }
}

impl RagConfig {
    /// Load from the optional `RAG_CONFIG` file and the process environment, then validate
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; sections and keys left out keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("invalid config TOML: {}", e)))
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Secret::new(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("VECTOR_BACKEND") {
            self.vector_db.backend = v.parse()?;
        }
        if let Some(v) = get("PINECONE_API_KEY") {
            self.vector_db.api_key = Secret::new(v);
        }
        if let Some(v) = get("PINECONE_INDEX_NAME") {
            self.vector_db.index_name = v;
        }
        if let Some(v) = get("PINECONE_ENVIRONMENT") {
            self.vector_db.region = v;
        }
        if let Some(v) = get("PINECONE_CLOUD") {
            self.vector_db.cloud = v;
        }
        if let Some(v) = get("PINECONE_INDEX_HOST") {
            self.vector_db.host = Some(v);
        }
        if let Some(v) = get("PINECONE_NAMESPACE") {
            self.vector_db.namespace = Some(v);
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embeddings.model = v;
        }
        if let Some(v) = get("EMBEDDING_DIMENSION") {
            self.embeddings.dimensions = parse_var("EMBEDDING_DIMENSION", &v)?;
        }
        if let Some(v) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_var("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_var("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("BATCH_SIZE") {
            self.ingestion.batch_size = parse_var("BATCH_SIZE", &v)?;
        }
        if let Some(v) = get("DATA_DIR") {
            self.ingestion.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("TOP_K") {
            self.retrieval.top_k = parse_var("TOP_K", &v)?;
        }
        if let Some(v) = get("CHAT_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = get("CHAT_TEMPERATURE") {
            self.generation.temperature = parse_var("CHAT_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("CHAT_MAX_TOKENS") {
            self.generation.max_tokens = parse_var("CHAT_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = get("CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        Ok(())
    }

    /// Check every required setting; any failure is fatal at startup
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            return Err(Error::config("OPENAI_API_KEY is not set"));
        }
        if self.vector_db.backend == VectorBackend::Pinecone {
            if self.vector_db.api_key.is_empty() {
                return Err(Error::config("PINECONE_API_KEY is not set"));
            }
            if self.vector_db.index_name.trim().is_empty() {
                return Err(Error::config("PINECONE_INDEX_NAME is not set"));
            }
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embedding dimension must be greater than zero"));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunk size must be greater than zero"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.ingestion.batch_size == 0 || self.ingestion.batch_size > MAX_EMBEDDING_BATCH {
            return Err(Error::config(format!(
                "batch size must be between 1 and {}",
                MAX_EMBEDDING_BATCH
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("top_k must be greater than zero"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::config("chat temperature must be within 0.0..=2.0"));
        }
        if self.generation.max_tokens == 0 {
            return Err(Error::config("chat max_tokens must be greater than zero"));
        }
        Ok(())
    }

    /// Cosine index matching the configured embedding dimension
    pub fn index_spec(&self) -> IndexSpec {
        let name = match self.vector_db.index_name.trim() {
            "" => DEFAULT_LOCAL_INDEX,
            name => name,
        };
        IndexSpec::cosine(name, self.embeddings.dimensions)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} has an invalid value: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
            ("PINECONE_INDEX_NAME", "nutrition"),
        ]
    }

    #[test]
    fn test_defaults_match_ingestion_settings() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.ingestion.batch_size, 50);
        assert_eq!(config.embeddings.dimensions, 1024);
        assert_eq!(config.retrieval.top_k, 3);
        assert!(config
            .server
            .cors_origins
            .contains(&"https://longevity-alpha.vercel.app".to_string()));
    }

    #[test]
    fn test_env_file_fills_unset_variables_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(ENV_FILE);
        std::fs::write(
            &path,
            "LONGEVITY_RAG_ENV_FILE_PRESET=from-file\nLONGEVITY_RAG_ENV_FILE_NEW=from-file\n",
        )
        .unwrap();
        std::env::set_var("LONGEVITY_RAG_ENV_FILE_PRESET", "from-process");

        assert!(load_env_file(&path).unwrap());
        assert_eq!(
            std::env::var("LONGEVITY_RAG_ENV_FILE_PRESET").unwrap(),
            "from-process"
        );
        assert_eq!(
            std::env::var("LONGEVITY_RAG_ENV_FILE_NEW").unwrap(),
            "from-file"
        );
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!load_env_file(&dir.path().join(ENV_FILE)).unwrap());
    }

    #[test]
    fn test_malformed_env_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(ENV_FILE);
        std::fs::write(&path, "THIS IS NOT AN ASSIGNMENT\n").unwrap();
        assert!(matches!(load_env_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_keys_are_fatal() {
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[])).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RagConfig::default();
        config
            .apply_overrides(lookup(&[("OPENAI_API_KEY", "sk-test")]))
            .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PINECONE_API_KEY"));
    }

    #[test]
    fn test_memory_backend_needs_no_pinecone_key() {
        let mut config = RagConfig::default();
        config
            .apply_overrides(lookup(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("VECTOR_BACKEND", "memory"),
            ]))
            .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut vars = required();
        vars.extend([
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("EMBEDDING_DIMENSION", "1536"),
            ("CORS_ORIGINS", "https://app.example.com, http://localhost:3000"),
            ("PINECONE_ENVIRONMENT", "eu-west-1"),
        ]);
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&vars)).unwrap();
        config.validate().unwrap();

        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.embeddings.dimensions, 1536);
        assert_eq!(config.vector_db.region, "eu-west-1");
        assert_eq!(
            config.server.cors_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut vars = required();
        vars.push(("BATCH_SIZE", "fifty"));
        let mut config = RagConfig::default();
        assert!(matches!(
            config.apply_overrides(lookup(&vars)),
            Err(Error::Config(_))
        ));

        let mut vars = required();
        vars.extend([("CHUNK_SIZE", "200"), ("CHUNK_OVERLAP", "200")]);
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&vars)).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml_str(
            r#"
            [chunking]
            chunk_size = 800

            [vector_db]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("sk-very-secret");
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.expose(), "sk-very-secret");
    }

    #[test]
    fn test_index_spec_defaults_to_local_name() {
        let mut config = RagConfig::default();
        config.embeddings.dimensions = 8;
        assert_eq!(config.index_spec(), IndexSpec::cosine("local", 8));

        config.vector_db.index_name = "longevity".to_string();
        assert_eq!(config.index_spec().name, "longevity");
    }
}
