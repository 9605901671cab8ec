//! Configuration types for Lorekeeper.
//!
//! `AppConfig` is the top-level `lorekeeper.toml`. Every field has a default,
//! so an absent file yields a runnable local configuration.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Reject settings that cannot produce a working process.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("database.max_connections must be at least 1".to_string());
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }
        if self.vector.dimension == 0 {
            return Err("vector.dimension must be positive".to_string());
        }
        if self.vector.nprobes == 0 {
            return Err("vector.nprobes must be positive".to_string());
        }
        if self.pipeline.rag_limit == 0 || self.pipeline.history_limit == 0 {
            return Err("pipeline limits must be positive".to_string());
        }
        Ok(())
    }
}

/// Relational store (chat history) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lorekeeper.db?mode=rwc".to_string(),
            min_connections: 2,
            max_connections: 10,
            acquire_timeout_secs: 10,
            busy_timeout_secs: 5,
        }
    }
}

/// Vector-indexed document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    pub path: String,
    pub table: String,
    /// Must equal the embedding model's output dimension.
    pub dimension: usize,
    /// Index partitions probed per query (recall vs latency).
    pub nprobes: usize,
    pub query_timeout_secs: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            path: "vector_store".to_string(),
            table: "rag_documents".to_string(),
            dimension: 1024,
            nprobes: 20,
            query_timeout_secs: 10,
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Documents per embedding request during ingestion.
    pub batch_size: usize,
    /// Bearer token for an authenticating proxy in front of the service.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "bge-m3".to_string(),
            timeout_secs: 30,
            batch_size: 10,
            api_token: None,
        }
    }
}

/// Where retrieved context is placed in the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPlacement {
    /// Appended to the system prompt.
    #[default]
    System,
    /// Sent as a separate system turn right before the final user turn.
    BeforeLastTurn,
}

/// Completion service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub context_window: u32,
    pub timeout_secs: u64,
    pub context_placement: ContextPlacement,
    /// Game named in the system prompts.
    pub game_name: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen3:8b".to_string(),
            temperature: 0.3,
            context_window: 8192,
            timeout_secs: 120,
            context_placement: ContextPlacement::System,
            game_name: "Escape from Tarkov".to_string(),
        }
    }
}

/// Per-request defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_lang: String,
    pub rag_limit: usize,
    pub history_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_lang: "ko".to_string(),
            rag_limit: 5,
            history_limit: 10,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file. `None` disables file output.
    pub dir: Option<String>,
    pub file_prefix: String,
    pub max_files: usize,
    pub otel: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "lorekeeper.log".to_string(),
            max_files: 30,
            otel: false,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}
