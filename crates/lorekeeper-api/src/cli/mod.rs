//! CLI command definitions for the `lorekeeper` binary.
//!
//! Uses clap derive macros for argument parsing. Common config knobs can be
//! overridden by flag or environment variable on every subcommand.

pub mod ask;
pub mod history;
pub mod ingest;
pub mod search;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use lorekeeper_types::config::AppConfig;

/// Answer game questions from an embedded knowledge base.
#[derive(Parser)]
#[command(name = "lorekeeper", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to lorekeeper.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,lorekeeper=debug",
            _ => "trace",
        }
    }
}

/// Settings that override the config file.
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Chat history database URL.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Base URL of the Ollama server (embedding and chat).
    #[arg(long, env = "OLLAMA_BASE_URL", global = true)]
    pub ollama_base_url: Option<String>,

    /// Embedding model name.
    #[arg(long, env = "OLLAMA_EMBED_MODEL", global = true)]
    pub embed_model: Option<String>,

    /// Chat model name.
    #[arg(long, env = "OLLAMA_CHAT_MODEL", global = true)]
    pub chat_model: Option<String>,

    /// Directory for the daily rolling log file.
    #[arg(long, env = "LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(url) = &self.ollama_base_url {
            config.embedding.base_url = url.clone();
            config.llm.base_url = url.clone();
        }
        if let Some(model) = &self.embed_model {
            config.embedding.model = model.clone();
        }
        if let Some(model) = &self.chat_model {
            config.llm.model = model.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.logging.dir = Some(dir.display().to_string());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, env = "LOREKEEPER_PORT")]
        port: Option<u16>,

        /// Host to bind to.
        #[arg(long, env = "LOREKEEPER_HOST")]
        host: Option<String>,
    },

    /// Load rendered documents (JSON Lines) into the vector store.
    Ingest {
        /// File with one `{source_table, source_id, lang, content, metadata}` per line.
        #[arg(long)]
        file: PathBuf,

        /// Build the ANN index after loading.
        #[arg(long)]
        index: bool,
    },

    /// Search documents without generating an answer.
    Search {
        query: String,

        /// Document language (ko, en, ja).
        #[arg(long)]
        lang: Option<String>,

        /// Maximum documents returned.
        #[arg(long)]
        limit: Option<usize>,

        /// Restrict to one source table.
        #[arg(long)]
        table: Option<String>,
    },

    /// Ask a question through the full pipeline.
    Ask {
        query: String,

        /// Session to continue. A new one is started when omitted.
        #[arg(long)]
        session: Option<String>,

        #[arg(long)]
        lang: Option<String>,

        #[arg(long)]
        rag_limit: Option<usize>,

        #[arg(long)]
        history_limit: Option<usize>,

        #[arg(long)]
        table: Option<String>,

        /// Print tokens as they arrive.
        #[arg(long)]
        stream: bool,
    },

    /// Show recent messages of a session.
    History {
        session: String,

        /// Number of most recent messages.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
