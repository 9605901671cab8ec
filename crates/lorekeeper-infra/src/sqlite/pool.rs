//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `DatabasePool` holds a bounded
//! reader pool for concurrent history reads and a single-connection writer
//! pool that serializes message appends.

use std::str::FromStr;
use std::time::Duration;

use lorekeeper_types::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: `min_connections..=max_connections` read-only connections.
/// - `writer`: exactly one connection for INSERT/UPDATE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open both pools and run embedded migrations on the writer.
    ///
    /// Pool bounds and timeouts are always taken from `config`, never from
    /// sqlx defaults.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(&config.url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let acquire_timeout = Duration::from_secs(config.acquire_timeout_secs);

        let writer = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_with(base_opts)
            .await?;

        // Schema must exist before read-only connections open.
        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(read_opts)
            .await?;

        tracing::info!(
            min = config.min_connections,
            max = config.max_connections,
            "SQLite pools ready"
        );

        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.reader.close().await;
        self.writer.close().await;
    }
}
