//! Lorekeeper CLI and HTTP API entry point.
//!
//! Binary name: `lorekeeper`
//!
//! Parses CLI arguments, loads configuration, opens the stores, then
//! dispatches to a command handler or starts the HTTP server. The stores are
//! closed on every exit path.

mod cli;
mod http;
mod state;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use lorekeeper_infra::config::{load_config, resolve_config_source};
use lorekeeper_observe::{LogOptions, init_tracing, shutdown_tracing};
use lorekeeper_types::config::AppConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or stores
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "lorekeeper", &mut std::io::stdout());
        return Ok(());
    }

    let source = resolve_config_source(cli.config.as_deref());
    let mut config = load_config(&source).await?;
    cli.overrides.apply(&mut config);
    if let Commands::Serve { port, host } = &cli.command {
        if let Some(port) = port {
            config.server.port = *port;
        }
        if let Some(host) = host {
            config.server.host = host.clone();
        }
    }
    config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;

    let _guard = init_tracing(&log_options(&cli, &config))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    tracing::debug!(path = %source.path().display(), "Configuration loaded");

    let state = AppState::init(&config).await?;
    let result = run(cli, &config, &state).await;
    state.shutdown().await;
    shutdown_tracing();
    result
}

fn log_options(cli: &Cli, config: &AppConfig) -> LogOptions {
    LogOptions {
        default_filter: cli.log_filter().to_string(),
        dir: config.logging.dir.as_ref().map(PathBuf::from),
        file_prefix: config.logging.file_prefix.clone(),
        max_files: config.logging.max_files,
        otel: config.logging.otel,
    }
}

async fn run(cli: Cli, config: &AppConfig, state: &AppState) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve { .. } => serve(state.clone(), config).await?,

        Commands::Ingest { file, index } => {
            cli::ingest::ingest(state, &file, config.embedding.batch_size, index, cli.json).await?;
        }

        Commands::Search {
            query,
            lang,
            limit,
            table,
        } => {
            cli::search::search(state, &query, lang, limit, table, cli.json).await?;
        }

        Commands::Ask {
            query,
            session,
            lang,
            rag_limit,
            history_limit,
            table,
            stream,
        } => {
            let options = cli::ask::AskOptions {
                query,
                session,
                lang,
                rag_limit,
                history_limit,
                table,
                stream,
            };
            cli::ask::ask(state, options, cli.json).await?;
        }

        Commands::History { session, limit } => {
            cli::history::history(state, &session, limit, cli.json).await?;
        }

        Commands::Completions { .. } => {}
    }
    Ok(())
}

async fn serve(state: AppState, config: &AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, model = %config.llm.model, "HTTP API listening");
    println!(
        "  {} Lorekeeper API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
