//! Archery bracket server.
//!
//! Serves the bracket API over HTTP and pushes live changes to spectators
//! over WebSocket, backed by PostgreSQL or by the in-process store.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Error};
use archery_bracket::bracket::{Candidate, CategoryId, EventId};
use archery_bracket::{
    BracketRepository, CandidateSource, Database, MemoryBracketRepository, StaticCandidates,
};
use bracket_server::api::{AppState, EventHub, create_router};
use bracket_server::config::ServerConfig;
use bracket_server::{logging, metrics};
use pico_args::Arguments;
use serde::Deserialize;
use tracing::info;

const HELP: &str = "\
Run the archery elimination bracket server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url       URL       Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/archery_brackets]
  --metrics      IP:PORT   Prometheus exporter address [default: env METRICS_BIND, disabled when unset]
  --candidates   FILE      Qualification rankings JSON for the in-memory store [default: env CANDIDATES_FILE]

FLAGS:
  --in-memory              Keep brackets in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter (default: info,sqlx=warn,hyper=warn)
  BRACKET_ENDS_PER_MATCH   Default ends per match (default: 5)
  BRACKET_ARROWS_PER_END   Default arrows per end (default: 3)
  LIVE_CHANNEL_CAPACITY    Buffered live updates per event (default: 64)
  DB_MAX_CONNECTIONS       Database pool size (default: 10)
  (See .env file for all configuration options)
";

/// One ranked qualifier in a `--candidates` file
#[derive(Debug, Deserialize)]
struct RankingRow {
    event_id: EventId,
    category_id: CategoryId,
    #[serde(flatten)]
    candidate: Candidate,
}

fn load_candidates(path: &Path) -> Result<StaticCandidates, Error> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read candidates file {}", path.display()))?;
    let rows: Vec<RankingRow> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid candidates file {}", path.display()))?;

    let mut lists: std::collections::HashMap<(EventId, CategoryId), Vec<Candidate>> =
        std::collections::HashMap::new();
    for row in rows {
        lists
            .entry((row.event_id, row.category_id))
            .or_default()
            .push(row.candidate);
    }

    let source = StaticCandidates::new();
    for ((event_id, category_id), candidates) in lists {
        info!(
            "Loaded {} candidates for event {} category {}",
            candidates.len(),
            event_id,
            category_id
        );
        source.set(event_id, category_id, candidates);
    }
    Ok(source)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    logging::init();

    let in_memory = pargs.contains("--in-memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics")?;
    let candidates_file: Option<PathBuf> = pargs.opt_value_from_str("--candidates")?;

    let mut config = ServerConfig::from_env(bind, database_url, in_memory, metrics_bind)?;
    if candidates_file.is_some() {
        config.candidates_file = candidates_file;
    }

    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{}/metrics", addr);
    }

    let (repo, candidates, database): (
        Arc<dyn BracketRepository>,
        Arc<dyn CandidateSource>,
        Option<Database>,
    ) = if config.in_memory {
        info!("Using in-memory bracket store");
        let source = match &config.candidates_file {
            Some(path) => load_candidates(path)?,
            None => StaticCandidates::new(),
        };
        (
            Arc::new(MemoryBracketRepository::new()),
            Arc::new(source),
            None,
        )
    } else {
        info!("Connecting to database");
        let db = Database::new(&config.database)
            .await
            .context("Failed to connect to database")?;
        db.migrate().await.context("Failed to apply migrations")?;
        info!("Database connected successfully");

        let (repo, source) = db.repositories();
        (Arc::new(repo), Arc::new(source), Some(db))
    };

    let hub = Arc::new(EventHub::new(config.live_channel_capacity));
    let state = AppState::new(
        repo,
        candidates,
        hub,
        database.clone(),
        config.bracket_defaults,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Bracket server listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
