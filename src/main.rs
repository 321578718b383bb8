use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

mod api;
mod config;
mod db;
mod pbp;
mod sim;

use api::{AppState, GameCache};
use config::Config;
use db::Database;
use pbp::{NflverseClient, PlayByPlayProvider, StoredProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    for season in db.list_seasons()? {
        debug!("Stored season {}: {} rows from {}", season.season, season.row_count, season.source);
    }

    // Play-by-play: local store in front of nflverse
    let upstream = NflverseClient::new(&config.nflverse_base_url, config.http_timeout())?;
    info!("Play-by-play upstream: {}", config.nflverse_base_url);
    let provider: Arc<dyn PlayByPlayProvider> = Arc::new(StoredProvider::new(db.clone(), Arc::new(upstream)));

    // Simulation workers
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .thread_name(|i| format!("whatif-sim-{}", i))
        .build()
        .context("Failed to build simulation thread pool")?;
    info!(
        "Simulation pool: {} thread(s), {} default / {} max trials",
        pool.current_num_threads(),
        config.default_trials,
        config.max_trials
    );

    // Game cache with a background sweep
    let cache = GameCache::new(config.game_cache_ttl());
    {
        let cache = cache.clone();
        let period = config.game_cache_ttl();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    debug!("Evicted {} expired game(s), {} still cached", removed, cache.len().await);
                }
            }
        });
    }

    let state = AppState {
        db,
        provider,
        cache,
        pool: Arc::new(pool),
        default_trials: config.default_trials,
        max_trials: config.max_trials,
        deadline: config.simulation_deadline(),
    };
    let app = api::router(state);
    let addr: SocketAddr = config.api_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
