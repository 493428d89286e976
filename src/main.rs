//! sportsfeed: sports-data aggregation service.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires adapters, storage and the aggregator together, starts the HTTP
//! API, and keeps today's snapshots fresh until Ctrl+C.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use sportsfeed::api::{self, ApiState};
use sportsfeed::betting::BetEventBuilder;
use sportsfeed::config;
use sportsfeed::engine::Aggregator;
use sportsfeed::sports::AdapterRegistry;
use sportsfeed::storage::FileStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("SPORTSFEED_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        service = %cfg.service.name,
        refresh_interval_secs = cfg.service.refresh_interval_secs,
        sports = cfg.service.sports.len(),
        data_dir = %cfg.storage.data_dir.display(),
        "sportsfeed starting up"
    );

    // -- Initialise components -------------------------------------------

    let registry = Arc::new(
        AdapterRegistry::from_config(&cfg).context("Failed to initialise sport adapters")?,
    );
    let racing = registry.racing();
    let storage = Arc::new(FileStorage::new(cfg.storage.data_dir.clone()));
    let aggregator = Arc::new(Aggregator::new(
        registry,
        storage,
        cfg.engine.clone(),
    ));

    let bets = racing.map(|adapter| Arc::new(BetEventBuilder::new(adapter)));
    if bets.is_none() {
        warn!("Horse racing disabled, bet endpoints will answer 404");
    }

    if cfg.api.enabled {
        let state = Arc::new(ApiState {
            aggregator: aggregator.clone(),
            bets,
        });
        api::spawn_api(state, cfg.api.port).await?;
    }

    // -- Refresh loop ----------------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    if cfg.service.refresh_interval_secs == 0 {
        info!("Background refresh disabled. Press Ctrl+C to stop.");
        shutdown.await.context("Failed to listen for Ctrl+C")?;
        info!("Shutdown signal received.");
    } else {
        let mut interval =
            tokio::time::interval(Duration::from_secs(cfg.service.refresh_interval_secs));

        info!(
            interval_secs = cfg.service.refresh_interval_secs,
            "Entering refresh loop. Press Ctrl+C to stop."
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let today = Utc::now().date_naive();
                    refresh_all(&aggregator, today).await;
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    break;
                }
            }
        }
    }

    info!("sportsfeed shut down cleanly.");
    Ok(())
}

/// Force-refresh one date for every enabled sport.
async fn refresh_all(aggregator: &Aggregator, date: NaiveDate) {
    let sports = aggregator.sports();
    let mut refreshed = 0usize;

    for sport in &sports {
        match aggregator.get_snapshot(*sport, date, true).await {
            Ok(snapshot) => {
                refreshed += 1;
                info!(%sport, %date, fixtures = snapshot.len(), "Refreshed");
            }
            Err(e) => error!(%sport, %date, error = %e, "Refresh failed, continuing"),
        }
    }

    info!(%date, refreshed, total = sports.len(), "Refresh cycle complete");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sportsfeed=info"));

    let json_logging = std::env::var("SPORTSFEED_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
