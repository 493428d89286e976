//! Snapshot orchestration.
//!
//! Sits between callers and the adapters/storage pair: serves cached
//! snapshots, refreshes from upstream on a miss or when forced, falls
//! back to whatever is cached when upstream fails, and coalesces
//! concurrent refreshes of the same (sport, date) into one fetch.

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::sports::{AdapterRegistry, SportAdapter};
use crate::storage::{record_key, SnapshotStorage};
use crate::types::{EngineError, EngineResult, Fixture, Snapshot, Sport};

type PendingFetch = Shared<BoxFuture<'static, EngineResult<Snapshot>>>;

pub struct Aggregator {
    registry: Arc<AdapterRegistry>,
    storage: Arc<dyn SnapshotStorage>,
    settings: EngineConfig,
    in_flight: Arc<Mutex<HashMap<(Sport, NaiveDate), PendingFetch>>>,
}

impl Aggregator {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        storage: Arc<dyn SnapshotStorage>,
        settings: EngineConfig,
    ) -> Self {
        Self {
            registry,
            storage,
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn sports(&self) -> Vec<Sport> {
        self.registry.sports()
    }

    fn adapter(&self, sport: Sport) -> EngineResult<Arc<dyn SportAdapter>> {
        self.registry
            .get(sport)
            .ok_or_else(|| EngineError::UnknownSport(sport.to_string()))
    }

    /// Snapshot for (sport, date).
    ///
    /// Serves a non-empty cached snapshot unless `force_refresh`; otherwise
    /// fetches, persists and returns fresh data. If the fetch fails, any
    /// cached snapshot for the key is returned instead (for forced
    /// refreshes only when `fallback_on_forced_refresh` is set).
    pub async fn get_snapshot(
        &self,
        sport: Sport,
        date: NaiveDate,
        force_refresh: bool,
    ) -> EngineResult<Snapshot> {
        let adapter = self.adapter(sport)?;
        let key = record_key(sport, date);

        if !force_refresh {
            match self.storage.exists(sport, date).await {
                Ok(true) => match self.storage.load(sport, date).await {
                    Ok(snapshot) if !snapshot.is_empty() => {
                        debug!(%key, fixtures = snapshot.len(), "Cache hit");
                        return Ok(snapshot);
                    }
                    Ok(_) => debug!(%key, "Cached snapshot is empty, refetching"),
                    Err(e) => warn!(%key, error = %e, "Cache read failed, refetching"),
                },
                Ok(false) => debug!(%key, "Cache miss"),
                Err(e) => warn!(%key, error = %e, "Cache lookup failed, refetching"),
            }
        }

        let error = match self.refresh(sport, date, adapter).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e) => e,
        };

        if force_refresh && !self.settings.fallback_on_forced_refresh {
            warn!(%key, error = %error, "Forced refresh failed");
            return Err(error);
        }

        match self.storage.load(sport, date).await {
            Ok(cached) => {
                warn!(
                    %key,
                    error = %error,
                    fetched_at = %cached.fetched_at,
                    "Upstream failed, serving cached snapshot"
                );
                Ok(cached)
            }
            Err(_) => {
                warn!(%key, error = %error, "Upstream failed and nothing cached");
                Err(error)
            }
        }
    }

    /// Fetch from upstream, joining a refresh of the same key that is
    /// already running.
    ///
    /// The fetch runs on its own task, so it completes (and persists)
    /// even if every caller waiting on it is dropped.
    async fn refresh(
        &self,
        sport: Sport,
        date: NaiveDate,
        adapter: Arc<dyn SportAdapter>,
    ) -> EngineResult<Snapshot> {
        let pending = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&(sport, date)) {
                Some(pending) => {
                    debug!(key = %record_key(sport, date), "Joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    let pending = self.spawn_fetch(sport, date, adapter);
                    in_flight.insert((sport, date), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        // The task clears its entry itself unless it panicked.
        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&(sport, date))
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            in_flight.remove(&(sport, date));
        }

        result
    }

    /// Start the fetch task for a key. Must be called with the in-flight
    /// lock held; the task removes its own entry once it has a result.
    fn spawn_fetch(
        &self,
        sport: Sport,
        date: NaiveDate,
        adapter: Arc<dyn SportAdapter>,
    ) -> PendingFetch {
        let provider = adapter.source().to_string();
        let storage = self.storage.clone();
        let in_flight = self.in_flight.clone();

        let handle = tokio::spawn(async move {
            let result = fetch_and_store(adapter, storage, date).await;
            in_flight.lock().await.remove(&(sport, date));
            result
        });

        handle
            .map(move |joined| {
                joined.unwrap_or_else(|e| {
                    Err(EngineError::UpstreamUnreachable {
                        provider,
                        message: format!("fetch task failed: {e}"),
                    })
                })
            })
            .boxed()
            .shared()
    }

    /// Look a fixture up by id.
    ///
    /// Tries `date` first when given, then scans every stored date for
    /// the sport in ascending order. Dates that fail to load are logged
    /// and skipped.
    pub async fn find_fixture_by_id(
        &self,
        sport: Sport,
        fixture_id: &str,
        date: Option<NaiveDate>,
        force_update: bool,
    ) -> EngineResult<Fixture> {
        self.adapter(sport)?;

        if let Some(date) = date {
            match self.get_snapshot(sport, date, force_update).await {
                Ok(snapshot) => {
                    if let Some(fixture) = snapshot.find_fixture(fixture_id) {
                        return Ok(fixture.clone());
                    }
                }
                Err(e) => warn!(%sport, %date, error = %e, "Hinted date unavailable"),
            }
        }

        let limit = self.settings.max_scan_dates.unwrap_or(usize::MAX);
        let dates = self.storage.list_dates(sport).await?;
        let mut scanned = 0usize;

        for candidate in dates.into_iter().filter(|d| Some(*d) != date).take(limit) {
            scanned += 1;
            match self.get_snapshot(sport, candidate, false).await {
                Ok(snapshot) => {
                    if let Some(fixture) = snapshot.find_fixture(fixture_id) {
                        info!(%sport, fixture_id, date = %candidate, scanned, "Fixture found by scan");
                        return Ok(fixture.clone());
                    }
                }
                Err(e) => warn!(%sport, date = %candidate, error = %e, "Skipping date in fixture scan"),
            }
        }

        debug!(%sport, fixture_id, scanned, "Fixture not found");
        Err(EngineError::FixtureNotFound {
            sport,
            fixture_id: fixture_id.to_string(),
        })
    }

    /// Stored dates for a sport, ascending.
    pub async fn list_dates(&self, sport: Sport) -> EngineResult<Vec<NaiveDate>> {
        self.adapter(sport)?;
        self.storage.list_dates(sport).await
    }
}

async fn fetch_and_store(
    adapter: Arc<dyn SportAdapter>,
    storage: Arc<dyn SnapshotStorage>,
    date: NaiveDate,
) -> EngineResult<Snapshot> {
    let sport = adapter.sport();
    let snapshot = adapter.fetch_snapshot(date).await?;

    if snapshot.is_empty() {
        return Err(EngineError::MalformedPayload {
            provider: adapter.source().to_string(),
            message: format!("no fixtures for {}", record_key(sport, date)),
        });
    }

    // A snapshot that could not be persisted is still fresh data.
    if let Err(e) = storage.save(&snapshot).await {
        warn!(key = %record_key(sport, date), error = %e, "Failed to persist snapshot");
    }

    info!(
        key = %record_key(sport, date),
        source = %snapshot.source,
        fixtures = snapshot.len(),
        countries = snapshot.indexes.countries.len(),
        "Snapshot refreshed"
    );
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
