//! Per-sport upstream adapters.
//!
//! Defines the `SportAdapter` capability trait and the adapter registry.
//! Seven team sports come from the API-Sports family of APIs; horse
//! racing comes from the PMU programme API and additionally exposes the
//! participant endpoints used by the bet builder.

pub mod baseball;
pub mod basketball;
pub mod client;
pub mod football;
pub mod games;
pub mod handball;
pub mod hockey;
pub mod horse_racing;
pub mod index;
pub mod rugby;
pub mod volleyball;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::types::{EngineResult, Snapshot, Sport};

pub use client::UpstreamClient;
pub use horse_racing::HorseRacingAdapter;
pub use index::{slugify, IndexBuilder};

/// Abstraction over one upstream sports API.
///
/// `fetch_raw` performs the network call; `normalize` is a pure
/// transformation into the uniform snapshot schema.
#[async_trait]
pub trait SportAdapter: Send + Sync {
    /// The sport this adapter serves.
    fn sport(&self) -> Sport;

    /// Upstream name recorded in the snapshot (e.g. "api-sports").
    fn source(&self) -> &str;

    /// Fetch the raw upstream payload for a date.
    async fn fetch_raw(&self, date: NaiveDate) -> EngineResult<serde_json::Value>;

    /// Turn a raw payload into a snapshot. No I/O.
    fn normalize(&self, date: NaiveDate, raw: serde_json::Value) -> EngineResult<Snapshot>;

    /// Fetch and normalize in one go.
    async fn fetch_snapshot(&self, date: NaiveDate) -> EngineResult<Snapshot> {
        let raw = self.fetch_raw(date).await?;
        self.normalize(date, raw)
    }
}

/// All adapters enabled by configuration, keyed by sport.
pub struct AdapterRegistry {
    adapters: HashMap<Sport, Arc<dyn SportAdapter>>,
    racing: Option<Arc<HorseRacingAdapter>>,
}

impl AdapterRegistry {
    /// Build the adapters for every sport listed in `service.sports`.
    pub fn from_config(cfg: &AppConfig) -> EngineResult<Self> {
        let mut registry = Self::empty();
        let api_sports = &cfg.providers.api_sports;

        for sport in &cfg.service.sports {
            let adapter: Arc<dyn SportAdapter> = match sport {
                Sport::Football => Arc::new(football::FootballAdapter::new(api_sports)?),
                Sport::Basketball => Arc::new(basketball::BasketballAdapter::new(api_sports)?),
                Sport::Hockey => Arc::new(hockey::HockeyAdapter::new(api_sports)?),
                Sport::Baseball => Arc::new(baseball::BaseballAdapter::new(api_sports)?),
                Sport::Rugby => Arc::new(rugby::RugbyAdapter::new(api_sports)?),
                Sport::Handball => Arc::new(handball::HandballAdapter::new(api_sports)?),
                Sport::Volleyball => Arc::new(volleyball::VolleyballAdapter::new(api_sports)?),
                Sport::HorseRacing => {
                    let racing = Arc::new(HorseRacingAdapter::new(&cfg.providers.pmu)?);
                    registry.racing = Some(racing.clone());
                    racing
                }
            };
            registry.adapters.insert(*sport, adapter);
        }

        info!(sports = registry.adapters.len(), "Sport adapters initialised");
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
            racing: None,
        }
    }

    /// Register (or replace) the adapter for its sport.
    pub fn insert(&mut self, adapter: Arc<dyn SportAdapter>) {
        self.adapters.insert(adapter.sport(), adapter);
    }

    pub fn get(&self, sport: Sport) -> Option<Arc<dyn SportAdapter>> {
        self.adapters.get(&sport).cloned()
    }

    /// The racing adapter, for the participant endpoints.
    pub fn racing(&self) -> Option<Arc<HorseRacingAdapter>> {
        self.racing.clone()
    }

    /// Enabled sports in stable order.
    pub fn sports(&self) -> Vec<Sport> {
        let mut sports: Vec<Sport> = self.adapters.keys().copied().collect();
        sports.sort();
        sports
    }
}
