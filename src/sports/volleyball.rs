//! Volleyball adapter (API-Volleyball v1, `GET /games`).
//!
//! `scores` holds sets won; `periods.first..fifth` hold set points.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::games::{
    common_status, normalize_games, pair_of, period_summary, periods_from, score_number, ApiGame,
    ApiSportsSource, GameSport, PROVIDER,
};
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{EngineResult, FixtureStatus, Score, Snapshot, Sport, SportSpecific};

const SETS: &[&str] = &["first", "second", "third", "fourth", "fifth"];

pub struct VolleyballAdapter {
    source: ApiSportsSource,
}

impl VolleyballAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Volleyball)?,
        })
    }
}

impl GameSport for VolleyballAdapter {
    const SPORT: Sport = Sport::Volleyball;

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "S1" | "S2" | "S3" | "S4" | "S5" => FixtureStatus::Live,
            "AW" => FixtureStatus::Finished,
            other => FixtureStatus::Other(other.to_string()),
        })
    }

    fn extension(game: &ApiGame) -> (Score, SportSpecific) {
        let sets = periods_from(&game.periods, SETS, pair_of);
        let score = Score {
            home: score_number(&game.scores["home"]),
            away: score_number(&game.scores["away"]),
            details: period_summary(&sets),
        };
        (score, SportSpecific::Volleyball { sets })
    }
}

#[async_trait]
impl SportAdapter for VolleyballAdapter {
    fn sport(&self) -> Sport {
        Sport::Volleyball
    }

    fn source(&self) -> &str {
        PROVIDER
    }

    async fn fetch_raw(&self, date: NaiveDate) -> EngineResult<Value> {
        self.source.get_by_date("games", date).await
    }

    fn normalize(&self, date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        normalize_games::<Self>(date, raw)
    }
}
