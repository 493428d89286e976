//! Ice hockey adapter (API-Hockey v1, `GET /games`).
//!
//! Totals are plain numbers; periods are `"h-a"` strings.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::games::{
    common_status, dash_pair, normalize_games, period_summary, periods_from, score_number,
    value_to_string, ApiGame, ApiSportsSource, GameSport, PROVIDER,
};
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{EngineResult, FixtureStatus, Score, Snapshot, Sport, SportSpecific};

const PERIODS: &[&str] = &["first", "second", "third", "overtime", "penalties"];

pub struct HockeyAdapter {
    source: ApiSportsSource,
}

impl HockeyAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Hockey)?,
        })
    }
}

impl GameSport for HockeyAdapter {
    const SPORT: Sport = Sport::Hockey;

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "P1" | "P2" | "P3" | "OT" | "PT" | "BT" => FixtureStatus::Live,
            "AOT" | "AP" => FixtureStatus::Finished,
            other => FixtureStatus::Other(other.to_string()),
        })
    }

    fn extension(game: &ApiGame) -> (Score, SportSpecific) {
        let periods = periods_from(&game.periods, PERIODS, dash_pair);
        let score = Score {
            home: score_number(&game.scores["home"]),
            away: score_number(&game.scores["away"]),
            details: period_summary(&periods),
        };
        let ext = SportSpecific::Hockey {
            periods,
            timer: game.status.timer.as_ref().and_then(value_to_string),
        };
        (score, ext)
    }
}

#[async_trait]
impl SportAdapter for HockeyAdapter {
    fn sport(&self) -> Sport {
        Sport::Hockey
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
