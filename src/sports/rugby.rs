//! Rugby adapter (API-Rugby v1, `GET /games`).

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::games::{
    common_status, normalize_games, pair_of, period_summary, periods_from, score_number,
    value_to_string, ApiGame, ApiSportsSource, GameSport, PROVIDER,
};
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{EngineResult, FixtureStatus, Score, Snapshot, Sport, SportSpecific};

const PERIODS: &[&str] = &["first", "second", "overtime", "second_overtime"];

pub struct RugbyAdapter {
    source: ApiSportsSource,
}

impl RugbyAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Rugby)?,
        })
    }
}

impl GameSport for RugbyAdapter {
    const SPORT: Sport = Sport::Rugby;

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "1H" | "2H" | "HT" | "ET" | "BT" | "PT" => FixtureStatus::Live,
            "AET" => FixtureStatus::Finished,
            other => FixtureStatus::Other(other.to_string()),
        })
    }

    fn extension(game: &ApiGame) -> (Score, SportSpecific) {
        let periods = periods_from(&game.periods, PERIODS, pair_of);
        let score = Score {
            home: score_number(&game.scores["home"]),
            away: score_number(&game.scores["away"]),
            details: period_summary(&periods),
        };
        let ext = SportSpecific::Rugby {
            periods,
            week: game.week.as_ref().and_then(value_to_string),
        };
        (score, ext)
    }
}

#[async_trait]
impl SportAdapter for RugbyAdapter {
    fn sport(&self) -> Sport {
        Sport::Rugby
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
