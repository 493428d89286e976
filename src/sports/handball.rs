//! Handball adapter (API-Handball v1, `GET /games`).

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

const PERIODS: &[&str] = &["first", "second", "extratime", "penalties"];

pub struct HandballAdapter {
    source: ApiSportsSource,
}

impl HandballAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Handball)?,
        })
    }
}

impl GameSport for HandballAdapter {
    const SPORT: Sport = Sport::Handball;

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "1H" | "2H" | "HT" | "ET" | "BT" | "PT" => FixtureStatus::Live,
            "AET" | "AP" => FixtureStatus::Finished,
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
        let ext = SportSpecific::Handball {
            periods,
            week: game.week.as_ref().and_then(value_to_string),
        };
        (score, ext)
    }
}

#[async_trait]
impl SportAdapter for HandballAdapter {
    fn sport(&self) -> Sport {
        Sport::Handball
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_handball_skips_bad_items() {
        let raw = json!({
            "response": [
                {
                    "id": 55,
                    "timestamp": 1736532000,
                    "status": {"short": "FT"},
                    "league": {"id": 131, "name": "Starligue"},
                    "country": {"name": "France"},
                    "teams": {"home": {"id": 1, "name": "PSG"}, "away": {"id": 2, "name": "Nantes"}},
                    "scores": {"home": 33, "away": 29},
                    "periods": {"first": {"home": 17, "away": 15}, "second": {"home": 16, "away": 14}}
                },
                {"id": "not-a-number", "league": {"name": "Broken"}}
            ]
        });
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let snap = normalize_games::<HandballAdapter>(date, raw).unwrap();

        assert_eq!(snap.len(), 1);
        let f = &snap.matches[0];
        assert_eq!(f.status, FixtureStatus::Finished);
        assert_eq!(f.score.details.as_deref(), Some("17-15, 16-14"));
        assert_eq!(snap.indexes.leagues["france"], vec!["Starligue"]);
    }
}
