//! Basketball adapter (API-Basketball v1, `GET /games`).
//!
//! Quarter scores arrive split by side:
//! `scores.home = { quarter_1, .., quarter_4, over_time, total }`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::games::{
    common_status, normalize_games, period_summary, score_number, value_to_string, ApiGame,
    ApiSportsSource, GameSport, PROVIDER,
};
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{
    EngineResult, FixtureStatus, PeriodScore, Score, ScorePair, Snapshot, Sport, SportSpecific,
};

const QUARTERS: &[&str] = &["quarter_1", "quarter_2", "quarter_3", "quarter_4"];

pub struct BasketballAdapter {
    source: ApiSportsSource,
}

impl BasketballAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Basketball)?,
        })
    }
}

impl GameSport for BasketballAdapter {
    const SPORT: Sport = Sport::Basketball;

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "Q1" | "Q2" | "Q3" | "Q4" | "OT" | "BT" | "HT" => FixtureStatus::Live,
            "AOT" => FixtureStatus::Finished,
            other => FixtureStatus::Other(other.to_string()),
        })
    }

    fn extension(game: &ApiGame) -> (Score, SportSpecific) {
        let home = &game.scores["home"];
        let away = &game.scores["away"];

        let quarters: Vec<PeriodScore> = QUARTERS
            .iter()
            .enumerate()
            .filter_map(|(i, key)| {
                let (h, a) = (score_number(&home[*key]), score_number(&away[*key]));
                (h.is_some() || a.is_some()).then(|| PeriodScore {
                    label: format!("Q{}", i + 1),
                    home: h,
                    away: a,
                })
            })
            .collect();

        let overtime = ScorePair::new(score_number(&home["over_time"]), score_number(&away["over_time"]));

        let score = Score {
            home: score_number(&home["total"]),
            away: score_number(&away["total"]),
            details: period_summary(&quarters),
        };
        let ext = SportSpecific::Basketball {
            quarters,
            overtime: (!overtime.is_empty()).then_some(overtime),
            timer: game.status.timer.as_ref().and_then(value_to_string),
            stage: game.stage.clone(),
        };
        (score, ext)
    }
}

#[async_trait]
impl SportAdapter for BasketballAdapter {
    fn sport(&self) -> Sport {
        Sport::Basketball
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
