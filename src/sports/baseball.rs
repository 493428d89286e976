//! Baseball adapter (API-Baseball v1, `GET /games`).
//!
//! Each side carries `{ hits, errors, innings: { "1".."9", "extra" }, total }`.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::games::{
    common_status, normalize_games, score_number, ApiGame, ApiSportsSource, GameSport, PROVIDER,
};
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{
    EngineResult, FixtureStatus, PeriodScore, Score, ScorePair, Snapshot, Sport, SportSpecific,
};

const INNINGS: &[&str] = &["1", "2", "3", "4", "5", "6", "7", "8", "9", "extra"];

pub struct BaseballAdapter {
    source: ApiSportsSource,
}

impl BaseballAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Baseball)?,
        })
    }
}

impl GameSport for BaseballAdapter {
    const SPORT: Sport = Sport::Baseball;

    fn map_status(code: &str) -> FixtureStatus {
        // IN1..IN9 and extra innings
        if let Some(inning) = code.strip_prefix("IN") {
            if !inning.is_empty() && inning.chars().all(|c| c.is_ascii_digit()) {
                return FixtureStatus::Live;
            }
        }
        common_status(code).unwrap_or_else(|| FixtureStatus::Other(code.to_string()))
    }

    fn extension(game: &ApiGame) -> (Score, SportSpecific) {
        let home = &game.scores["home"];
        let away = &game.scores["away"];

        let innings: Vec<PeriodScore> = INNINGS
            .iter()
            .filter_map(|key| {
                let (h, a) = (
                    score_number(&home["innings"][*key]),
                    score_number(&away["innings"][*key]),
                );
                (h.is_some() || a.is_some()).then(|| PeriodScore {
                    label: key.to_string(),
                    home: h,
                    away: a,
                })
            })
            .collect();

        let score = Score {
            home: score_number(&home["total"]),
            away: score_number(&away["total"]),
            details: None,
        };
        let ext = SportSpecific::Baseball {
            innings,
            hits: ScorePair::new(score_number(&home["hits"]), score_number(&away["hits"])),
            errors: ScorePair::new(score_number(&home["errors"]), score_number(&away["errors"])),
        };
        (score, ext)
    }
}

#[async_trait]
impl SportAdapter for BaseballAdapter {
    fn sport(&self) -> Sport {
        Sport::Baseball
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
    fn test_normalize_baseball() {
        let raw = json!({
            "response": [{
                "id": 77,
                "date": "2025-07-15T23:05:00+00:00",
                "status": {"long": "Inning 7", "short": "IN7"},
                "league": {"id": 1, "name": "MLB", "season": 2025},
                "country": {"name": "USA", "flag": "https://media.api-sports.io/flags/us.svg"},
                "teams": {"home": {"id": 5, "name": "Yankees"}, "away": {"id": 6, "name": "Red Sox"}},
                "scores": {
                    "home": {"hits": 8, "errors": 0, "innings": {"1": 0, "2": 2, "3": null}, "total": 2},
                    "away": {"hits": 5, "errors": 1, "innings": {"1": 1, "2": 0, "3": null}, "total": 1}
                }
            }]
        });
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let snap = normalize_games::<BaseballAdapter>(date, raw).unwrap();
        let f = &snap.matches[0];

        assert_eq!(f.status, FixtureStatus::Live);
        assert_eq!(f.score.home, Some(2));
        match &f.sport_specific {
            SportSpecific::Baseball { innings, hits, errors } => {
                assert_eq!(innings.len(), 2);
                assert_eq!(*hits, ScorePair::new(Some(8), Some(5)));
                assert_eq!(errors.away, Some(1));
            }
            other => panic!("unexpected extension {other:?}"),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(BaseballAdapter::map_status("IN1"), FixtureStatus::Live);
        assert_eq!(BaseballAdapter::map_status("IN"), FixtureStatus::Other("IN".into()));
        assert_eq!(BaseballAdapter::map_status("INTR"), FixtureStatus::Other("INTR".into()));
        assert_eq!(BaseballAdapter::map_status("FT"), FixtureStatus::Finished);
    }
}
