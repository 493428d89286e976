//! Football adapter (API-Football v3, `GET /fixtures`).
//!
//! Unlike the v1 hosts, v3 nests the fixture metadata under `fixture`,
//! puts the country name and flag on the league, and splits the score
//! into `goals` (headline) and `score` (halftime/fulltime/extratime/penalty).

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::games::{
    common_status, kickoff, league_id, response_items, value_to_string, ApiSportsSource,
    ApiTeam, PROVIDER,
};
use super::index::IndexBuilder;
use super::SportAdapter;
use crate::config::ApiSportsConfig;
use crate::types::{
    EngineResult, Fixture, FixtureStatus, LeagueRef, Score, ScorePair, Snapshot, Sport,
    SportSpecific, Teams, Venue,
};

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiFixtureItem {
    fixture: ApiFixture,
    league: ApiFootballLeague,
    teams: ApiFootballTeams,
    #[serde(default)]
    goals: ScorePair,
    #[serde(default)]
    score: ApiScoreBreakdown,
}

#[derive(Debug, Deserialize)]
struct ApiFixture {
    id: i64,
    #[serde(default)]
    referee: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    venue: Option<ApiVenue>,
    #[serde(default)]
    status: ApiFootballStatus,
}

#[derive(Debug, Deserialize)]
struct ApiVenue {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiFootballStatus {
    #[serde(default)]
    short: Option<String>,
    #[serde(default)]
    elapsed: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiFootballLeague {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    flag: Option<String>,
    #[serde(default)]
    season: Option<Value>,
    #[serde(default)]
    round: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiFootballTeams {
    home: ApiTeam,
    away: ApiTeam,
}

#[derive(Debug, Default, Deserialize)]
struct ApiScoreBreakdown {
    #[serde(default)]
    halftime: ScorePair,
    #[serde(default)]
    fulltime: ScorePair,
    #[serde(default)]
    extratime: ScorePair,
    #[serde(default)]
    penalty: ScorePair,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct FootballAdapter {
    source: ApiSportsSource,
}

impl FootballAdapter {
    pub fn new(cfg: &ApiSportsConfig) -> EngineResult<Self> {
        Ok(Self {
            source: ApiSportsSource::new(cfg, Sport::Football)?,
        })
    }

    fn map_status(code: &str) -> FixtureStatus {
        common_status(code).unwrap_or_else(|| match code {
            "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "INT" => FixtureStatus::Live,
            "AET" | "PEN" | "AWD" | "WO" => FixtureStatus::Finished,
            other => FixtureStatus::Other(other.to_string()),
        })
    }

    /// "HT 1-0" plus extra time / penalties when they happened.
    fn score_details(score: &ApiScoreBreakdown) -> Option<String> {
        let mut parts = Vec::new();
        for (label, pair) in [
            ("HT", &score.halftime),
            ("ET", &score.extratime),
            ("PEN", &score.penalty),
        ] {
            if let (Some(h), Some(a)) = (pair.home, pair.away) {
                parts.push(format!("{label} {h}-{a}"));
            }
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    fn normalize_items(date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        let items = response_items(raw)?;
        let mut index = IndexBuilder::new();
        let mut seen = HashSet::new();
        let mut matches = Vec::with_capacity(items.len());

        for item in items {
            let item: ApiFixtureItem = match serde_json::from_value(item) {
                Ok(i) => i,
                Err(e) => {
                    warn!(sport = "football", error = %e, "Skipping undecodable fixture");
                    continue;
                }
            };

            let id = item.fixture.id.to_string();
            if !seen.insert(id.clone()) {
                debug!(id = %id, "Duplicate fixture id, keeping first");
                continue;
            }

            let league = &item.league;
            let (country_name, country_id) =
                index.observe(league.country.as_deref(), league.flag.as_deref(), &league.name);

            let venue = item.fixture.venue.as_ref().and_then(|v| {
                v.name.as_ref().map(|name| Venue {
                    id: v.id.map(|i| i.to_string()),
                    name: name.clone(),
                    city: v.city.clone(),
                })
            });

            let status_code = item.fixture.status.short.as_deref().unwrap_or("UNKNOWN");

            matches.push(Fixture {
                id,
                date: kickoff(item.fixture.date.as_deref(), item.fixture.timestamp, date),
                league: LeagueRef {
                    id: league_id(league.id, &league.name),
                    name: league.name.clone(),
                    country: country_name,
                    country_id,
                    logo: league.logo.clone(),
                    flag: league.flag.clone(),
                    season: league.season.as_ref().and_then(value_to_string),
                    round: league.round.clone(),
                },
                teams: Some(Teams {
                    home: item.teams.home.to_ref(),
                    away: item.teams.away.to_ref(),
                }),
                venue,
                status: Self::map_status(status_code),
                score: Score {
                    home: item.goals.home,
                    away: item.goals.away,
                    details: Self::score_details(&item.score),
                },
                sport_specific: SportSpecific::Football {
                    elapsed: item.fixture.status.elapsed,
                    referee: item.fixture.referee.clone(),
                    halftime: item.score.halftime,
                    fulltime: item.score.fulltime,
                    extratime: item.score.extratime,
                    penalty: item.score.penalty,
                },
            });
        }

        debug!(%date, fixtures = matches.len(), "Normalized football fixtures");

        Ok(Snapshot {
            sport: Sport::Football,
            date,
            source: PROVIDER.to_string(),
            fetched_at: Utc::now(),
            matches,
            indexes: index.build(),
        })
    }
}

#[async_trait]
impl SportAdapter for FootballAdapter {
    fn sport(&self) -> Sport {
        Sport::Football
    }

    fn source(&self) -> &str {
        PROVIDER
    }

    async fn fetch_raw(&self, date: NaiveDate) -> EngineResult<Value> {
        self.source.get_by_date("fixtures", date).await
    }

    fn normalize(&self, date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        Self::normalize_items(date, raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
