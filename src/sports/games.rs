//! Shared plumbing for the API-Sports family.
//!
//! Every API-Sports host answers `GET /{endpoint}?date=YYYY-MM-DD` with the
//! same envelope (`{ errors, results, response: [...] }`), authenticated by
//! the `x-apisports-key` header. Basketball, hockey, baseball, rugby,
//! handball and volleyball also share one "game" item shape; those sports
//! only differ in status codes and score layout, which they supply through
//! the `GameSport` trait.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use super::client::UpstreamClient;
use super::index::{slugify, IndexBuilder};
use crate::config::ApiSportsConfig;
use crate::types::{
    EngineError, EngineResult, Fixture, FixtureStatus, LeagueRef, PeriodScore, Score, ScorePair,
    Snapshot, Sport, SportSpecific, TeamRef, Teams,
};

pub const PROVIDER: &str = "api-sports";

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Authenticated access to one API-Sports host.
pub struct ApiSportsSource {
    client: UpstreamClient,
    base_url: String,
    api_key: Secret<String>,
}

impl ApiSportsSource {
    pub fn new(cfg: &ApiSportsConfig, sport: Sport) -> EngineResult<Self> {
        Ok(Self {
            client: UpstreamClient::new(PROVIDER, Duration::from_secs(cfg.timeout_secs))?,
            base_url: cfg.base_url(sport),
            api_key: cfg.api_key(),
        })
    }

    /// Fetch `{base}/{endpoint}?date=...` and check the body-level errors.
    pub async fn get_by_date(&self, endpoint: &str, date: NaiveDate) -> EngineResult<Value> {
        let mut key = HeaderValue::from_str(self.api_key.expose_secret()).map_err(|_| {
            EngineError::Config("API-Sports key contains invalid header characters".into())
        })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-apisports-key", key);

        let url = format!("{}/{}", self.base_url, endpoint);
        let params = [("date", date.format("%Y-%m-%d").to_string())];
        let raw = self.client.get_json(&url, &params, headers).await?;
        check_api_errors(&raw)?;
        Ok(raw)
    }
}

/// API-Sports reports quota and key problems with HTTP 200 and a non-empty
/// `errors` object.
pub fn check_api_errors(raw: &Value) -> EngineResult<()> {
    let errors = match raw.get("errors") {
        Some(Value::Object(map)) if !map.is_empty() => map,
        _ => return Ok(()),
    };

    let provider = PROVIDER.to_string();
    if errors.contains_key("requests") || errors.contains_key("rateLimit") {
        return Err(EngineError::UpstreamRateLimited { provider });
    }
    if errors.contains_key("token") {
        return Err(EngineError::UpstreamAuthFailed { provider, status: 401 });
    }
    Err(EngineError::MalformedPayload {
        provider,
        message: format!("upstream errors: {}", Value::Object(errors.clone())),
    })
}

/// Take the `response` array out of an envelope.
pub fn response_items(raw: Value) -> EngineResult<Vec<Value>> {
    match raw {
        Value::Object(mut map) => match map.remove("response") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(malformed("missing `response` array")),
        },
        _ => Err(malformed("payload is not a JSON object")),
    }
}

pub fn malformed(message: &str) -> EngineError {
    EngineError::MalformedPayload {
        provider: PROVIDER.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Game item shape (v1 hosts)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ApiGame {
    pub id: i64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub week: Option<Value>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub status: ApiStatus,
    pub league: ApiLeague,
    #[serde(default)]
    pub country: Option<ApiCountry>,
    pub teams: ApiTeams,
    #[serde(default)]
    pub scores: Value,
    #[serde(default)]
    pub periods: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub timer: Option<Value>,
}

impl ApiStatus {
    pub fn code(&self) -> &str {
        self.short.as_deref().unwrap_or("UNKNOWN")
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiLeague {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub season: Option<Value>,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCountry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeams {
    pub home: ApiTeam,
    pub away: ApiTeam,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeam {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

impl ApiTeam {
    pub fn to_ref(&self) -> TeamRef {
        TeamRef {
            id: self.id,
            name: self.name.clone(),
            logo: self.logo.clone(),
        }
    }
}

/// What a v1 sport contributes to the shared normalizer.
pub trait GameSport {
    const SPORT: Sport;

    /// Map an upstream short status code.
    fn map_status(code: &str) -> FixtureStatus;

    /// Headline score plus the sport's extension fields.
    fn extension(game: &ApiGame) -> (Score, SportSpecific);
}

/// Normalize a v1 `games` payload.
pub fn normalize_games<G: GameSport>(date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
    let items = response_items(raw)?;
    let mut index = IndexBuilder::new();
    let mut seen = HashSet::new();
    let mut matches = Vec::with_capacity(items.len());

    for item in items {
        let game: ApiGame = match serde_json::from_value(item) {
            Ok(g) => g,
            Err(e) => {
                warn!(sport = %G::SPORT, error = %e, "Skipping undecodable game");
                continue;
            }
        };

        let id = game.id.to_string();
        if !seen.insert(id.clone()) {
            debug!(sport = %G::SPORT, id = %id, "Duplicate game id, keeping first");
            continue;
        }

        let country = game.country.as_ref();
        let flag = country.and_then(|c| c.flag.clone());
        let (country_name, country_id) = index.observe(
            country.and_then(|c| c.name.as_deref()),
            flag.as_deref(),
            &game.league.name,
        );

        let (score, sport_specific) = G::extension(&game);

        matches.push(Fixture {
            id,
            date: kickoff(game.date.as_deref(), game.timestamp, date),
            league: LeagueRef {
                id: league_id(game.league.id, &game.league.name),
                name: game.league.name.clone(),
                country: country_name,
                country_id,
                logo: game.league.logo.clone(),
                flag,
                season: game.league.season.as_ref().and_then(value_to_string),
                round: game.week.as_ref().and_then(value_to_string),
            },
            teams: Some(Teams {
                home: game.teams.home.to_ref(),
                away: game.teams.away.to_ref(),
            }),
            venue: None,
            status: G::map_status(game.status.code()),
            score,
            sport_specific,
        });
    }

    debug!(sport = %G::SPORT, %date, fixtures = matches.len(), "Normalized games");

    Ok(Snapshot {
        sport: G::SPORT,
        date,
        source: PROVIDER.to_string(),
        fetched_at: Utc::now(),
        matches,
        indexes: index.build(),
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Status codes every API-Sports host uses the same way.
pub fn common_status(code: &str) -> Option<FixtureStatus> {
    match code {
        "NS" | "TBD" => Some(FixtureStatus::NotStarted),
        "LIVE" => Some(FixtureStatus::Live),
        "FT" => Some(FixtureStatus::Finished),
        "CANC" | "ABD" => Some(FixtureStatus::Cancelled),
        _ => None,
    }
}

pub fn league_id(id: Option<i64>, name: &str) -> String {
    id.map(|i| i.to_string()).unwrap_or_else(|| slugify(name))
}

/// Kick-off time: the unix timestamp if present, else the RFC 3339 date,
/// else midnight of the requested day.
pub fn kickoff(date: Option<&str>, timestamp: Option<i64>, fallback: NaiveDate) -> DateTime<Utc> {
    timestamp
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .or_else(|| {
            date.and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc))
        })
        .unwrap_or_else(|| fallback.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// A score that may arrive as a number, a numeric string or null.
pub fn score_number(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `{ "home": .., "away": .. }` → pair.
pub fn pair_of(v: &Value) -> ScorePair {
    ScorePair::new(score_number(&v["home"]), score_number(&v["away"]))
}

/// `"2-1"` → pair (hockey period strings).
pub fn dash_pair(v: &Value) -> ScorePair {
    let Some(s) = v.as_str() else {
        return ScorePair::default();
    };
    match s.split_once('-') {
        Some((h, a)) => ScorePair::new(h.trim().parse().ok(), a.trim().parse().ok()),
        None => ScorePair::default(),
    }
}

/// Collect labelled periods whose pair is not empty.
pub fn periods_from<F>(source: &Value, labels: &[&str], read: F) -> Vec<PeriodScore>
where
    F: Fn(&Value) -> ScorePair,
{
    labels
        .iter()
        .filter_map(|label| {
            let pair = read(&source[*label]);
            (!pair.is_empty()).then(|| PeriodScore {
                label: label.to_string(),
                home: pair.home,
                away: pair.away,
            })
        })
        .collect()
}

/// Compact "25-20, 30-28" line for `Score::details`.
pub fn period_summary(periods: &[PeriodScore]) -> Option<String> {
    if periods.is_empty() {
        return None;
    }
    let fmt = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string());
    Some(
        periods
            .iter()
            .map(|p| format!("{}-{}", fmt(p.home), fmt(p.away)))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

pub fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_api_errors_empty_array_ok() {
        assert!(check_api_errors(&json!({"errors": [], "response": []})).is_ok());
        assert!(check_api_errors(&json!({"errors": {}, "response": []})).is_ok());
    }

    #[test]
    fn test_check_api_errors_quota() {
        let raw = json!({"errors": {"requests": "You have reached the request limit for the day"}});
        assert!(matches!(
            check_api_errors(&raw),
            Err(EngineError::UpstreamRateLimited { .. })
        ));
    }

    #[test]
    fn test_check_api_errors_token() {
        let raw = json!({"errors": {"token": "Error/Missing application key"}});
        assert!(matches!(
            check_api_errors(&raw),
            Err(EngineError::UpstreamAuthFailed { .. })
        ));
    }

    #[test]
    fn test_response_items_requires_array() {
        assert!(response_items(json!({"response": [1, 2]})).unwrap().len() == 2);
        assert!(matches!(
            response_items(json!({"results": 0})),
            Err(EngineError::MalformedPayload { .. })
        ));
        assert!(response_items(json!([1, 2])).is_err());
    }

    #[test]
    fn test_kickoff_prefers_timestamp() {
        let fallback = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let k = kickoff(Some("2025-07-15T20:00:00+02:00"), Some(1752602400), fallback);
        assert_eq!(k.timestamp(), 1752602400);

        let k = kickoff(Some("2025-07-15T20:00:00+02:00"), None, fallback);
        assert_eq!(k.to_rfc3339(), "2025-07-15T18:00:00+00:00");

        let k = kickoff(None, None, fallback);
        assert_eq!(k.to_rfc3339(), "2025-07-15T00:00:00+00:00");
    }

    #[test]
    fn test_score_helpers() {
        assert_eq!(score_number(&json!(3)), Some(3));
        assert_eq!(score_number(&json!("12")), Some(12));
        assert_eq!(score_number(&Value::Null), None);
        assert_eq!(dash_pair(&json!("2-1")), ScorePair::new(Some(2), Some(1)));
        assert!(dash_pair(&Value::Null).is_empty());
        assert_eq!(pair_of(&json!({"home": 1, "away": null})), ScorePair::new(Some(1), None));
    }

    #[test]
    fn test_periods_skip_empty() {
        let src = json!({"first": {"home": 1, "away": 0}, "second": {"home": null, "away": null}});
        let periods = periods_from(&src, &["first", "second", "third"], pair_of);
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].label, "first");
    }
}
