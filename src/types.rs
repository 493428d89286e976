//! Shared types for the sportsfeed engine.
//!
//! These types form the normalized data model produced by every sport
//! adapter, persisted by the storage layer and served by the API. They
//! are deliberately sport-agnostic except for the `SportSpecific` union,
//! which carries the per-sport extension fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// Every sport the engine has an adapter for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Hockey,
    Baseball,
    Rugby,
    Handball,
    Volleyball,
    HorseRacing,
}

impl Sport {
    /// All known sports (useful for iteration).
    pub const ALL: &'static [Sport] = &[
        Sport::Football,
        Sport::Basketball,
        Sport::Hockey,
        Sport::Baseball,
        Sport::Rugby,
        Sport::Handball,
        Sport::Volleyball,
        Sport::HorseRacing,
    ];

    /// Stable identifier, used in storage keys and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Football => "football",
            Sport::Basketball => "basketball",
            Sport::Hockey => "hockey",
            Sport::Baseball => "baseball",
            Sport::Rugby => "rugby",
            Sport::Handball => "handball",
            Sport::Volleyball => "volleyball",
            Sport::HorseRacing => "horse_racing",
        }
    }

    pub fn is_racing(&self) -> bool {
        matches!(self, Sport::HorseRacing)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a sport identifier (case-insensitive, common aliases accepted).
impl std::str::FromStr for Sport {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "football" | "soccer" => Ok(Sport::Football),
            "basketball" => Ok(Sport::Basketball),
            "hockey" | "ice_hockey" => Ok(Sport::Hockey),
            "baseball" => Ok(Sport::Baseball),
            "rugby" => Ok(Sport::Rugby),
            "handball" => Ok(Sport::Handball),
            "volleyball" => Ok(Sport::Volleyball),
            "horse_racing" | "racing" | "pmu" => Ok(Sport::HorseRacing),
            _ => Err(EngineError::UnknownSport(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Fixture lifecycle
// ---------------------------------------------------------------------------

/// Canonical lifecycle state of a fixture.
///
/// Upstream codes the adapters don't recognise are kept verbatim in
/// `Other` so new codes never break normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FixtureStatus {
    NotStarted,
    Live,
    Finished,
    Cancelled,
    Other(String),
}

impl FixtureStatus {
    pub fn as_str(&self) -> &str {
        match self {
            FixtureStatus::NotStarted => "NOT_STARTED",
            FixtureStatus::Live => "LIVE",
            FixtureStatus::Finished => "FINISHED",
            FixtureStatus::Cancelled => "CANCELLED",
            FixtureStatus::Other(code) => code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FixtureStatus::Finished | FixtureStatus::Cancelled)
    }
}

impl From<String> for FixtureStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NOT_STARTED" => FixtureStatus::NotStarted,
            "LIVE" => FixtureStatus::Live,
            "FINISHED" => FixtureStatus::Finished,
            "CANCELLED" => FixtureStatus::Cancelled,
            _ => FixtureStatus::Other(s),
        }
    }
}

impl From<FixtureStatus> for String {
    fn from(status: FixtureStatus) -> Self {
        match status {
            FixtureStatus::Other(code) => code,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// A home/away pair of numbers. Either side may be unknown (not started).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    pub home: Option<i64>,
    pub away: Option<i64>,
}

impl ScorePair {
    pub fn new(home: Option<i64>, away: Option<i64>) -> Self {
        Self { home, away }
    }

    pub fn is_empty(&self) -> bool {
        self.home.is_none() && self.away.is_none()
    }
}

/// Score of one period, quarter, inning or set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodScore {
    pub label: String,
    pub home: Option<i64>,
    pub away: Option<i64>,
}

/// Headline score of a fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: Option<i64>,
    pub away: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    pub home: TeamRef,
    pub away: TeamRef,
}

/// League a fixture belongs to. `country_id` is the join key into the
/// snapshot's country index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueRef {
    pub id: String,
    pub name: String,
    pub country: String,
    pub country_id: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Race metadata carried by horse-racing fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceInfo {
    pub reunion: u32,
    pub race_number: u32,
    pub name: String,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub distance_m: Option<u32>,
    #[serde(default)]
    pub declared_runners: Option<u32>,
    #[serde(default)]
    pub prize_money: Option<f64>,
    #[serde(default)]
    pub arrival_order: Vec<u32>,
}

/// Per-sport extension fields, tagged by sport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sport", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SportSpecific {
    Football {
        elapsed: Option<u32>,
        referee: Option<String>,
        halftime: ScorePair,
        fulltime: ScorePair,
        extratime: ScorePair,
        penalty: ScorePair,
    },
    Basketball {
        quarters: Vec<PeriodScore>,
        overtime: Option<ScorePair>,
        timer: Option<String>,
        stage: Option<String>,
    },
    Hockey {
        periods: Vec<PeriodScore>,
        timer: Option<String>,
    },
    Baseball {
        innings: Vec<PeriodScore>,
        hits: ScorePair,
        errors: ScorePair,
    },
    Rugby {
        periods: Vec<PeriodScore>,
        week: Option<String>,
    },
    Handball {
        periods: Vec<PeriodScore>,
        week: Option<String>,
    },
    Volleyball {
        sets: Vec<PeriodScore>,
    },
    HorseRacing(RaceInfo),
}

impl SportSpecific {
    pub fn sport(&self) -> Sport {
        match self {
            SportSpecific::Football { .. } => Sport::Football,
            SportSpecific::Basketball { .. } => Sport::Basketball,
            SportSpecific::Hockey { .. } => Sport::Hockey,
            SportSpecific::Baseball { .. } => Sport::Baseball,
            SportSpecific::Rugby { .. } => Sport::Rugby,
            SportSpecific::Handball { .. } => Sport::Handball,
            SportSpecific::Volleyball { .. } => Sport::Volleyball,
            SportSpecific::HorseRacing(_) => Sport::HorseRacing,
        }
    }
}

/// One normalized match or race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    /// Upstream-stable identifier, unique within a snapshot.
    pub id: String,
    pub date: DateTime<Utc>,
    pub league: LeagueRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Teams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
    pub status: FixtureStatus,
    #[serde(default)]
    pub score: Score,
    pub sport_specific: SportSpecific,
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.teams {
            Some(t) => write!(
                f,
                "[{}] {} vs {} ({}, {})",
                self.id, t.home.name, t.away.name, self.league.name, self.status
            ),
            None => write!(f, "[{}] {} ({})", self.id, self.league.name, self.status),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
    pub flag: Option<String>,
}

/// Country and league indexes derived from a snapshot's fixtures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndexes {
    /// Sorted by display name.
    pub countries: Vec<Country>,
    /// countryId → alphabetically sorted distinct league names.
    pub leagues: BTreeMap<String, Vec<String>>,
}

/// The full normalized result for one (sport, date) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub sport: Sport,
    pub date: NaiveDate,
    /// Upstream the data came from (e.g. "api-sports", "pmu").
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub matches: Vec<Fixture>,
    pub indexes: SnapshotIndexes,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn find_fixture(&self, fixture_id: &str) -> Option<&Fixture> {
        self.matches.iter().find(|f| f.id == fixture_id)
    }
}

// ---------------------------------------------------------------------------
// Racing participants
// ---------------------------------------------------------------------------

/// A runner in one race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub race_id: String,
    /// Race-local runner number, unique within the race.
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub odds: Option<f64>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub jockey: Option<String>,
    #[serde(default)]
    pub trainer: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub non_runner: bool,
    /// Remaining upstream attributes, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Normalized field of one race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceField {
    pub race_id: String,
    /// Declared starters (non-runners excluded).
    pub total_runners: u32,
    pub participants: Vec<Participant>,
}

impl RaceField {
    /// Numbers of the runners actually starting.
    pub fn starter_numbers(&self) -> BTreeSet<u32> {
        self.participants
            .iter()
            .filter(|p| !p.non_runner)
            .map(|p| p.number)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Bet event types
// ---------------------------------------------------------------------------

/// Parimutuel bet types the builder knows how to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetEventType {
    SimplePlace,
    DeuxSurQuatreBase,
    QuinteBase,
    QuinteElargi,
}

impl BetEventType {
    pub const ALL: &'static [BetEventType] = &[
        BetEventType::SimplePlace,
        BetEventType::DeuxSurQuatreBase,
        BetEventType::QuinteBase,
        BetEventType::QuinteElargi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetEventType::SimplePlace => "simple_place",
            BetEventType::DeuxSurQuatreBase => "deux_sur_quatre_base",
            BetEventType::QuinteBase => "quinte_base",
            BetEventType::QuinteElargi => "quinte_elargi",
        }
    }
}

impl fmt::Display for BetEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BetEventType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BetEventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EngineError::InvalidBetFormula {
                event_type: s.to_string(),
                token: s.to_string(),
                reason: "unknown bet event type".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the engine.
///
/// `Clone` so a single upstream failure can be shared by every caller
/// waiting on the same in-flight fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Upstream rate limit hit ({provider})")]
    UpstreamRateLimited { provider: String },

    #[error("Upstream rejected credentials ({provider}): HTTP {status}")]
    UpstreamAuthFailed { provider: String, status: u16 },

    #[error("Upstream unreachable ({provider}): {message}")]
    UpstreamUnreachable { provider: String, message: String },

    #[error("Malformed upstream payload ({provider}): {message}")]
    MalformedPayload { provider: String, message: String },

    #[error("No cached snapshot for {sport}/{date}")]
    CacheMiss { sport: Sport, date: NaiveDate },

    #[error("Invalid {event_type} formula at '{token}': {reason}")]
    InvalidBetFormula {
        event_type: String,
        token: String,
        reason: String,
    },

    #[error("Unknown sport: {0}")]
    UnknownSport(String),

    #[error("Fixture {fixture_id} not found for {sport}")]
    FixtureNotFound { sport: Sport, fixture_id: String },

    #[error("Race not found: {race_id}")]
    RaceNotFound { race_id: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Shorthand used by the bet builders.
    pub fn invalid_formula(
        event_type: BetEventType,
        token: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::InvalidBetFormula {
            event_type: event_type.as_str().to_string(),
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Errors worth retrying later (the caller decides when).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::UpstreamRateLimited { .. } | EngineError::UpstreamUnreachable { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_from_str() {
        assert_eq!("football".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!("SOCCER".parse::<Sport>().unwrap(), Sport::Football);
        assert_eq!("ice-hockey".parse::<Sport>().unwrap(), Sport::Hockey);
        assert_eq!("horse-racing".parse::<Sport>().unwrap(), Sport::HorseRacing);
        assert!(matches!(
            "curling".parse::<Sport>(),
            Err(EngineError::UnknownSport(_))
        ));
    }

    #[test]
    fn test_sport_display_matches_as_str() {
        for sport in Sport::ALL {
            assert_eq!(sport.to_string(), sport.as_str());
            assert_eq!(sport.as_str().parse::<Sport>().unwrap(), *sport);
        }
    }

    #[test]
    fn test_status_serializes_canonical_codes() {
        assert_eq!(
            serde_json::to_string(&FixtureStatus::NotStarted).unwrap(),
            "\"NOT_STARTED\""
        );
        let live: FixtureStatus = serde_json::from_str("\"LIVE\"").unwrap();
        assert_eq!(live, FixtureStatus::Live);
    }

    #[test]
    fn test_status_passes_unknown_codes_through() {
        let status: FixtureStatus = serde_json::from_str("\"SUSP\"").unwrap();
        assert_eq!(status, FixtureStatus::Other("SUSP".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"SUSP\"");
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_sport_specific_is_tagged_by_sport() {
        let ext = SportSpecific::Hockey {
            periods: vec![],
            timer: Some("12".into()),
        };
        let json = serde_json::to_value(&ext).unwrap();
        assert_eq!(json["sport"], "hockey");
        assert_eq!(json["timer"], "12");
        assert_eq!(ext.sport(), Sport::Hockey);

        let race = SportSpecific::HorseRacing(RaceInfo {
            reunion: 1,
            race_number: 3,
            name: "PRIX D'AMERIQUE".into(),
            discipline: Some("ATTELE".into()),
            distance_m: Some(2700),
            declared_runners: Some(18),
            prize_money: None,
            arrival_order: vec![],
        });
        let json = serde_json::to_value(&race).unwrap();
        assert_eq!(json["sport"], "horse_racing");
        assert_eq!(json["raceNumber"], 3);
    }

    #[test]
    fn test_bet_event_type_from_str() {
        assert_eq!(
            "quinte_elargi".parse::<BetEventType>().unwrap(),
            BetEventType::QuinteElargi
        );
        assert!("tierce".parse::<BetEventType>().is_err());
    }

    #[test]
    fn test_transient_errors() {
        assert!(EngineError::UpstreamRateLimited { provider: "x".into() }.is_transient());
        assert!(!EngineError::UpstreamAuthFailed { provider: "x".into(), status: 401 }.is_transient());
    }

    #[test]
    fn test_starter_numbers_skip_non_runners() {
        let mk = |n: u32, nr: bool| Participant {
            race_id: "R1C1".into(),
            number: n,
            name: format!("Horse {n}"),
            odds: None,
            form: None,
            jockey: None,
            trainer: None,
            age: None,
            sex: None,
            non_runner: nr,
            attributes: serde_json::Map::new(),
        };
        let field = RaceField {
            race_id: "R1C1".into(),
            total_runners: 2,
            participants: vec![mk(1, false), mk(2, true), mk(3, false)],
        };
        let starters: Vec<u32> = field.starter_numbers().into_iter().collect();
        assert_eq!(starters, vec![1, 3]);
    }
}
