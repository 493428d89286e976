//! Horse racing adapter (PMU "turfinfo" programme API).
//!
//! API: `{base}/programme/{ddMMyyyy}` for the day's meetings (réunions)
//! and races (courses), `{base}/programme/{ddMMyyyy}/R{n}/C{m}/participants`
//! for one race's field. No authentication.
//!
//! Races are identified by `R{réunion}C{course}`; the `R{n}` prefix is
//! the meeting, i.e. one venue on that day.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::client::UpstreamClient;
use super::index::IndexBuilder;
use super::SportAdapter;
use crate::config::PmuConfig;
use crate::types::{
    EngineError, EngineResult, Fixture, FixtureStatus, LeagueRef, Participant, RaceField,
    RaceInfo, Score, Snapshot, Sport, SportSpecific, Venue,
};

pub const PROVIDER: &str = "pmu";

/// Participant keys consumed into typed fields; everything else is kept
/// in `Participant::attributes`.
const CONSUMED_KEYS: &[&str] = &[
    "nom",
    "numPmu",
    "age",
    "sexe",
    "statut",
    "driver",
    "jockey",
    "entraineur",
    "musique",
    "dernierRapportDirect",
];

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PmuReunion {
    num_officiel: u32,
    #[serde(default)]
    hippodrome: Option<PmuHippodrome>,
    #[serde(default)]
    pays: Option<PmuPays>,
    #[serde(default)]
    courses: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PmuHippodrome {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    libelle_court: Option<String>,
    #[serde(default)]
    libelle_long: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PmuPays {
    #[serde(default)]
    libelle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PmuCourse {
    num_ordre: u32,
    #[serde(default)]
    libelle: Option<String>,
    #[serde(default)]
    heure_depart: Option<i64>,
    #[serde(default)]
    distance: Option<u32>,
    #[serde(default)]
    discipline: Option<String>,
    #[serde(default)]
    nombre_declares_partants: Option<u32>,
    #[serde(default)]
    montant_prix: Option<f64>,
    #[serde(default)]
    statut: Option<String>,
    #[serde(default)]
    categorie_statut: Option<String>,
    #[serde(default)]
    ordre_arrivee: Vec<Vec<u32>>,
}

/// Races of one meeting, as served to clients browsing a day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueRaces {
    /// `R{n}` prefix shared by the meeting's race ids.
    pub key: String,
    pub reunion: u32,
    pub venue: String,
    pub country: String,
    pub races: Vec<Fixture>,
}

// ---------------------------------------------------------------------------
// Race ids
// ---------------------------------------------------------------------------

/// Parse `R1C3` (case-insensitive) into `(1, 3)`.
pub fn parse_race_id(race_id: &str) -> Option<(u32, u32)> {
    let upper = race_id.trim().to_uppercase();
    let rest = upper.strip_prefix('R')?;
    let (reunion, course) = rest.split_once('C')?;
    let reunion: u32 = reunion.parse().ok()?;
    let course: u32 = course.parse().ok()?;
    (reunion > 0 && course > 0).then_some((reunion, course))
}

pub fn format_race_id(reunion: u32, course: u32) -> String {
    format!("R{reunion}C{course}")
}

/// The meeting prefix (`R1`) of a race fixture id.
pub fn venue_key(fixture_id: &str) -> Option<String> {
    parse_race_id(fixture_id).map(|(reunion, _)| format!("R{reunion}"))
}

/// Group a racing snapshot's fixtures by meeting, in meeting order.
pub fn group_by_venue(snapshot: &Snapshot) -> Vec<VenueRaces> {
    let mut groups: BTreeMap<u32, VenueRaces> = BTreeMap::new();

    for fixture in &snapshot.matches {
        let Some((reunion, _)) = parse_race_id(&fixture.id) else {
            debug!(id = %fixture.id, "Fixture id has no meeting prefix, skipping");
            continue;
        };
        let group = groups.entry(reunion).or_insert_with(|| VenueRaces {
            key: format!("R{reunion}"),
            reunion,
            venue: fixture
                .venue
                .as_ref()
                .map(|v| v.name.clone())
                .unwrap_or_else(|| fixture.league.name.clone()),
            country: fixture.league.country.clone(),
            races: Vec::new(),
        });
        group.races.push(fixture.clone());
    }

    groups
        .into_values()
        .map(|mut g| {
            g.races
                .sort_by_key(|f| parse_race_id(&f.id).map(|(_, c)| c).unwrap_or(u32::MAX));
            g
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct HorseRacingAdapter {
    client: UpstreamClient,
    base_url: String,
}

impl HorseRacingAdapter {
    pub fn new(cfg: &PmuConfig) -> EngineResult<Self> {
        Ok(Self {
            client: UpstreamClient::new(PROVIDER, Duration::from_secs(cfg.timeout_secs))?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn programme_url(&self, date: NaiveDate) -> String {
        format!("{}/programme/{}", self.base_url, date.format("%d%m%Y"))
    }

    /// Fetch the raw participant list of one race. `RaceNotFound` when
    /// the id is malformed or PMU has nothing for it.
    pub async fn fetch_participants(&self, date: NaiveDate, race_id: &str) -> EngineResult<Value> {
        let (reunion, course) = parse_race_id(race_id).ok_or_else(|| EngineError::RaceNotFound {
            race_id: race_id.to_string(),
        })?;
        let url = format!("{}/R{reunion}/C{course}/participants", self.programme_url(date));
        self.client
            .get_json_opt(&url, &[], HeaderMap::new())
            .await?
            .ok_or_else(|| EngineError::RaceNotFound {
                race_id: format_race_id(reunion, course),
            })
    }

    /// Turn a raw participant list into a race field.
    pub fn normalize_participants(race_id: &str, raw: Value) -> EngineResult<RaceField> {
        let race_id = parse_race_id(race_id)
            .map(|(r, c)| format_race_id(r, c))
            .ok_or_else(|| EngineError::RaceNotFound {
                race_id: race_id.to_string(),
            })?;

        let items = match raw {
            Value::Object(mut map) => match map.remove("participants") {
                Some(Value::Array(items)) => items,
                _ => return Err(malformed("missing `participants` array")),
            },
            _ => return Err(malformed("participants payload is not a JSON object")),
        };

        let mut seen = HashSet::new();
        let mut participants = Vec::with_capacity(items.len());

        for item in items {
            let Value::Object(mut map) = item else {
                return Err(malformed("participant is not a JSON object"));
            };
            let number = map
                .get("numPmu")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| malformed("participant without `numPmu`"))?;
            if !seen.insert(number) {
                return Err(malformed(&format!("runner number {number} listed twice")));
            }
            let name = map
                .get("nom")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| malformed(&format!("runner {number} without `nom`")))?;

            let odds = rapport(&map, "dernierRapportDirect")
                .or_else(|| rapport(&map, "dernierRapportReference"));
            let str_field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

            let participant = Participant {
                race_id: race_id.clone(),
                number,
                name,
                odds,
                form: str_field("musique"),
                jockey: str_field("jockey").or_else(|| str_field("driver")),
                trainer: str_field("entraineur"),
                age: map.get("age").and_then(Value::as_u64).map(|a| a as u32),
                sex: str_field("sexe"),
                non_runner: map.get("statut").and_then(Value::as_str) == Some("NON_PARTANT"),
                attributes: Map::new(),
            };

            for key in CONSUMED_KEYS {
                map.remove(*key);
            }
            participants.push(Participant {
                attributes: map,
                ..participant
            });
        }

        participants.sort_by_key(|p| p.number);
        let total_runners = participants.iter().filter(|p| !p.non_runner).count() as u32;

        Ok(RaceField {
            race_id,
            total_runners,
            participants,
        })
    }

    /// Fetch and normalize one race's field.
    pub async fn fetch_race_field(&self, date: NaiveDate, race_id: &str) -> EngineResult<RaceField> {
        let raw = self.fetch_participants(date, race_id).await?;
        let field = Self::normalize_participants(race_id, raw)?;
        info!(
            race_id = %field.race_id,
            %date,
            runners = field.total_runners,
            "Race field loaded"
        );
        Ok(field)
    }

    fn map_status(categorie: Option<&str>, statut: Option<&str>) -> FixtureStatus {
        match categorie.or(statut).unwrap_or("UNKNOWN") {
            "A_PARTIR" | "PROGRAMMEE" => FixtureStatus::NotStarted,
            "EN_COURS" | "COURSE_EN_COURS" => FixtureStatus::Live,
            "ARRIVEE" | "ARRIVEE_DEFINITIVE" | "FIN_COURSE" => FixtureStatus::Finished,
            "ANNULEE" | "COURSE_ANNULEE" => FixtureStatus::Cancelled,
            other => FixtureStatus::Other(other.to_string()),
        }
    }

    fn normalize_programme(date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        let reunions = match raw.get("programme").and_then(|p| p.get("reunions")) {
            Some(Value::Array(items)) => items.clone(),
            _ => return Err(malformed("missing `programme.reunions` array")),
        };

        let mut index = IndexBuilder::new();
        let mut matches = Vec::new();

        for item in reunions {
            let reunion: PmuReunion = match serde_json::from_value(item) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable meeting");
                    continue;
                }
            };

            let hippodrome = reunion.hippodrome.as_ref();
            let short_name = hippodrome
                .and_then(|h| h.libelle_court.clone())
                .unwrap_or_else(|| format!("Réunion {}", reunion.num_officiel));
            let (country_name, country_id) = index.observe(
                reunion.pays.as_ref().and_then(|p| p.libelle.as_deref()),
                None,
                &short_name,
            );
            let venue = Venue {
                id: hippodrome.and_then(|h| h.code.clone()),
                name: hippodrome
                    .and_then(|h| h.libelle_long.clone())
                    .unwrap_or_else(|| short_name.clone()),
                city: None,
            };

            for raw_course in reunion.courses {
                let course: PmuCourse = match serde_json::from_value(raw_course) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(reunion = reunion.num_officiel, error = %e, "Skipping undecodable race");
                        continue;
                    }
                };

                matches.push(Fixture {
                    id: format_race_id(reunion.num_officiel, course.num_ordre),
                    date: start_time(course.heure_depart, date),
                    league: LeagueRef {
                        id: format!("R{}", reunion.num_officiel),
                        name: short_name.clone(),
                        country: country_name.clone(),
                        country_id: country_id.clone(),
                        logo: None,
                        flag: None,
                        season: None,
                        round: None,
                    },
                    teams: None,
                    venue: Some(venue.clone()),
                    status: Self::map_status(
                        course.categorie_statut.as_deref(),
                        course.statut.as_deref(),
                    ),
                    score: Score::default(),
                    sport_specific: SportSpecific::HorseRacing(RaceInfo {
                        reunion: reunion.num_officiel,
                        race_number: course.num_ordre,
                        name: course
                            .libelle
                            .unwrap_or_else(|| format!("Course {}", course.num_ordre)),
                        discipline: course.discipline,
                        distance_m: course.distance,
                        declared_runners: course.nombre_declares_partants,
                        prize_money: course.montant_prix,
                        arrival_order: course.ordre_arrivee.into_iter().flatten().collect(),
                    }),
                });
            }
        }

        debug!(%date, races = matches.len(), "Normalized racing programme");

        Ok(Snapshot {
            sport: Sport::HorseRacing,
            date,
            source: PROVIDER.to_string(),
            fetched_at: Utc::now(),
            matches,
            indexes: index.build(),
        })
    }
}

#[async_trait]
impl SportAdapter for HorseRacingAdapter {
    fn sport(&self) -> Sport {
        Sport::HorseRacing
    }

    fn source(&self) -> &str {
        PROVIDER
    }

    async fn fetch_raw(&self, date: NaiveDate) -> EngineResult<Value> {
        self.client
            .get_json(&self.programme_url(date), &[], HeaderMap::new())
            .await
    }

    fn normalize(&self, date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        Self::normalize_programme(date, raw)
    }
}

fn malformed(message: &str) -> EngineError {
    EngineError::MalformedPayload {
        provider: PROVIDER.to_string(),
        message: message.to_string(),
    }
}

fn rapport(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key)?.get("rapport")?.as_f64()
}

/// PMU start times are epoch milliseconds.
fn start_time(heure_depart: Option<i64>, fallback: NaiveDate) -> DateTime<Utc> {
    heure_depart
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(|| fallback.and_time(chrono::NaiveTime::MIN).and_utc())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
