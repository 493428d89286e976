//! Mock upstream for integration testing.
//!
//! Serves canned raw payloads per date and hands normalization to a real
//! adapter, so the whole fetch → normalize → store path runs without
//! network access. Failures, latency and call counts are controllable
//! from test code.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sportsfeed::sports::SportAdapter;
use sportsfeed::types::{EngineError, EngineResult, Snapshot, Sport};

pub struct MockAdapter {
    inner: Arc<dyn SportAdapter>,
    payloads: Mutex<HashMap<NaiveDate, Value>>,
    /// If set, every fetch returns this error.
    force_error: Mutex<Option<EngineError>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl MockAdapter {
    pub fn wrapping(inner: Arc<dyn SportAdapter>) -> Self {
        Self {
            inner,
            payloads: Mutex::new(HashMap::new()),
            force_error: Mutex::new(None),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn serve(&self, date: NaiveDate, raw: Value) {
        self.payloads.lock().unwrap().insert(date, raw);
    }

    pub fn fail_with(&self, error: Option<EngineError>) {
        *self.force_error.lock().unwrap() = error;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SportAdapter for MockAdapter {
    fn sport(&self) -> Sport {
        self.inner.sport()
    }

    fn source(&self) -> &str {
        self.inner.source()
    }

    async fn fetch_raw(&self, date: NaiveDate) -> EngineResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(e) = self.force_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self
            .payloads
            .lock()
            .unwrap()
            .get(&date)
            .cloned()
            .unwrap_or_else(|| json!({ "response": [] })))
    }

    fn normalize(&self, date: NaiveDate, raw: Value) -> EngineResult<Snapshot> {
        self.inner.normalize(date, raw)
    }
}

// ---------------------------------------------------------------------------
// Canned payloads
// ---------------------------------------------------------------------------

/// One API-Football v3 fixture.
pub fn football_fixture(id: i64, country: Option<&str>, league: &str, status: &str) -> Value {
    json!({
        "fixture": {
            "id": id,
            "referee": null,
            "date": "2025-07-15T19:00:00+00:00",
            "timestamp": 1752606000,
            "venue": {"id": 556, "name": "Old Trafford", "city": "Manchester"},
            "status": {"long": "Match", "short": status, "elapsed": null}
        },
        "league": {
            "id": 39,
            "name": league,
            "country": country,
            "flag": null,
            "season": 2025,
            "round": "Regular Season - 1"
        },
        "teams": {
            "home": {"id": 33, "name": "Manchester United"},
            "away": {"id": 40, "name": "Liverpool"}
        },
        "goals": {"home": null, "away": null},
        "score": {}
    })
}

pub fn football_response(fixtures: Vec<Value>) -> Value {
    json!({ "errors": [], "results": fixtures.len(), "response": fixtures })
}

/// A PMU programme with two meetings.
pub fn pmu_programme() -> Value {
    json!({
        "programme": {
            "reunions": [
                {
                    "numOfficiel": 1,
                    "hippodrome": {"code": "VIN", "libelleCourt": "VINCENNES", "libelleLong": "HIPPODROME DE PARIS-VINCENNES"},
                    "pays": {"code": "FRA", "libelle": "FRANCE"},
                    "courses": [
                        {"numOrdre": 3, "libelle": "PRIX DE BELGIQUE", "heureDepart": 1752591600000i64, "nombreDeclaresPartants": 14, "categorieStatut": "A_PARTIR"},
                        {"numOrdre": 1, "libelle": "PRIX DE LYON", "heureDepart": 1752584400000i64, "nombreDeclaresPartants": 9, "categorieStatut": "ARRIVEE", "ordreArrivee": [[4], [1], [7]]}
                    ]
                },
                {
                    "numOfficiel": 4,
                    "hippodrome": {"code": "SOL", "libelleCourt": "SOLVALLA", "libelleLong": "SOLVALLA"},
                    "pays": {"code": "SUE", "libelle": "SUEDE"},
                    "courses": [
                        {"numOrdre": 1, "libelle": "ELITLOPPET", "nombreDeclaresPartants": 12, "categorieStatut": "EN_COURS"}
                    ]
                }
            ]
        }
    })
}

/// PMU participants for a race of `runners` horses.
pub fn pmu_participants(runners: u32, non_runners: &[u32]) -> Value {
    let participants: Vec<Value> = (1..=runners)
        .map(|n| {
            json!({
                "nom": format!("CHEVAL {n}"),
                "numPmu": n,
                "age": 6,
                "sexe": "HONGRES",
                "statut": if non_runners.contains(&n) { "NON_PARTANT" } else { "PARTANT" },
                "driver": "D. LOCQUENEUX",
                "entraineur": "J-M. BAZIRE",
                "musique": "1a2aDa",
                "dernierRapportDirect": {"rapport": 2.0 + n as f64}
            })
        })
        .collect();
    json!({ "participants": participants })
}
