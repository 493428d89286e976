//! End-to-end pipeline tests: canned upstream payloads flow through the
//! real normalizers, the file store and the aggregator.

use chrono::NaiveDate;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use sportsfeed::betting::{build_event, generate_horse_events};
use sportsfeed::config::{ApiSportsConfig, EngineConfig, PmuConfig};
use sportsfeed::engine::Aggregator;
use sportsfeed::sports::football::FootballAdapter;
use sportsfeed::sports::horse_racing::{group_by_venue, HorseRacingAdapter};
use sportsfeed::sports::AdapterRegistry;
use sportsfeed::storage::{FileStorage, SnapshotStorage};
use sportsfeed::types::{BetEventType, EngineError, FixtureStatus, Sport};

use crate::mock_adapter::{
    football_fixture, football_response, pmu_participants, pmu_programme, MockAdapter,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("sportsfeed_it_{}", uuid::Uuid::new_v4()))
}

fn football_mock() -> MockAdapter {
    let inner = FootballAdapter::new(&ApiSportsConfig::default()).unwrap();
    MockAdapter::wrapping(Arc::new(inner))
}

fn harness(mock: Arc<MockAdapter>, settings: EngineConfig) -> (Aggregator, PathBuf) {
    let root = temp_root();
    let mut registry = AdapterRegistry::empty();
    registry.insert(mock);
    let aggregator = Aggregator::new(
        Arc::new(registry),
        Arc::new(FileStorage::new(&root)),
        settings,
    );
    (aggregator, root)
}

#[tokio::test]
async fn test_find_fixture_by_id_hit_and_miss() {
    let mock = Arc::new(football_mock());
    mock.serve(
        day(15),
        football_response(vec![
            football_fixture(123, Some("England"), "Premier League", "NS"),
            football_fixture(124, Some("England"), "Premier League", "FT"),
        ]),
    );
    let (agg, root) = harness(mock.clone(), EngineConfig::default());

    let fixture = assert_ok!(
        agg.find_fixture_by_id(Sport::Football, "123", Some(day(15)), false)
            .await
    );
    assert_eq!(fixture.id, "123");
    assert_eq!(fixture.status, FixtureStatus::NotStarted);

    let err = assert_err!(
        agg.find_fixture_by_id(Sport::Football, "999", Some(day(15)), false)
            .await
    );
    assert_eq!(
        err,
        EngineError::FixtureNotFound {
            sport: Sport::Football,
            fixture_id: "999".into()
        }
    );
    // Both lookups were served by the one stored snapshot.
    assert_eq!(mock.calls(), 1);

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() {
    let mock = Arc::new(football_mock().with_latency(Duration::from_millis(100)));
    mock.serve(
        day(15),
        football_response(vec![football_fixture(1, Some("Spain"), "La Liga", "NS")]),
    );
    let (agg, root) = harness(mock.clone(), EngineConfig::default());

    let results = join_all((0..8).map(|_| agg.get_snapshot(Sport::Football, day(15), false))).await;

    assert_eq!(mock.calls(), 1);
    let first = results[0].as_ref().unwrap();
    for r in &results {
        assert_eq!(r.as_ref().unwrap(), first);
    }

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_forced_refresh_failure_serves_cache() {
    let mock = Arc::new(football_mock());
    mock.serve(
        day(15),
        football_response(vec![football_fixture(123, Some("England"), "Premier League", "NS")]),
    );
    let (agg, root) = harness(mock.clone(), EngineConfig::default());

    let cached = assert_ok!(agg.get_snapshot(Sport::Football, day(15), false).await);

    mock.fail_with(Some(EngineError::UpstreamAuthFailed {
        provider: "api-sports".into(),
        status: 403,
    }));
    let served = assert_ok!(agg.get_snapshot(Sport::Football, day(15), true).await);
    assert_eq!(served, cached);
    assert_eq!(mock.calls(), 2);

    // Nothing cached for another date: the upstream error surfaces.
    let err = assert_err!(agg.get_snapshot(Sport::Football, day(16), false).await);
    assert!(matches!(err, EngineError::UpstreamAuthFailed { status: 403, .. }));

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_scan_skips_unreadable_dates() {
    let mock = Arc::new(football_mock());
    mock.serve(
        day(14),
        football_response(vec![football_fixture(1, Some("Italy"), "Serie A", "FT")]),
    );
    mock.serve(
        day(16),
        football_response(vec![football_fixture(777, Some("Italy"), "Serie A", "NS")]),
    );
    let (agg, root) = harness(mock.clone(), EngineConfig::default());

    assert_ok!(agg.get_snapshot(Sport::Football, day(14), false).await);
    assert_ok!(agg.get_snapshot(Sport::Football, day(16), false).await);
    std::fs::write(root.join("football").join("2025-07-15.json"), "{ not json").unwrap();

    assert_eq!(
        assert_ok!(agg.list_dates(Sport::Football).await),
        vec![day(14), day(15), day(16)]
    );

    let found = assert_ok!(
        agg.find_fixture_by_id(Sport::Football, "777", None, false)
            .await
    );
    assert_eq!(found.id, "777");

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_snapshot_on_disk_with_complete_indexes() {
    let mock = Arc::new(football_mock());
    mock.serve(
        day(15),
        football_response(vec![
            football_fixture(10, Some("Saudi Arabia"), "Pro League", "NS"),
            football_fixture(11, Some("England"), "Premier League", "NS"),
            football_fixture(12, None, "Club Friendlies", "NS"),
            football_fixture(13, Some("England"), "Championship", "PST"),
        ]),
    );
    let (agg, root) = harness(mock, EngineConfig::default());

    let snapshot = assert_ok!(agg.get_snapshot(Sport::Football, day(15), false).await);

    let names: Vec<&str> = snapshot
        .indexes
        .countries
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["England", "Saudi Arabia", "World"]);
    assert_eq!(
        snapshot.indexes.leagues["england"],
        vec!["Championship", "Premier League"]
    );
    for fixture in &snapshot.matches {
        let matching = snapshot
            .indexes
            .countries
            .iter()
            .filter(|c| c.id == fixture.league.country_id)
            .count();
        assert_eq!(matching, 1);
    }

    let store = FileStorage::new(&root);
    let reloaded = assert_ok!(store.load(Sport::Football, day(15)).await);
    assert_eq!(reloaded, snapshot);

    let raw: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(root.join("football").join("2025-07-15.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(raw["sport"], "football");
    assert_eq!(raw["matches"][0]["league"]["countryId"], "saudi-arabia");
    assert_eq!(raw["matches"][0]["sportSpecific"]["sport"], "football");

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_racing_programme_to_bet_slip() {
    let racing = HorseRacingAdapter::new(&PmuConfig::default()).unwrap();
    let mock = Arc::new(MockAdapter::wrapping(Arc::new(racing)));
    mock.serve(day(15), pmu_programme());
    let (agg, root) = harness(mock, EngineConfig::default());

    let snapshot = assert_ok!(agg.get_snapshot(Sport::HorseRacing, day(15), false).await);
    assert_eq!(snapshot.source, "pmu");
    let venues = group_by_venue(&snapshot);
    let keys: Vec<&str> = venues.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["R1", "R4"]);
    let r1: Vec<&str> = venues[0].races.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(r1, vec!["R1C1", "R1C3"]);
    assert_eq!(venues[1].country, "SUEDE");

    let field = assert_ok!(HorseRacingAdapter::normalize_participants(
        "R1C3",
        pmu_participants(14, &[])
    ));
    assert_eq!(field.total_runners, 14);
    let event = assert_ok!(build_event(BetEventType::DeuxSurQuatreBase, &field, "14x 5-9"));
    assert_eq!(event.pmu_compliant.combinations, 2);
    assert_eq!(event.pmu_compliant.total_cost, rust_decimal_macros::dec!(6.00));

    // Two scratched horses take a 9-horse field under the quinté gate.
    let small = assert_ok!(HorseRacingAdapter::normalize_participants(
        "R1C1",
        pmu_participants(9, &[2, 3])
    ));
    assert_eq!(small.total_runners, 7);
    let offered = generate_horse_events(small.total_runners, &small.race_id);
    assert_eq!(offered.iter().filter(|e| e.available).count(), 1);
    assert_err!(build_event(BetEventType::QuinteElargi, &small, "1-4-5-6-7"));

    std::fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_abandoned_request_still_completes_fetch() {
    let mock = Arc::new(football_mock().with_latency(Duration::from_millis(50)));
    mock.serve(
        day(15),
        football_response(vec![football_fixture(123, Some("England"), "Premier League", "NS")]),
    );
    let (agg, root) = harness(mock.clone(), EngineConfig::default());

    // The caller gives up long before upstream answers.
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        agg.get_snapshot(Sport::Football, day(15), false),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let store = FileStorage::new(&root);
    assert!(assert_ok!(store.exists(Sport::Football, day(15)).await));

    // Served from disk: no second upstream call.
    let snapshot = assert_ok!(agg.get_snapshot(Sport::Football, day(15), false).await);
    assert_eq!(snapshot.matches[0].id, "123");
    assert_eq!(mock.calls(), 1);

    std::fs::remove_dir_all(&root).unwrap();
}
