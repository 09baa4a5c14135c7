//! Session summary allocation tests.

use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use telemetry_core::{
    config::GeneratorConfig,
    error::GenError,
    rng::GenRng,
    store::{TelemetryStore, FACT_SESSION, STAGE_SCHEMA},
    summarizer::{summarize_session, SessionSummarizer},
};

fn store() -> TelemetryStore {
    let store = TelemetryStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn players(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("p{i}")).collect()
}

fn maps(ids: &[String]) -> (HashMap<String, i64>, HashMap<String, String>) {
    let countries = ["US", "DE", "JP", "BR"];
    let durations = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), 600 + i as i64 * 60))
        .collect();
    let country_map = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), countries[i % countries.len()].to_string()))
        .collect();
    (durations, country_map)
}

#[test]
fn kills_and_deaths_sum_to_session_totals() {
    let store = store();
    let end = Utc.with_ymd_and_hms(2025, 8, 8, 18, 30, 0).unwrap();
    let mut rng = GenRng::seeded(1234);

    for (round, n) in [1usize, 2, 5, 12].into_iter().enumerate() {
        let ids = players(n);
        let (durations, countries) = maps(&ids);
        let session_id = format!("sess-{round}");

        let summary =
            summarize_session(&ids, &session_id, end, &durations, &countries, &store, &mut rng)
                .unwrap();

        assert!((10..60).contains(&summary.total_kills), "total {}", summary.total_kills);
        assert_eq!(summary.total_deaths, summary.total_kills);
        assert_eq!(summary.rows.len(), n);
        assert_eq!(summary.rows.iter().map(|r| r.kills).sum::<u32>(), summary.total_kills);
        assert_eq!(summary.rows.iter().map(|r| r.deaths).sum::<u32>(), summary.total_deaths);

        for row in &summary.rows {
            assert_eq!(row.country, countries[&row.player_id]);
            assert_eq!(row.event_length_seconds, durations[&row.player_id]);
            assert_eq!(row.session_id, session_id);
        }

        let (kills, deaths) = store.session_totals(&session_id).unwrap();
        assert_eq!(kills, summary.total_kills as i64);
        assert_eq!(deaths, summary.total_deaths as i64);
        assert_eq!(store.fact_session_rows(&session_id).unwrap(), summary.rows);
    }
}

#[test]
fn rows_keep_player_order() {
    let store = store();
    let ids = players(6);
    let (durations, countries) = maps(&ids);
    let mut rng = GenRng::seeded(3);

    let summary = summarize_session(
        &ids,
        "ordered",
        Utc::now(),
        &durations,
        &countries,
        &store,
        &mut rng,
    )
    .unwrap();

    let got: Vec<_> = summary.rows.iter().map(|r| r.player_id.clone()).collect();
    assert_eq!(got, ids);
}

#[test]
fn missing_duration_fails_before_writing() {
    let store = store();
    let ids = players(3);
    let (mut durations, countries) = maps(&ids);
    durations.remove("p2");
    let mut rng = GenRng::seeded(1);

    let err = summarize_session(&ids, "s", Utc::now(), &durations, &countries, &store, &mut rng)
        .unwrap_err();

    match err {
        GenError::MissingMapping { mapping, player_id } => {
            assert_eq!(mapping, "durations");
            assert_eq!(player_id, "p2");
        }
        other => panic!("expected MissingMapping, got {other:?}"),
    }
    assert_eq!(store.row_count(STAGE_SCHEMA, FACT_SESSION).unwrap(), 0);
}

#[test]
fn missing_country_fails_before_writing() {
    let store = store();
    let ids = players(2);
    let (durations, mut countries) = maps(&ids);
    countries.remove("p1");
    let mut rng = GenRng::seeded(1);

    let err = summarize_session(&ids, "s", Utc::now(), &durations, &countries, &store, &mut rng)
        .unwrap_err();

    assert!(matches!(err, GenError::MissingMapping { mapping: "country_map", .. }));
    assert_eq!(store.row_count(STAGE_SCHEMA, FACT_SESSION).unwrap(), 0);
}

#[test]
fn empty_session_is_rejected() {
    let store = store();
    let mut rng = GenRng::seeded(1);
    let err = summarize_session(
        &[],
        "empty",
        Utc::now(),
        &HashMap::new(),
        &HashMap::new(),
        &store,
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, GenError::Validation(_)));
}

#[test]
fn configured_kill_range_is_respected() {
    let store = store();
    let config = GeneratorConfig {
        kills_min: 100,
        kills_max: 101,
        ..GeneratorConfig::default()
    };
    let summarizer = SessionSummarizer::new(&config);
    let ids = players(4);
    let (durations, countries) = maps(&ids);
    let mut rng = GenRng::seeded(8);

    let summary = summarizer
        .summarize(&ids, "big", Utc::now(), &durations, &countries, &store, &mut rng)
        .unwrap();

    assert_eq!(summary.total_kills, 100);
    assert_eq!(summary.rows.iter().map(|r| r.kills).sum::<u32>(), 100);
}
