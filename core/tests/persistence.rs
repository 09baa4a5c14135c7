//! Dual-write and batch-write persistence tests.

use rusqlite::types::Value;
use serde_json::json;
use std::path::Path;
use telemetry_core::{
    catalog::TransactionType,
    error::GenError,
    store::{
        RecordTarget, TableRow, TelemetryStore, EVENT_SESSION, EVENT_TRANSACTION, FACT_SESSION,
        RAW_SCHEMA, STAGE_SCHEMA,
    },
    summarizer::SessionSummaryRow,
    transaction::Transaction,
};

fn store() -> TelemetryStore {
    let store = TelemetryStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn files_for(dir: &Path, record_id: &str) -> Vec<std::path::PathBuf> {
    let prefix = format!("{record_id}_");
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(".json")
        })
        .collect()
}

fn session_payload(session_id: &str) -> serde_json::Value {
    json!({
        "session_id": session_id,
        "start_time": "2025-08-08T12:00:00+00:00",
        "end_time": "2025-08-08T12:30:00+00:00",
        "heartbeats": [{
            "player_id": "abc123",
            "session_id": session_id,
            "team_id": "redTeam",
            "timestamp": "2025-08-08T12:00:00+00:00",
            "position_x": 1.1,
            "position_y": 2.2,
            "position_z": 3.3
        }]
    })
}

fn tx(id: &str, price: f64) -> Transaction {
    Transaction {
        transaction_id: id.into(),
        player_id: "p1".into(),
        event_datetime: "2025-08-08T12:00:00".into(),
        purchase_item: "SKU-1001".into(),
        purchase_price: price,
        currency: "USD".into(),
        is_recurring: false,
        cycle: None,
        transaction_type: TransactionType::Skin,
    }
}

fn fact(player: &str, kills: u32) -> SessionSummaryRow {
    SessionSummaryRow {
        player_id: player.into(),
        session_id: "sess001".into(),
        event_datetime: "2025-08-08T12:30:00.000000+00:00".into(),
        country: "US".into(),
        event_length_seconds: 1800,
        kills,
        deaths: 5,
    }
}

#[test]
fn write_session_to_disk_and_db() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let session_id = "6f1c3c1e-2b7a-4d0e-9a51-0c1d2e3f4a5b";
    let payload = session_payload(session_id);

    store
        .write_record(&RecordTarget::EVENT_SESSION, session_id, &payload, dir.path(), true)
        .unwrap();

    let files = files_for(dir.path(), session_id);
    assert_eq!(files.len(), 1, "Expected exactly one JSON file for the session");
    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(on_disk, payload);
    let hb = &on_disk["heartbeats"][0];
    assert_eq!(hb["team_id"], "redTeam");
    assert_eq!(hb["position_z"], 3.3);

    let rows = store.raw_records(&RecordTarget::EVENT_SESSION, session_id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].record_id, session_id);
    assert_eq!(rows[0].payload().unwrap(), payload);
    assert!(!rows[0].created_at.is_empty());
}

#[test]
fn file_is_written_even_without_db() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();

    store
        .write_record(&RecordTarget::EVENT_SESSION, "s-1", &session_payload("s-1"), dir.path(), false)
        .unwrap();

    assert_eq!(files_for(dir.path(), "s-1").len(), 1);
    assert_eq!(store.row_count(RAW_SCHEMA, EVENT_SESSION).unwrap(), 0);
}

#[test]
fn missing_directory_is_created() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("sessions").join("2025");

    let path = store
        .write_record(&RecordTarget::EVENT_SESSION, "s-2", &session_payload("s-2"), &nested, true)
        .unwrap();

    assert!(path.starts_with(&nested));
    assert!(path.exists());
}

#[test]
fn rewriting_the_same_id_adds_a_file_and_a_row() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let payload = session_payload("dup");

    for _ in 0..2 {
        store
            .write_record(&RecordTarget::EVENT_SESSION, "dup", &payload, dir.path(), true)
            .unwrap();
    }

    assert_eq!(files_for(dir.path(), "dup").len(), 2);
    assert_eq!(store.raw_records(&RecordTarget::EVENT_SESSION, "dup").unwrap().len(), 2);
}

#[test]
fn unwritable_directory_is_an_io_error() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"x").unwrap();

    let err = store
        .write_record(
            &RecordTarget::EVENT_SESSION,
            "s-3",
            &session_payload("s-3"),
            &blocker.join("sub"),
            true,
        )
        .unwrap_err();

    assert!(matches!(err, GenError::Io(_)), "got {err:?}");
    assert_eq!(store.row_count(RAW_SCHEMA, EVENT_SESSION).unwrap(), 0);
}

#[test]
fn unknown_table_is_a_database_error() {
    let store = store();
    let dir = tempfile::tempdir().unwrap();
    let target = RecordTarget {
        table: "no_such_table",
        ..RecordTarget::EVENT_SESSION
    };

    let err = store
        .write_record(&target, "s-4", &session_payload("s-4"), dir.path(), true)
        .unwrap_err();
    assert!(matches!(err, GenError::Database(_)), "got {err:?}");
}

#[test]
fn stage_session_row_round_trips() {
    let store = store();
    let row = fact("player001", 7);

    let written = store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[row.clone()], None, false)
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(store.row_count(STAGE_SCHEMA, FACT_SESSION).unwrap(), 1);
    assert_eq!(store.fact_session_rows("sess001").unwrap(), vec![row]);
}

#[test]
fn transaction_batch_round_trips() {
    let store = store();
    store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 5.0)], Some("transaction_id"), true)
        .unwrap();

    let rows = store.all_transactions().unwrap();
    assert_eq!(rows, vec![tx("TX-1", 5.0)]);
}

#[test]
fn replace_with_key_upserts() {
    let store = store();
    store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 5.0), tx("TX-2", 1.0)], None, false)
        .unwrap();
    store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 7.5)], Some("transaction_id"), true)
        .unwrap();

    let rows = store.all_transactions().unwrap();
    assert_eq!(rows.len(), 2);
    let updated = rows.iter().find(|t| t.transaction_id == "TX-1").unwrap();
    assert_eq!(updated.purchase_price, 7.5);
}

#[test]
fn replace_without_key_reloads_the_table() {
    let store = store();
    store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[fact("a", 1), fact("b", 2)], None, false)
        .unwrap();
    store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[fact("c", 3)], None, true)
        .unwrap();

    let rows = store.fact_session_rows("sess001").unwrap();
    assert_eq!(rows, vec![fact("c", 3)]);
}

#[test]
fn append_defers_duplicates_to_table_constraints() {
    let store = store();
    store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 5.0)], None, false)
        .unwrap();

    // event_transaction has a primary key: the append is refused.
    let err = store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 5.0)], None, false)
        .unwrap_err();
    assert!(matches!(err, GenError::Database(_)));

    // fact_session has none: duplicates coexist.
    for _ in 0..2 {
        store
            .write_table(STAGE_SCHEMA, FACT_SESSION, &[fact("a", 1)], None, false)
            .unwrap();
    }
    assert_eq!(store.row_count(STAGE_SCHEMA, FACT_SESSION).unwrap(), 2);
}

#[test]
fn failed_batch_leaves_no_partial_rows() {
    let store = store();
    // Second row collides with the first on the primary key.
    let err = store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-9", 1.0), tx("TX-9", 2.0)], None, false)
        .unwrap_err();

    assert!(matches!(err, GenError::Database(_)));
    assert_eq!(store.row_count(RAW_SCHEMA, EVENT_TRANSACTION).unwrap(), 0);
}

#[test]
fn empty_batch_touches_nothing() {
    let store = store();
    store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[fact("a", 1)], None, false)
        .unwrap();

    let written = store
        .write_table::<SessionSummaryRow>(STAGE_SCHEMA, FACT_SESSION, &[], None, true)
        .unwrap();

    assert_eq!(written, 0);
    assert_eq!(store.row_count(STAGE_SCHEMA, FACT_SESSION).unwrap(), 1);
}

struct BogusRow;

impl TableRow for BogusRow {
    const COLUMNS: &'static [&'static str] = &["player_id", "not_a_column"];

    fn values(&self) -> Vec<Value> {
        vec![Value::Text("p".into()), Value::Integer(1)]
    }
}

#[test]
fn column_mismatch_is_a_database_error() {
    let store = store();
    let err = store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[BogusRow], None, false)
        .unwrap_err();
    assert!(matches!(err, GenError::Database(_)), "got {err:?}");
}

struct NegativeKillsRow;

impl TableRow for NegativeKillsRow {
    const COLUMNS: &'static [&'static str] = <SessionSummaryRow as TableRow>::COLUMNS;

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text("p".into()),
            Value::Text("s-neg".into()),
            Value::Text("2025-08-08T12:00:00+00:00".into()),
            Value::Text("US".into()),
            Value::Integer(60),
            Value::Integer(-1),
            Value::Integer(0),
        ]
    }
}

#[test]
fn negative_kill_count_fails_the_read_back() {
    let store = store();
    store
        .write_table(STAGE_SCHEMA, FACT_SESSION, &[NegativeKillsRow], None, false)
        .unwrap();

    let err = store.fact_session_rows("s-neg").unwrap_err();
    assert!(matches!(err, GenError::Database(_)), "got {err:?}");
}

#[test]
fn unknown_primary_key_is_a_schema_mismatch() {
    let store = store();
    let err = store
        .write_table(RAW_SCHEMA, EVENT_TRANSACTION, &[tx("TX-1", 5.0)], Some("tx_key"), true)
        .unwrap_err();
    assert!(
        matches!(&err, GenError::SchemaMismatch { column, .. } if column == "tx_key"),
        "got {err:?}"
    );
}

#[test]
fn on_disk_store_attaches_schema_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("run.db");
    {
        let store = TelemetryStore::open(&db).unwrap();
        store.migrate().unwrap();
        store
            .write_table(STAGE_SCHEMA, FACT_SESSION, &[fact("a", 4)], None, false)
            .unwrap();
    }
    assert!(dir.path().join("run_leap_stage.db").exists());

    let reopened = TelemetryStore::open(&db).unwrap();
    reopened.migrate().unwrap();
    assert_eq!(reopened.fact_session_rows("sess001").unwrap(), vec![fact("a", 4)]);
}
