//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database or writes output files.
//! Generators hand finished records to store methods and never execute
//! SQL directly.
//!
//! Warehouse schemas (`leap_raw`, `leap_stage`) are attached databases,
//! so every table is addressed as `schema.table`.

use crate::error::GenResult;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

mod record;
mod session;
mod table;
mod transaction;

pub use record::{RawRecord, RecordTarget};
pub use table::TableRow;

pub const RAW_SCHEMA: &str = "leap_raw";
pub const STAGE_SCHEMA: &str = "leap_stage";

pub const EVENT_SESSION: &str = "event_session";
pub const FACT_SESSION: &str = "fact_session";
pub const EVENT_TRANSACTION: &str = "event_transaction";

pub struct TelemetryStore {
    conn: Connection,
    path: Option<PathBuf>, // None for :memory:
}

impl TelemetryStore {
    /// Open (or create) the warehouse database at `path`.
    pub fn open(path: impl AsRef<Path>) -> GenResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open(path)?;
        // WAL is a no-op on some filesystems; not fatal.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GenResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Attach the warehouse schemas and create the output tables.
    /// Safe to call more than once.
    pub fn migrate(&self) -> GenResult<()> {
        for schema in [RAW_SCHEMA, STAGE_SCHEMA] {
            self.attach_schema(schema)?;
        }
        self.conn
            .execute_batch(include_str!("../../../migrations/001_telemetry.sql"))?;
        Ok(())
    }

    fn attach_schema(&self, schema: &str) -> GenResult<()> {
        if self.attached_schemas()?.iter().any(|s| s == schema) {
            return Ok(());
        }
        let file = match &self.path {
            Some(p) => schema_file(p, schema).to_string_lossy().into_owned(),
            None => ":memory:".to_string(),
        };
        self.conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", quote_ident(schema)),
            params![file],
        )?;
        log::debug!("attached schema {schema} -> {file}");
        Ok(())
    }

    pub fn attached_schemas(&self) -> GenResult<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, schema: &str, table: &str) -> GenResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", qualified_name(schema, table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

/// `run.db` + `leap_raw` -> `run_leap_raw.db` next to it.
fn schema_file(main: &Path, schema: &str) -> PathBuf {
    let stem = main
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "warehouse".into());
    main.with_file_name(format!("{stem}_{schema}.db"))
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}
