use super::{qualified_name, quote_ident, TelemetryStore, EVENT_SESSION, RAW_SCHEMA};
use crate::{
    error::{GenError, GenResult},
    types::iso_timestamp,
};
use chrono::Utc;
use rusqlite::params;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::collections::HashSet;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Column holding the serialized JSON in every raw record table.
pub const RAW_PAYLOAD_COLUMN: &str = "raw_response";

/// Where a dual-written record lands in the warehouse.
#[derive(Debug, Clone, Copy)]
pub struct RecordTarget<'a> {
    pub schema: &'a str,
    pub table: &'a str,
    pub id_column: &'a str,
    pub created_at_column: &'a str,
}

impl RecordTarget<'static> {
    pub const EVENT_SESSION: RecordTarget<'static> = RecordTarget {
        schema: RAW_SCHEMA,
        table: EVENT_SESSION,
        id_column: "session_id",
        created_at_column: "created_at",
    };
}

/// A raw record row as read back from the warehouse.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub record_id: String,
    pub raw_response: String,
    pub created_at: String,
}

impl RawRecord {
    pub fn payload(&self) -> GenResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.raw_response)?)
    }
}

impl TelemetryStore {
    // ── Dual write ─────────────────────────────────────────────

    /// Write `record` to `{record_id}_{timestamp}.json` under `directory`
    /// and, when `write_to_db` is set, insert `(record_id, json, now)` into
    /// the target table. The file is always written first.
    ///
    /// Repeated calls with the same id produce additional files and rows.
    pub fn write_record<T: Serialize + ?Sized>(
        &self,
        target: &RecordTarget<'_>,
        record_id: &str,
        record: &T,
        directory: &Path,
        write_to_db: bool,
    ) -> GenResult<PathBuf> {
        if record_id.is_empty() || record_id.contains(['/', '\\']) {
            return Err(GenError::Validation(format!(
                "record id '{record_id}' cannot be used as a file name"
            )));
        }
        let value = serde_json::to_value(record)?;

        std::fs::create_dir_all(directory)?;
        let (path, file) = create_record_file(directory, record_id)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &value)?;
        writer.flush()?;

        if write_to_db {
            let sql = format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
                qualified_name(target.schema, target.table),
                quote_ident(target.id_column),
                quote_ident(RAW_PAYLOAD_COLUMN),
                quote_ident(target.created_at_column),
            );
            self.conn.execute(
                &sql,
                params![record_id, serde_json::to_string(&value)?, iso_timestamp(Utc::now())],
            )?;
        }

        log::debug!(
            "record {record_id} -> {} (db: {write_to_db})",
            path.display()
        );
        Ok(path)
    }

    /// Write `value` as pretty JSON to `directory/file_name`, replacing
    /// any previous file of that name.
    pub fn write_json_file<T: Serialize + ?Sized>(
        &self,
        directory: &Path,
        file_name: &str,
        value: &T,
    ) -> GenResult<PathBuf> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(file_name);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(path)
    }

    /// Merge `rows` into the JSON array at `directory/file_name`.
    ///
    /// Entries already in the file whose `key` field matches an incoming
    /// row are dropped, so the file tracks the keyed upsert done on the
    /// table side. A missing file starts empty.
    pub fn merge_json_rows<T: Serialize>(
        &self,
        directory: &Path,
        file_name: &str,
        key: &str,
        rows: &[T],
    ) -> GenResult<PathBuf> {
        let incoming = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let path = directory.join(file_name);
        let mut merged: Vec<serde_json::Value> = match File::open(&path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let keys: HashSet<&str> = incoming
            .iter()
            .filter_map(|row| row.get(key).and_then(|k| k.as_str()))
            .collect();
        merged.retain(|row| {
            row.get(key)
                .and_then(|k| k.as_str())
                .map_or(true, |k| !keys.contains(k))
        });
        let before = merged.len();
        merged.extend(incoming.iter().cloned());
        log::debug!(
            "{} <- {} rows ({} kept from earlier writes)",
            path.display(),
            incoming.len(),
            before
        );
        self.write_json_file(directory, file_name, &merged)
    }

    /// All rows stored for `record_id`, oldest first.
    pub fn raw_records(
        &self,
        target: &RecordTarget<'_>,
        record_id: &str,
    ) -> GenResult<Vec<RawRecord>> {
        let sql = format!(
            "SELECT {id}, {payload}, {created} FROM {table} WHERE {id} = ?1 ORDER BY rowid ASC",
            id = quote_ident(target.id_column),
            payload = quote_ident(RAW_PAYLOAD_COLUMN),
            created = quote_ident(target.created_at_column),
            table = qualified_name(target.schema, target.table),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![record_id], |row| {
                Ok(RawRecord {
                    record_id: row.get(0)?,
                    raw_response: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Exclusively create `{id}_{timestamp}.json`. If another file already
/// holds that name (same microsecond), a counter is appended.
fn create_record_file(directory: &Path, record_id: &str) -> std::io::Result<(PathBuf, File)> {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%6f").to_string();
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{record_id}_{stamp}.json")
        } else {
            format!("{record_id}_{stamp}-{attempt}.json")
        };
        let path = directory.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}
