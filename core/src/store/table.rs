use super::{qualified_name, quote_ident, TelemetryStore};
use crate::error::{GenError, GenResult};
use rusqlite::{params_from_iter, types::Value};

/// A record that can be written as one table row.
///
/// `COLUMNS` names the target columns in the order `values()` returns
/// them; the two must always have the same length.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;
}

impl TelemetryStore {
    // ── Batch write ────────────────────────────────────────────

    /// Write every row of `rows` into `schema.table` in one transaction.
    ///
    /// - `replace` with a `primary_key`: rows sharing a key with an incoming
    ///   row are deleted first (upsert by key).
    /// - `replace` without a key: the table is emptied, then loaded.
    /// - otherwise rows are appended; duplicates are left to the table's
    ///   own constraints.
    ///
    /// An empty batch touches nothing. Returns the number of rows inserted.
    pub fn write_table<R: TableRow>(
        &self,
        schema: &str,
        table: &str,
        rows: &[R],
        primary_key: Option<&str>,
        replace: bool,
    ) -> GenResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let target = qualified_name(schema, table);
        let key_index = primary_key
            .map(|key| {
                R::COLUMNS
                    .iter()
                    .position(|c| *c == key)
                    .ok_or_else(|| GenError::SchemaMismatch {
                        table: format!("{schema}.{table}"),
                        column: key.to_string(),
                    })
            })
            .transpose()?;

        let insert_sql = format!(
            "INSERT INTO {target} ({}) VALUES ({})",
            R::COLUMNS
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            (1..=R::COLUMNS.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", "),
        );

        let tx = self.conn.unchecked_transaction()?;
        if replace && primary_key.is_none() {
            let removed = tx.execute(&format!("DELETE FROM {target}"), [])?;
            log::debug!("{schema}.{table}: cleared {removed} rows before reload");
        }
        {
            let mut insert = tx.prepare(&insert_sql)?;
            let mut delete = match (replace, primary_key) {
                (true, Some(key)) => Some(tx.prepare(&format!(
                    "DELETE FROM {target} WHERE {} = ?1",
                    quote_ident(key)
                ))?),
                _ => None,
            };
            for row in rows {
                let values = row.values();
                debug_assert_eq!(values.len(), R::COLUMNS.len());
                if let (Some(stmt), Some(idx)) = (delete.as_mut(), key_index) {
                    stmt.execute([&values[idx]])?;
                }
                insert.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;

        log::debug!(
            "{schema}.{table}: wrote {} rows (key: {primary_key:?}, replace: {replace})",
            rows.len()
        );
        Ok(rows.len())
    }
}
