use super::{TableRow, TelemetryStore};
use crate::{error::GenResult, summarizer::SessionSummaryRow};
use rusqlite::{params, types::Value};

impl TableRow for SessionSummaryRow {
    // The warehouse column is event_date_time.
    const COLUMNS: &'static [&'static str] = &[
        "player_id",
        "session_id",
        "event_date_time",
        "country",
        "event_length_seconds",
        "kills",
        "deaths",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.player_id.clone()),
            Value::Text(self.session_id.clone()),
            Value::Text(self.event_datetime.clone()),
            Value::Text(self.country.clone()),
            Value::Integer(self.event_length_seconds),
            Value::Integer(self.kills as i64),
            Value::Integer(self.deaths as i64),
        ]
    }
}

impl TelemetryStore {
    // ── Session facts ──────────────────────────────────────────

    pub fn fact_session_rows(&self, session_id: &str) -> GenResult<Vec<SessionSummaryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, session_id, event_date_time, country,
                    event_length_seconds, kills, deaths
             FROM leap_stage.fact_session WHERE session_id = ?1
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok(SessionSummaryRow {
                    player_id: row.get(0)?,
                    session_id: row.get(1)?,
                    event_datetime: row.get(2)?,
                    country: row.get(3)?,
                    event_length_seconds: row.get(4)?,
                    kills: row.get(5)?,
                    deaths: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Sum of kills and deaths across one session's fact rows.
    pub fn session_totals(&self, session_id: &str) -> GenResult<(i64, i64)> {
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(kills), 0), COALESCE(SUM(deaths), 0)
             FROM leap_stage.fact_session WHERE session_id = ?1",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }
}
