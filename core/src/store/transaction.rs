use super::{TableRow, TelemetryStore};
use crate::{
    catalog::{Cycle, TransactionType},
    error::GenResult,
    transaction::Transaction,
};
use rusqlite::{params, types::Value, Row};

impl TableRow for Transaction {
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "player_id",
        "event_datetime",
        "purchase_item",
        "purchase_price",
        "currency",
        "is_recurring",
        "cycle",
        "transaction_type",
    ];

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.transaction_id.clone()),
            Value::Text(self.player_id.clone()),
            Value::Text(self.event_datetime.clone()),
            Value::Text(self.purchase_item.clone()),
            Value::Real(self.purchase_price),
            Value::Text(self.currency.clone()),
            Value::Integer(self.is_recurring as i64),
            Value::Text(self.cycle.map(|c| c.as_str()).unwrap_or("").to_string()),
            Value::Text(self.transaction_type.as_str().to_string()),
        ]
    }
}

const SELECT_TRANSACTIONS: &str = "SELECT transaction_id, player_id, event_datetime, purchase_item,
        purchase_price, currency, is_recurring, cycle, transaction_type
 FROM leap_raw.event_transaction";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let cycle = match row.get::<_, Option<String>>(7)?.as_deref() {
        Some("M") => Some(Cycle::M),
        Some("Y") => Some(Cycle::Y),
        _ => None,
    };
    let transaction_type = match row.get::<_, String>(8)?.as_str() {
        "BattlePass" => TransactionType::BattlePass,
        "Emote" => TransactionType::Emote,
        "Skin" => TransactionType::Skin,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Text,
                format!("unknown transaction_type '{other}'").into(),
            ))
        }
    };
    Ok(Transaction {
        transaction_id: row.get(0)?,
        player_id: row.get(1)?,
        event_datetime: row.get(2)?,
        purchase_item: row.get(3)?,
        purchase_price: row.get(4)?,
        currency: row.get(5)?,
        is_recurring: row.get::<_, i64>(6)? != 0,
        cycle,
        transaction_type,
    })
}

impl TelemetryStore {
    // ── Transactions ───────────────────────────────────────────

    pub fn all_transactions(&self) -> GenResult<Vec<Transaction>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_TRANSACTIONS} ORDER BY event_datetime, transaction_id"))?;
        let rows = stmt
            .query_map([], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn transactions_for_player(&self, player_id: &str) -> GenResult<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_TRANSACTIONS} WHERE player_id = ?1 ORDER BY event_datetime, transaction_id"
        ))?;
        let rows = stmt
            .query_map(params![player_id], transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
