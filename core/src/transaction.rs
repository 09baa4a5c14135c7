//! Purchase transaction generation.
//!
//! Each (player, day) is assigned a behavior class; purchasing classes
//! draw a count and per-purchase amounts from their bucket and pick
//! products uniformly from the catalog.

use crate::{
    behavior::{BehaviorClass, BehaviorModel, WeightedBehavior},
    catalog::{cycle_from_str, cycle_to_str, Catalog, Cycle, TransactionType},
    config::BehaviorBuckets,
    error::{GenError, GenResult},
    rng::GenRng,
    store::{TelemetryStore, EVENT_TRANSACTION, RAW_SCHEMA},
    types::{compact_date, iso_naive, PlayerId},
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const CURRENCY: &str = "USD";
pub const TRANSACTION_ID_PREFIX: &str = "TX-";

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub player_id: PlayerId,
    pub event_datetime: String,
    pub purchase_item: String,
    pub purchase_price: f64,
    pub currency: String,
    pub is_recurring: bool,
    #[serde(
        default,
        serialize_with = "cycle_to_str",
        deserialize_with = "cycle_from_str"
    )]
    pub cycle: Option<Cycle>,
    pub transaction_type: TransactionType,
}

/// One input row of the batch path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDay {
    pub player_id: PlayerId,
    pub date: NaiveDate,
}

impl PlayerDay {
    pub fn new(player_id: impl Into<PlayerId>, date: NaiveDate) -> Self {
        Self {
            player_id: player_id.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionBatchSummary {
    pub player_days: usize,
    pub purchasing_player_days: usize,
    pub minnow_player_days: usize,
    pub whale_player_days: usize,
    pub transactions: usize,
    pub days_written: usize,
}

pub struct TransactionGenerator {
    buckets: BehaviorBuckets,
    behavior: Box<dyn BehaviorModel>,
}

impl TransactionGenerator {
    /// Generator using the weighted distribution of `buckets`.
    pub fn new(buckets: BehaviorBuckets) -> GenResult<Self> {
        Self::with_behavior(buckets, Box::new(WeightedBehavior::new(buckets)))
    }

    /// Generator with an explicit behavior strategy.
    pub fn with_behavior(
        buckets: BehaviorBuckets,
        behavior: Box<dyn BehaviorModel>,
    ) -> GenResult<Self> {
        buckets.validate()?;
        Ok(Self { buckets, behavior })
    }

    pub fn buckets(&self) -> &BehaviorBuckets {
        &self.buckets
    }

    /// Purchases for one player on one day. Empty for `no_purchase`.
    pub fn generate_for_player_day(
        &self,
        player_id: &str,
        date: NaiveDate,
        catalog: &Catalog,
        rng: &mut GenRng,
    ) -> GenResult<Vec<Transaction>> {
        self.generate_with_behavior(player_id, date, catalog, rng)
            .map(|(_, txs)| txs)
    }

    /// As `generate_for_player_day`, also returning the assigned class.
    pub fn generate_with_behavior(
        &self,
        player_id: &str,
        date: NaiveDate,
        catalog: &Catalog,
        rng: &mut GenRng,
    ) -> GenResult<(BehaviorClass, Vec<Transaction>)> {
        let class = self.behavior.assign(rng);
        if class == BehaviorClass::NoPurchase {
            return Ok((class, Vec::new()));
        }
        if catalog.is_empty() {
            return Err(GenError::Validation(format!(
                "cannot generate {class} purchases from an empty catalog"
            )));
        }

        let bucket = class.bucket(&self.buckets);
        let count = rng.range_inclusive(bucket.min_purchases as u64, bucket.max_purchases as u64);
        let mut txs = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let idx = rng.next_u64_below(catalog.len() as u64) as usize;
            let product = &catalog.products[idx];

            let amount = round_cents(rng.uniform(bucket.min_amount, bucket.max_amount))
                .clamp(bucket.min_amount, bucket.max_amount);

            let second = rng.next_u64_below(SECONDS_PER_DAY) as u32;
            let time = NaiveTime::from_num_seconds_from_midnight_opt(second, 0)
                .ok_or_else(|| GenError::Validation(format!("bad second of day {second}")))?;

            txs.push(Transaction {
                transaction_id: format!("{TRANSACTION_ID_PREFIX}{}", rng.uuid()),
                player_id: player_id.to_string(),
                event_datetime: iso_naive(NaiveDateTime::new(date, time)),
                purchase_item: product.product_sku.clone(),
                purchase_price: amount,
                currency: CURRENCY.to_string(),
                is_recurring: product.is_recurring,
                cycle: product.cycle,
                transaction_type: product.transaction_type,
            });
        }

        // Same-day ISO strings sort chronologically.
        txs.sort_by(|a, b| a.event_datetime.cmp(&b.event_datetime));
        Ok((class, txs))
    }

    /// Generate for every player-day and land one batch per date in
    /// `leap_raw.event_transaction`, upserting by `transaction_id`.
    /// With `json_dir`, each date also gets `transactions_YYYYMMDD.json`,
    /// merged with any rows an earlier call already landed there.
    pub fn generate_transactions(
        &self,
        player_days: &[PlayerDay],
        catalog: &Catalog,
        store: &TelemetryStore,
        rng: &mut GenRng,
        json_dir: Option<&Path>,
    ) -> GenResult<TransactionBatchSummary> {
        let mut summary = TransactionBatchSummary {
            player_days: player_days.len(),
            ..Default::default()
        };
        let mut by_date: BTreeMap<NaiveDate, Vec<Transaction>> = BTreeMap::new();

        for pd in player_days {
            let (class, txs) = self.generate_with_behavior(&pd.player_id, pd.date, catalog, rng)?;
            match class {
                BehaviorClass::Minnow => summary.minnow_player_days += 1,
                BehaviorClass::Whale => summary.whale_player_days += 1,
                BehaviorClass::NoPurchase => {}
            }
            if txs.is_empty() {
                continue;
            }
            summary.purchasing_player_days += 1;
            by_date.entry(pd.date).or_default().extend(txs);
        }

        for (date, txs) in &by_date {
            store.write_table(RAW_SCHEMA, EVENT_TRANSACTION, txs, Some("transaction_id"), true)?;
            if let Some(dir) = json_dir {
                let name = format!("transactions_{}.json", compact_date(*date));
                store.merge_json_rows(dir, &name, "transaction_id", txs)?;
            }
            summary.transactions += txs.len();
            summary.days_written += 1;
            log::debug!("{date}: {} transactions written", txs.len());
        }

        log::info!(
            "transactions: {} player-days, {} purchasing ({} minnow, {} whale), {} rows over {} days",
            summary.player_days,
            summary.purchasing_player_days,
            summary.minnow_player_days,
            summary.whale_player_days,
            summary.transactions,
            summary.days_written
        );
        Ok(summary)
    }
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
