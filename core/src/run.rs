//! The day loop: sessions, their summaries, then purchases.
//!
//! ORDER PER DAY (fixed):
//!   1. Sessions: pick participants, fabricate, dual-write raw record.
//!   2. Summaries: kill/death allocation into the staging table.
//!   3. Transactions: one behavior draw per roster player.
//!
//! Each step draws from its own stream, keyed by the day index, so the
//! same seed always reproduces the same files and rows.

use crate::{
    behavior::BehaviorModel,
    catalog::Catalog,
    config::GeneratorConfig,
    error::GenResult,
    rng::{RngBank, StreamSlot},
    session::{country_map, generate_roster, generate_session, pick_participants, write_session, Player},
    store::TelemetryStore,
    summarizer::SessionSummarizer,
    transaction::{PlayerDay, TransactionGenerator},
};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub sessions: usize,
    pub heartbeats: usize,
    pub kills: u64,
    pub player_days: usize,
    pub purchasing_player_days: usize,
    pub transactions: usize,
}

pub struct TelemetryRun {
    pub seed: u64,
    config: GeneratorConfig,
    catalog: Catalog,
    store: TelemetryStore,
    rng_bank: RngBank,
    transactions: TransactionGenerator,
    summarizer: SessionSummarizer,
    day_index: u64,
}

impl TelemetryRun {
    /// Validates config and catalog up front; the store must be migrated.
    pub fn new(
        config: GeneratorConfig,
        catalog: Catalog,
        store: TelemetryStore,
        seed: u64,
    ) -> GenResult<Self> {
        config.validate()?;
        catalog.validate()?;
        Ok(Self {
            seed,
            transactions: TransactionGenerator::new(config.behavior)?,
            summarizer: SessionSummarizer::new(&config),
            rng_bank: RngBank::new(seed),
            config,
            catalog,
            store,
            day_index: 0,
        })
    }

    /// Replace the purchasing behavior strategy.
    pub fn with_behavior(mut self, behavior: Box<dyn BehaviorModel>) -> GenResult<Self> {
        self.transactions = TransactionGenerator::with_behavior(self.config.behavior, behavior)?;
        Ok(self)
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The run's player roster. Same seed, same roster.
    pub fn roster(&self, players: usize) -> Vec<Player> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::Roster, 0);
        generate_roster(players, &mut rng)
    }

    pub fn run_day(&mut self, date: NaiveDate, roster: &[Player]) -> GenResult<DayReport> {
        let day = self.day_index;
        self.day_index += 1;

        let mut session_rng = self.rng_bank.for_stream(StreamSlot::Session, day);
        let mut summary_rng = self.rng_bank.for_stream(StreamSlot::Summary, day);
        let mut txn_rng = self.rng_bank.for_stream(StreamSlot::Transaction, day);

        let mut report = DayReport {
            date,
            sessions: 0,
            heartbeats: 0,
            kills: 0,
            player_days: 0,
            purchasing_player_days: 0,
            transactions: 0,
        };

        if roster.is_empty() {
            log::warn!("{date}: empty roster, nothing to generate");
            return Ok(report);
        }

        let countries = country_map(roster);
        for _ in 0..self.config.sessions_per_day {
            let ids: Vec<String> = pick_participants(
                roster,
                self.config.players_per_session_min,
                self.config.players_per_session_max,
                &mut session_rng,
            )
            .into_iter()
            .map(|p| p.player_id.clone())
            .collect();

            let session = generate_session(&ids, date, &self.config, &mut session_rng)?;
            write_session(
                &self.store,
                &session.record,
                &self.config.session_dir,
                self.config.write_to_db,
            )?;
            let summary = self.summarizer.summarize(
                &session.player_ids,
                &session.record.session_id,
                session.session_end,
                &session.durations,
                &countries,
                &self.store,
                &mut summary_rng,
            )?;

            report.sessions += 1;
            report.heartbeats += session.record.heartbeats.len();
            report.kills += summary.total_kills as u64;
        }

        let player_days: Vec<PlayerDay> = roster
            .iter()
            .map(|p| PlayerDay::new(p.player_id.clone(), date))
            .collect();
        let txns = self.transactions.generate_transactions(
            &player_days,
            &self.catalog,
            &self.store,
            &mut txn_rng,
            Some(&self.config.transaction_dir),
        )?;
        report.player_days = txns.player_days;
        report.purchasing_player_days = txns.purchasing_player_days;
        report.transactions = txns.transactions;

        log::info!(
            "{date}: {} sessions, {} heartbeats, {} kills, {} transactions",
            report.sessions,
            report.heartbeats,
            report.kills,
            report.transactions
        );
        Ok(report)
    }

    /// Run `days` consecutive days starting at `start`.
    pub fn run_days(
        &mut self,
        start: NaiveDate,
        days: u32,
        roster: &[Player],
    ) -> GenResult<Vec<DayReport>> {
        (0..days)
            .map(|offset| self.run_day(start + Duration::days(offset as i64), roster))
            .collect()
    }
}
