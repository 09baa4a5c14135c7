//! Session kill/death summaries.
//!
//! A session's kill total is split across its players with a
//! Dirichlet(1, ..., 1) share vector and a multinomial draw, so the
//! per-player counts always add up to the total. Deaths mirror the
//! kill total and are split independently.

use crate::{
    config::GeneratorConfig,
    error::{GenError, GenResult},
    rng::GenRng,
    store::{TelemetryStore, FACT_SESSION, STAGE_SCHEMA},
    types::{iso_timestamp, PlayerId, SessionId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummaryRow {
    pub player_id: PlayerId,
    pub session_id: SessionId,
    pub event_datetime: String,
    pub country: String,
    pub event_length_seconds: i64,
    pub kills: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub total_kills: u32,
    pub total_deaths: u32,
    pub rows: Vec<SessionSummaryRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSummarizer {
    /// Totals are drawn from [kills_min, kills_max).
    kills_min: u32,
    kills_max: u32,
}

impl Default for SessionSummarizer {
    fn default() -> Self {
        Self {
            kills_min: 10,
            kills_max: 60,
        }
    }
}

impl SessionSummarizer {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            kills_min: config.kills_min,
            kills_max: config.kills_max,
        }
    }

    /// Allocate kills and deaths, then append one row per player into
    /// `leap_stage.fact_session`.
    #[allow(clippy::too_many_arguments)]
    pub fn summarize(
        &self,
        player_ids: &[PlayerId],
        session_id: &str,
        session_end: DateTime<Utc>,
        durations: &HashMap<PlayerId, i64>,
        country_map: &HashMap<PlayerId, String>,
        store: &TelemetryStore,
        rng: &mut GenRng,
    ) -> GenResult<SessionSummary> {
        if player_ids.is_empty() {
            return Err(GenError::Validation(format!(
                "session {session_id} has no players"
            )));
        }
        // Resolve every lookup before drawing or writing anything.
        let facts = player_ids
            .iter()
            .map(|pid| {
                let duration = durations.get(pid).ok_or_else(|| GenError::MissingMapping {
                    mapping: "durations",
                    player_id: pid.clone(),
                })?;
                let country = country_map.get(pid).ok_or_else(|| GenError::MissingMapping {
                    mapping: "country_map",
                    player_id: pid.clone(),
                })?;
                Ok((*duration, country.as_str()))
            })
            .collect::<GenResult<Vec<_>>>()?;

        let span = (self.kills_max.saturating_sub(self.kills_min)).max(1) as u64;
        let total_kills = self.kills_min + rng.next_u64_below(span) as u32;
        let total_deaths = total_kills;

        let n = player_ids.len();
        let kill_shares = dirichlet_symmetric(n, rng);
        let kills = multinomial(total_kills, &kill_shares, rng);
        let death_shares = dirichlet_symmetric(n, rng);
        let deaths = multinomial(total_deaths, &death_shares, rng);

        let event_datetime = iso_timestamp(session_end);
        let rows: Vec<SessionSummaryRow> = player_ids
            .iter()
            .zip(facts)
            .enumerate()
            .map(|(i, (pid, (duration, country)))| SessionSummaryRow {
                player_id: pid.clone(),
                session_id: session_id.to_string(),
                event_datetime: event_datetime.clone(),
                country: country.to_string(),
                event_length_seconds: duration,
                kills: kills[i],
                deaths: deaths[i],
            })
            .collect();

        store.write_table(STAGE_SCHEMA, FACT_SESSION, &rows, None, false)?;
        log::debug!(
            "session {session_id}: {n} players, {total_kills} kills, {total_deaths} deaths"
        );

        Ok(SessionSummary {
            total_kills,
            total_deaths,
            rows,
        })
    }
}

/// Summarize with the default kill range [10, 60).
#[allow(clippy::too_many_arguments)]
pub fn summarize_session(
    player_ids: &[PlayerId],
    session_id: &str,
    session_end: DateTime<Utc>,
    durations: &HashMap<PlayerId, i64>,
    country_map: &HashMap<PlayerId, String>,
    store: &TelemetryStore,
    rng: &mut GenRng,
) -> GenResult<SessionSummary> {
    SessionSummarizer::default().summarize(
        player_ids,
        session_id,
        session_end,
        durations,
        country_map,
        store,
        rng,
    )
}

/// Symmetric Dirichlet with all concentrations 1: normalised
/// standard exponentials.
pub fn dirichlet_symmetric(n: usize, rng: &mut GenRng) -> Vec<f64> {
    let draws: Vec<f64> = (0..n).map(|_| rng.exponential()).collect();
    let total: f64 = draws.iter().sum();
    draws.into_iter().map(|d| d / total).collect()
}

/// `trials` categorical draws over `probs`, counted per category.
pub fn multinomial(trials: u32, probs: &[f64], rng: &mut GenRng) -> Vec<u32> {
    let mut counts = vec![0u32; probs.len()];
    for _ in 0..trials {
        counts[rng.pick_weighted(probs)] += 1;
    }
    counts
}
