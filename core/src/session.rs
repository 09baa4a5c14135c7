//! Raw session fabrication: player rosters, sessions with heartbeats,
//! and per-player play time.

use crate::{
    config::GeneratorConfig,
    error::{GenError, GenResult},
    rng::GenRng,
    store::{RecordTarget, TelemetryStore},
    types::{iso_timestamp, PlayerId, SessionId},
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const COUNTRIES: &[&str] = &[
    "US", "CA", "MX", "BR", "GB", "DE", "FR", "ES", "SE", "PL", "JP", "KR", "AU", "IN",
];

pub const TEAMS: [&str; 2] = ["redTeam", "blueTeam"];

const ARENA_HALF_WIDTH: f64 = 500.0;
const MAX_ALTITUDE: f64 = 50.0;
const STEP: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub player_id: PlayerId,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Heartbeat {
    pub player_id: PlayerId,
    pub session_id: SessionId,
    pub team_id: String,
    pub timestamp: String,
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
}

/// The raw session document, written once as JSON and as a raw row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub start_time: String,
    pub end_time: String,
    pub heartbeats: Vec<Heartbeat>,
}

/// A fabricated session plus the per-player facts the summarizer needs.
#[derive(Debug, Clone)]
pub struct GeneratedSession {
    pub record: SessionRecord,
    pub player_ids: Vec<PlayerId>,
    pub session_end: DateTime<Utc>,
    pub durations: HashMap<PlayerId, i64>,
}

/// `n` players with ids `player_0001..` and a home country each.
pub fn generate_roster(n: usize, rng: &mut GenRng) -> Vec<Player> {
    (1..=n)
        .map(|i| Player {
            player_id: format!("player_{i:04}"),
            country: rng.pick(COUNTRIES).copied().unwrap_or("US").to_string(),
        })
        .collect()
}

pub fn country_map(players: &[Player]) -> HashMap<PlayerId, String> {
    players
        .iter()
        .map(|p| (p.player_id.clone(), p.country.clone()))
        .collect()
}

/// Draw between `min` and `max` distinct players (partial Fisher-Yates).
/// The result keeps draw order.
pub fn pick_participants<'a>(
    roster: &'a [Player],
    min: usize,
    max: usize,
    rng: &mut GenRng,
) -> Vec<&'a Player> {
    let max = max.min(roster.len());
    let min = min.min(max);
    let n = rng.range_inclusive(min as u64, max as u64) as usize;
    let mut idx: Vec<usize> = (0..roster.len()).collect();
    for i in 0..n {
        let j = i + rng.next_u64_below((idx.len() - i) as u64) as usize;
        idx.swap(i, j);
    }
    idx[..n].iter().map(|&i| &roster[i]).collect()
}

/// Fabricate one session on `date` for the given players.
pub fn generate_session(
    player_ids: &[PlayerId],
    date: NaiveDate,
    config: &GeneratorConfig,
    rng: &mut GenRng,
) -> GenResult<GeneratedSession> {
    config.validate()?;
    if player_ids.is_empty() {
        return Err(GenError::Validation("a session needs at least one player".into()));
    }

    let session_id = rng.uuid().to_string();
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| GenError::Validation(format!("no midnight on {date}")))?;
    let start = Utc.from_utc_datetime(&midnight)
        + Duration::seconds(rng.next_u64_below(86_400) as i64);
    let length_secs = rng.range_inclusive(
        config.session_minutes_min as u64 * 60,
        config.session_minutes_max as u64 * 60,
    ) as i64;
    let end = start + Duration::seconds(length_secs);
    let interval = config.heartbeat_interval_secs as i64;

    let mut durations = HashMap::with_capacity(player_ids.len());
    let mut beats: Vec<(i64, Heartbeat)> = Vec::new();

    for (i, pid) in player_ids.iter().enumerate() {
        let team = TEAMS[i % TEAMS.len()];
        let played = ((length_secs as f64) * rng.uniform(0.5, 1.0)).round().max(1.0) as i64;
        durations.insert(pid.clone(), played);

        let mut pos = [
            rng.uniform(-100.0, 100.0),
            rng.uniform(-100.0, 100.0),
            rng.uniform(0.0, 10.0),
        ];
        let mut offset = 0;
        while offset <= played {
            beats.push((
                offset,
                Heartbeat {
                    player_id: pid.clone(),
                    session_id: session_id.clone(),
                    team_id: team.to_string(),
                    timestamp: iso_timestamp(start + Duration::seconds(offset)),
                    position_x: round2(pos[0]),
                    position_y: round2(pos[1]),
                    position_z: round2(pos[2]),
                },
            ));
            pos[0] = (pos[0] + rng.uniform(-STEP, STEP)).clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
            pos[1] = (pos[1] + rng.uniform(-STEP, STEP)).clamp(-ARENA_HALF_WIDTH, ARENA_HALF_WIDTH);
            pos[2] = (pos[2] + rng.uniform(-STEP, STEP) / 2.0).clamp(0.0, MAX_ALTITUDE);
            offset += interval;
        }
    }
    // Stable: players keep roster order within one heartbeat tick.
    beats.sort_by_key(|(offset, _)| *offset);

    Ok(GeneratedSession {
        record: SessionRecord {
            session_id,
            start_time: iso_timestamp(start),
            end_time: iso_timestamp(end),
            heartbeats: beats.into_iter().map(|(_, hb)| hb).collect(),
        },
        player_ids: player_ids.to_vec(),
        session_end: end,
        durations,
    })
}

/// Dual-write the raw session into `leap_raw.event_session`.
pub fn write_session(
    store: &TelemetryStore,
    record: &SessionRecord,
    directory: &Path,
    write_to_db: bool,
) -> GenResult<PathBuf> {
    store.write_record(
        &RecordTarget::EVENT_SESSION,
        &record.session_id,
        record,
        directory,
        write_to_db,
    )
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
