//! telemetry-runner: headless generator run.
//!
//! Usage:
//!   telemetry-runner --seed 12345 --days 7 --players 200 --db telemetry.db
//!   telemetry-runner --catalog data/dim_products.json --out-dir ./out --no-db

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::env;
use std::path::{Path, PathBuf};
use telemetry_core::{
    catalog::Catalog,
    config::GeneratorConfig,
    run::{DayReport, TelemetryRun},
    store::{TelemetryStore, EVENT_SESSION, EVENT_TRANSACTION, FACT_SESSION, RAW_SCHEMA, STAGE_SCHEMA},
};

#[derive(serde::Serialize)]
struct RunSummary {
    seed: u64,
    days: usize,
    players: usize,
    sessions: usize,
    heartbeats: usize,
    transactions: usize,
    reports: Vec<DaySummary>,
}

#[derive(serde::Serialize)]
struct DaySummary {
    date: String,
    sessions: usize,
    kills: u64,
    purchasing_players: usize,
    transactions: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 7u32);
    let players = parse_arg(&args, "--players", 100usize);
    let no_db = args.iter().any(|a| a == "--no-db");
    let db = str_arg(&args, "--db").unwrap_or("telemetry.db");
    let out_dir = PathBuf::from(str_arg(&args, "--out-dir").unwrap_or("./data"));
    let catalog_path = str_arg(&args, "--catalog").unwrap_or("data/dim_products.json");
    let start_date = match str_arg(&args, "--start-date") {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--start-date must be YYYY-MM-DD, got {s}"))?,
        None => chrono::Utc::now().date_naive(),
    };

    let mut config = match str_arg(&args, "--config") {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    config.session_dir = out_dir.join("sessions");
    config.transaction_dir = out_dir.join("transactions");
    if no_db {
        config.write_to_db = false;
    }

    println!("Game telemetry generator");
    println!("  seed:       {seed}");
    println!("  days:       {days} from {start_date}");
    println!("  players:    {players}");
    println!("  db:         {db}");
    println!("  out_dir:    {}", out_dir.display());
    println!("  catalog:    {catalog_path}");
    println!();

    let catalog = Catalog::load(Path::new(catalog_path))
        .with_context(|| format!("Cannot load catalog {catalog_path}"))?;
    let store = TelemetryStore::open(db)?;
    store.migrate()?;

    let mut run = TelemetryRun::new(config, catalog, store, seed)?;
    let roster = run.roster(players);
    let reports = run.run_days(start_date, days, &roster)?;
    log::info!("run seed={seed} finished: {} days generated", reports.len());

    print_summary(&run, &reports, players)?;
    Ok(())
}

fn print_summary(run: &TelemetryRun, reports: &[DayReport], players: usize) -> Result<()> {
    let summary = RunSummary {
        seed: run.seed,
        days: reports.len(),
        players,
        sessions: reports.iter().map(|r| r.sessions).sum(),
        heartbeats: reports.iter().map(|r| r.heartbeats).sum(),
        transactions: reports.iter().map(|r| r.transactions).sum(),
        reports: reports
            .iter()
            .map(|r| DaySummary {
                date: r.date.to_string(),
                sessions: r.sessions,
                kills: r.kills,
                purchasing_players: r.purchasing_player_days,
                transactions: r.transactions,
            })
            .collect(),
    };

    println!("=== RUN SUMMARY ===");
    println!("  sessions:       {}", summary.sessions);
    println!("  heartbeats:     {}", summary.heartbeats);
    println!("  transactions:   {}", summary.transactions);
    let store = run.store();
    println!(
        "  rows:           event_session={} fact_session={} event_transaction={}",
        store.row_count(RAW_SCHEMA, EVENT_SESSION)?,
        store.row_count(STAGE_SCHEMA, FACT_SESSION)?,
        store.row_count(RAW_SCHEMA, EVENT_TRANSACTION)?,
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
