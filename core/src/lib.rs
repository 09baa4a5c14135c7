//! Synthetic game-telemetry generator.
//!
//! Fabricates player sessions, kill/death summaries and in-game purchases,
//! and lands them as JSON files plus rows in a SQLite warehouse.

pub mod behavior;
pub mod catalog;
pub mod config;
pub mod error;
pub mod rng;
pub mod run;
pub mod session;
pub mod store;
pub mod summarizer;
pub mod transaction;
pub mod types;
