use crate::error::{GenError, GenResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters of one purchasing behavior class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BehaviorBucket {
    /// Relative weight; normalised against the other buckets when sampling.
    pub probability: f64,
    pub min_purchases: u32,
    pub max_purchases: u32,
    pub min_amount: f64,
    pub max_amount: f64,
}

impl BehaviorBucket {
    fn validate(&self, name: &str) -> GenResult<()> {
        if self.probability.is_nan() || self.probability < 0.0 {
            return Err(GenError::Validation(format!(
                "{name}: probability must be >= 0, got {}",
                self.probability
            )));
        }
        if self.min_purchases > self.max_purchases {
            return Err(GenError::Validation(format!(
                "{name}: min_purchases {} > max_purchases {}",
                self.min_purchases, self.max_purchases
            )));
        }
        if self.min_amount.is_nan() || self.min_amount > self.max_amount || self.min_amount < 0.0 {
            return Err(GenError::Validation(format!(
                "{name}: amount range [{}, {}] is invalid",
                self.min_amount, self.max_amount
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BehaviorBuckets {
    pub no_purchase: BehaviorBucket,
    pub minnow: BehaviorBucket,
    pub whale: BehaviorBucket,
}

impl Default for BehaviorBuckets {
    fn default() -> Self {
        Self {
            no_purchase: BehaviorBucket {
                probability: 0.65,
                min_purchases: 0,
                max_purchases: 0,
                min_amount: 0.0,
                max_amount: 0.0,
            },
            minnow: BehaviorBucket {
                probability: 0.25,
                min_purchases: 1,
                max_purchases: 2,
                min_amount: 0.99,
                max_amount: 9.99,
            },
            whale: BehaviorBucket {
                probability: 0.05,
                min_purchases: 3,
                max_purchases: 10,
                min_amount: 10.0,
                max_amount: 99.99,
            },
        }
    }
}

impl BehaviorBuckets {
    pub fn validate(&self) -> GenResult<()> {
        self.no_purchase.validate("no_purchase")?;
        self.minnow.validate("minnow")?;
        self.whale.validate("whale")?;
        let total = self.no_purchase.probability + self.minnow.probability + self.whale.probability;
        if total <= 0.0 {
            return Err(GenError::Validation(
                "behavior probabilities sum to zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub behavior: BehaviorBuckets,
    /// Session kill totals are drawn from [kills_min, kills_max).
    pub kills_min: u32,
    pub kills_max: u32,
    pub session_minutes_min: u32,
    pub session_minutes_max: u32,
    pub heartbeat_interval_secs: u32,
    pub players_per_session_min: usize,
    pub players_per_session_max: usize,
    pub sessions_per_day: usize,
    pub session_dir: PathBuf,
    pub transaction_dir: PathBuf,
    /// When false only JSON files are written for raw sessions.
    pub write_to_db: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            behavior: BehaviorBuckets::default(),
            kills_min: 10,
            kills_max: 60,
            session_minutes_min: 10,
            session_minutes_max: 40,
            heartbeat_interval_secs: 30,
            players_per_session_min: 4,
            players_per_session_max: 10,
            sessions_per_day: 20,
            session_dir: PathBuf::from("data/sessions"),
            transaction_dir: PathBuf::from("data/transactions"),
            write_to_db: true,
        }
    }
}

impl GeneratorConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GeneratorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Small, fast setup for tests. Output dirs still need overriding.
    pub fn default_test() -> Self {
        Self {
            session_minutes_min: 2,
            session_minutes_max: 5,
            heartbeat_interval_secs: 60,
            players_per_session_min: 2,
            players_per_session_max: 4,
            sessions_per_day: 3,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GenResult<()> {
        self.behavior.validate()?;
        if self.kills_min >= self.kills_max {
            return Err(GenError::Validation(format!(
                "kill range [{}, {}) is empty",
                self.kills_min, self.kills_max
            )));
        }
        if self.session_minutes_min == 0 || self.session_minutes_min > self.session_minutes_max {
            return Err(GenError::Validation(format!(
                "session length range [{}, {}] minutes is invalid",
                self.session_minutes_min, self.session_minutes_max
            )));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(GenError::Validation(
                "heartbeat_interval_secs must be > 0".into(),
            ));
        }
        if self.players_per_session_min == 0
            || self.players_per_session_min > self.players_per_session_max
        {
            return Err(GenError::Validation(format!(
                "players per session range [{}, {}] is invalid",
                self.players_per_session_min, self.players_per_session_max
            )));
        }
        Ok(())
    }
}
