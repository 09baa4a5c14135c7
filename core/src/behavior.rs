//! Purchasing behavior model.
//!
//! Every (player, day) gets one BehaviorClass. Assignment is a strategy
//! object rather than a free function so callers can swap in a fixed
//! class (tests) or a differently weighted distribution.

use crate::{
    config::{BehaviorBucket, BehaviorBuckets},
    rng::GenRng,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorClass {
    NoPurchase,
    Minnow,
    Whale,
}

impl BehaviorClass {
    pub const ALL: [BehaviorClass; 3] = [Self::NoPurchase, Self::Minnow, Self::Whale];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPurchase => "no_purchase",
            Self::Minnow => "minnow",
            Self::Whale => "whale",
        }
    }

    pub fn bucket<'a>(&self, buckets: &'a BehaviorBuckets) -> &'a BehaviorBucket {
        match self {
            Self::NoPurchase => &buckets.no_purchase,
            Self::Minnow => &buckets.minnow,
            Self::Whale => &buckets.whale,
        }
    }
}

impl fmt::Display for BehaviorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assigns a behavior class, consuming entropy only from `rng`.
pub trait BehaviorModel {
    fn assign(&self, rng: &mut GenRng) -> BehaviorClass;
}

/// Categorical draw over the bucket weights.
#[derive(Debug, Clone, Default)]
pub struct WeightedBehavior {
    buckets: BehaviorBuckets,
}

impl WeightedBehavior {
    pub fn new(buckets: BehaviorBuckets) -> Self {
        Self { buckets }
    }
}

impl BehaviorModel for WeightedBehavior {
    fn assign(&self, rng: &mut GenRng) -> BehaviorClass {
        let weights = BehaviorClass::ALL.map(|c| c.bucket(&self.buckets).probability);
        BehaviorClass::ALL[rng.pick_weighted(&weights)]
    }
}

/// Always returns the same class.
#[derive(Debug, Clone, Copy)]
pub struct FixedBehavior(pub BehaviorClass);

impl BehaviorModel for FixedBehavior {
    fn assign(&self, _rng: &mut GenRng) -> BehaviorClass {
        self.0
    }
}

/// Draw from the default distribution.
pub fn assign_behavior(rng: &mut GenRng) -> BehaviorClass {
    WeightedBehavior::default().assign(rng)
}
