//! Product catalog: typed product rows, JSON loading and seed checks.

use crate::error::{GenError, GenResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Cycle {
    M,
    Y,
}

impl Cycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M => "M",
            Self::Y => "Y",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionType {
    BattlePass,
    Emote,
    Skin,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BattlePass => "BattlePass",
            Self::Emote => "Emote",
            Self::Skin => "Skin",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tier {
    Premium,
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: i64,
    pub product_sku: String,
    pub purchase_price: f64,
    pub is_recurring: bool,
    #[serde(
        default,
        serialize_with = "cycle_to_str",
        deserialize_with = "cycle_from_str"
    )]
    pub cycle: Option<Cycle>,
    pub transaction_type: TransactionType,
    pub tier: Tier,
    pub product_name: String,
    pub created_at: String,
    pub last_modified_at: String,
}

/// Absent cycles are written as an empty string, as the seed file does.
pub(crate) fn cycle_to_str<S: Serializer>(cycle: &Option<Cycle>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(cycle.map(|c| c.as_str()).unwrap_or(""))
}

pub(crate) fn cycle_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Cycle>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("M") => Ok(Some(Cycle::M)),
        Some("Y") => Ok(Some(Cycle::Y)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "cycle must be 'M', 'Y' or empty, got '{other}'"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    products: Vec<Product>,
}

/// An ordered, validated-on-demand list of products.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Load `{"products": [...]}` from a JSON file.
    pub fn load(path: &Path) -> GenResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_json::from_str(&content)?;
        Ok(Self::new(file.products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn by_sku(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.product_sku == sku)
    }

    /// Seed integrity checks. Reports the first violation found.
    pub fn validate(&self) -> GenResult<()> {
        if self.products.is_empty() {
            return Err(GenError::Validation("catalog is empty".into()));
        }

        let mut ids = HashSet::new();
        let mut skus = HashSet::new();
        for p in &self.products {
            if !ids.insert(p.product_id) {
                return Err(GenError::Validation(format!(
                    "duplicate product_id {}",
                    p.product_id
                )));
            }
            if !skus.insert(p.product_sku.as_str()) {
                return Err(GenError::Validation(format!(
                    "duplicate product_sku {}",
                    p.product_sku
                )));
            }
            if !is_valid_sku(&p.product_sku) {
                return Err(GenError::Validation(format!(
                    "invalid SKU format: {}",
                    p.product_sku
                )));
            }
            if p.purchase_price.is_nan() || p.purchase_price <= 0.0 {
                return Err(GenError::Validation(format!(
                    "{} has non-positive purchase_price {}",
                    p.product_sku, p.purchase_price
                )));
            }
            if p.is_recurring != p.cycle.is_some() {
                return Err(GenError::Validation(format!(
                    "{}: cycle must be set exactly when is_recurring",
                    p.product_sku
                )));
            }
        }
        Ok(())
    }
}

/// `SKU-` followed by at least four digits.
pub fn is_valid_sku(sku: &str) -> bool {
    match sku.strip_prefix("SKU-") {
        Some(digits) => digits.len() >= 4 && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
