use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Quantities strictly below this are reported as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Stock label derived from a quantity. Never accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock,
}

impl StockStatus {
    /// Total over every integer: zero and negative quantities are low stock.
    pub fn from_quantity(quantidade: i64) -> Self {
        if quantidade < LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "Em Estoque",
            StockStatus::LowStock => "Baixo Estoque",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted product row. Also the response shape of every endpoint that
/// returns a product, so `status` always comes from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub nome: String,
    pub quantidade: i64,
    pub status: String,
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body of `POST /produtos`. A `status` key in the JSON is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub nome: String,
    #[serde(deserialize_with = "lax_i64")]
    pub quantidade: i64,
}

impl CreateProduct {
    pub fn status(&self) -> StockStatus {
        StockStatus::from_quantity(self.quantidade)
    }
}

/// Body of `PUT /produtos/:id`. Only the quantity can change.
#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    #[serde(deserialize_with = "lax_i64")]
    pub quantidade: i64,
}

impl UpdateProduct {
    pub fn status(&self) -> StockStatus {
        StockStatus::from_quantity(self.quantidade)
    }
}

/// Accepts JSON integers, integral floats (`10.0`) and integer strings
/// (`"10"`, surrounding whitespace allowed). Fractions, booleans and
/// anything else are rejected.
fn lax_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LaxI64;

    impl<'de> Visitor<'de> for LaxI64 {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a valid integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(LaxI64)
}
