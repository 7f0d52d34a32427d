//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Largest price a bar may carry. Keeps every level and band derived from it
/// inside the decimal range.
pub const MAX_PRICE_UNITS: i64 = 1_000_000_000_000_000;

/// OHLC bar for one instrument over one interval (a trading day or an intraday candle).
///
/// Prices are exact decimals. Floating point input goes through [`price_from_f64`],
/// which is where non-finite values are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Build a bar from floating point prices, rejecting NaN and infinities.
    pub fn from_f64(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            timestamp,
            open: price_from_f64("open", open)?,
            high: price_from_f64("high", high)?,
            low: price_from_f64("low", low)?,
            close: price_from_f64("close", close)?,
        })
    }

    /// Basic sanity check used before any level or range computation.
    ///
    /// Only high >= low and non-negative, bounded prices are enforced. Open and close are
    /// not required to sit inside the range: reference bars assembled from
    /// separate feeds occasionally violate that and are still usable.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.high < self.low {
            return Err(EngineError::InvalidInput(format!(
                "bar at {}: high {} is below low {}",
                self.timestamp, self.high, self.low
            )));
        }
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(EngineError::InvalidInput(format!(
                    "bar at {}: {field} is negative ({value})",
                    self.timestamp
                )));
            }
            if value > Decimal::from(MAX_PRICE_UNITS) {
                return Err(EngineError::InvalidInput(format!(
                    "bar at {}: {field} exceeds {MAX_PRICE_UNITS} ({value})",
                    self.timestamp
                )));
            }
        }
        Ok(())
    }

    /// High minus low.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Midpoint of the bar's range.
    pub fn midpoint(&self) -> Decimal {
        (self.high + self.low) / Decimal::TWO
    }
}

/// Convert a floating point price into a decimal.
pub fn price_from_f64(field: &str, value: f64) -> Result<Decimal, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "{field} must be finite, got {value}"
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| EngineError::InvalidInput(format!("{field} is out of range: {value}")))
}
