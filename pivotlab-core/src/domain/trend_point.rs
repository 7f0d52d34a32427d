//! TrendPoint: the summarized output of one trend-estimation run.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => f.write_str("bullish"),
            Trend::Bearish => f.write_str("bearish"),
        }
    }
}

/// Trend state at the final bar of an estimation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub instrument: Symbol,
    pub trend: Trend,
    pub upper_band: Decimal,
    pub lower_band: Decimal,
    /// Trailing band the flip rule compares closes against.
    pub active_band: Decimal,
    /// Close of the final bar.
    pub reference_price: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub timestamp: DateTime<Utc>,
}
