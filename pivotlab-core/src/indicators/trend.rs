//! Trend estimator: ATR-banded channel with a trailing flip reference.
//!
//! Inherently sequential: the reference band carried from one bar to the next
//! decides whether the following close flips the trend.
//!
//! Only the final bar's state is returned. Callers that want a tape run the
//! estimator over a rolling window (see the runner's trend job).

use rust_decimal::Decimal;

use crate::domain::{Bar, Trend, TrendPoint};
use crate::error::EngineError;
use crate::indicators::atr::atr_sma;
use crate::levels::round_level;

/// Minimum number of bars `estimate_trend` needs for a given period.
pub fn required_bars(period: usize) -> usize {
    period + 1
}

/// Estimate the trend at the last bar of `bars`.
///
/// - ATR is a simple mean of true range over `period` bars.
/// - Bands: midpoint ± multiplier × ATR.
/// - Seed at index `period`: bullish when close > upper band.
/// - After the seed: close above the reference → bullish (reference = lower band);
///   close below → bearish (reference = upper band); equal → unchanged.
pub fn estimate_trend(
    instrument: &str,
    bars: &[Bar],
    period: usize,
    multiplier: Decimal,
) -> Result<TrendPoint, EngineError> {
    if period == 0 {
        return Err(EngineError::InvalidInput("trend period must be >= 1".into()));
    }
    if multiplier <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(format!(
            "trend multiplier must be > 0, got {multiplier}"
        )));
    }
    let needed = required_bars(period);
    if bars.len() < needed {
        return Err(EngineError::InsufficientData {
            needed,
            got: bars.len(),
        });
    }
    for bar in bars {
        bar.validate()?;
    }

    let atr = atr_sma(bars, period);

    let mut trend = Trend::Bearish;
    let mut reference = Decimal::ZERO;
    let mut bands = (Decimal::ZERO, Decimal::ZERO);

    for i in period..bars.len() {
        let Some(atr_i) = atr[i] else {
            continue;
        };
        let bar = &bars[i];
        let mid = bar.midpoint();
        let width = multiplier
            .checked_mul(atr_i)
            .ok_or_else(|| band_overflow(bar))?;
        let upper = round_level(mid.checked_add(width).ok_or_else(|| band_overflow(bar))?);
        let lower = round_level(mid.checked_sub(width).ok_or_else(|| band_overflow(bar))?);

        if i == period {
            if bar.close > upper {
                trend = Trend::Bullish;
                reference = lower;
            } else {
                trend = Trend::Bearish;
                reference = upper;
            }
        } else if bar.close > reference {
            trend = Trend::Bullish;
            reference = lower;
        } else if bar.close < reference {
            trend = Trend::Bearish;
            reference = upper;
        }

        bands = (upper, lower);
    }

    let last = &bars[bars.len() - 1];
    Ok(TrendPoint {
        instrument: instrument.to_string(),
        trend,
        upper_band: bands.0,
        lower_band: bands.1,
        active_band: reference,
        reference_price: last.close,
        open: last.open,
        high: last.high,
        low: last.low,
        close: last.close,
        timestamp: last.timestamp,
    })
}

fn band_overflow(bar: &Bar) -> EngineError {
    EngineError::InvalidInput(format!(
        "trend band overflowed at {}; multiplier too large",
        bar.timestamp
    ))
}
