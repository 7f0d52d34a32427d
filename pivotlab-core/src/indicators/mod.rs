//! Bar-window indicators: true range, ATR, and the banded trend estimator.

pub mod atr;
pub mod trend;

pub use atr::{atr_sma, true_range};
pub use trend::{estimate_trend, required_bars};

/// Create intraday bars from (open, high, low, close) tuples for testing.
///
/// Bars are spaced three minutes apart starting at 09:15 IST (03:45 UTC).
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc
        .with_ymd_and_hms(2025, 3, 14, 3, 45, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            crate::domain::Bar::from_f64(
                base + chrono::Duration::minutes(3 * i as i64),
                open,
                high,
                low,
                close,
            )
            .unwrap()
        })
        .collect()
}
