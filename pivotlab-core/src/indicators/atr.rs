//! Average True Range (ATR), simple-average variant.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR[t] is the plain mean of the last `period` true ranges.
//! Both series are rounded to the level precision at every step.

use rust_decimal::Decimal;

use crate::domain::Bar;
use crate::levels::round_level;

/// Compute the True Range series from bars.
///
/// TR[0] uses the first bar's own close as the previous close, which reduces
/// to high - low for any bar whose close lies inside its range.
pub fn true_range(bars: &[Bar]) -> Vec<Decimal> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let prev_close = if i == 0 { bar.close } else { bars[i - 1].close };
            let tr = (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs());
            round_level(tr)
        })
        .collect()
}

/// Simple moving average of the true range.
///
/// Index `t` is `None` until `t >= period - 1`.
pub fn atr_sma(bars: &[Bar], period: usize) -> Vec<Option<Decimal>> {
    let tr = true_range(bars);
    let n = tr.len();
    let mut out = vec![None; n];
    if period == 0 || n < period {
        return out;
    }

    let divisor = Decimal::from(period as u64);
    let mut window_sum: Decimal = tr[..period].iter().copied().sum();
    out[period - 1] = Some(round_level(window_sum / divisor));

    for i in period..n {
        window_sum += tr[i] - tr[i - period];
        out[i] = Some(round_level(window_sum / divisor));
    }

    out
}
