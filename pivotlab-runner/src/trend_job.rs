//! Rolling trend job: evaluates the trend estimator after every candle and
//! persists only the points where the trend flips.
//!
//! Windows are the most recent `period + 1` bars ending at the current candle.
//! Early in the day the window is topped up from the previous session's
//! candles when they are supplied; otherwise those candles are skipped.

use chrono::Duration;
use pivotlab_core::domain::{Bar, TrendPoint};
use pivotlab_core::error::EngineError;
use pivotlab_core::indicators::{estimate_trend, required_bars};
use pivotlab_core::store::TrendStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrendConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendJobSummary {
    pub instrument: String,
    pub evaluated: usize,
    /// Candles with too little history to fill a window.
    pub skipped: usize,
    /// Points persisted because the trend changed.
    pub saved: Vec<TrendPoint>,
}

/// Run the trend estimator across `candles`, saving flips to `store`.
pub fn run_trend_job(
    store: &dyn TrendStore,
    config: &TrendConfig,
    instrument: &str,
    prior: &[Bar],
    candles: &[Bar],
) -> Result<TrendJobSummary, EngineError> {
    let needed = required_bars(config.period);
    let mut summary = TrendJobSummary {
        instrument: instrument.to_string(),
        ..Default::default()
    };
    let mut last_saved = store.find_last_trend(instrument)?;

    for i in 0..candles.len() {
        let Some(window) = window_ending_at(prior, candles, i, needed) else {
            debug!(instrument, candle = i, "not enough bars for trend window");
            summary.skipped += 1;
            continue;
        };

        let mut point = estimate_trend(instrument, &window, config.period, config.multiplier)?;
        point.timestamp += Duration::minutes(config.candle_minutes);
        summary.evaluated += 1;

        if last_saved.as_ref().map(|p| p.trend) == Some(point.trend) {
            continue;
        }

        store.save_trend(&point)?;
        info!(
            instrument,
            trend = %point.trend,
            active_band = %point.active_band,
            close = %point.close,
            "trend flip saved"
        );
        summary.saved.push(point.clone());
        last_saved = Some(point);
    }

    Ok(summary)
}

/// The last `needed` bars of `prior ++ candles[..=i]`, or `None` if there are fewer.
fn window_ending_at(prior: &[Bar], candles: &[Bar], i: usize, needed: usize) -> Option<Vec<Bar>> {
    let today = &candles[..=i];
    if today.len() >= needed {
        return Some(today[today.len() - needed..].to_vec());
    }
    let missing = needed - today.len();
    if prior.len() < missing {
        return None;
    }
    let mut window = prior[prior.len() - missing..].to_vec();
    window.extend_from_slice(today);
    Some(window)
}
