//! Report export: paired trade tape and trend tape as CSV and JSON.
//!
//! Timestamps are stored in UTC and rendered in the configured report timezone.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use pivotlab_core::domain::{TradeEvent, TrendPoint};
use pivotlab_core::report::{pair_trades, summarize, PairSummary, TradePair};
use serde::{Deserialize, Serialize};

use crate::store::file_stem;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything written to `report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeReport {
    pub instrument: String,
    pub timezone: String,
    pub summary: PairSummary,
    pub pairs: Vec<TradePair>,
}

impl TradeReport {
    pub fn build(instrument: &str, tz: Tz, events: &[TradeEvent]) -> Self {
        let pairs = pair_trades(events);
        Self {
            instrument: instrument.to_string(),
            timezone: tz.name().to_string(),
            summary: summarize(&pairs),
            pairs,
        }
    }
}

fn local(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format(TIME_FORMAT).to_string()
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Paired trades as CSV.
///
/// Columns: signal, entry_reason, entry_time, entry_price, exit_reason,
/// exit_time, exit_price, profit_loss. Open pairs leave the exit columns empty.
pub fn export_trades_csv(pairs: &[TradePair], tz: Tz) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "signal",
        "entry_reason",
        "entry_time",
        "entry_price",
        "exit_reason",
        "exit_time",
        "exit_price",
        "profit_loss",
    ])?;

    for pair in pairs {
        let entry = &pair.entry;
        let (exit_reason, exit_time, exit_price) = match &pair.exit {
            Some(exit) => (
                exit.reason.clone(),
                local(exit.timestamp, tz),
                exit.price.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        let profit_loss = pair
            .profit_loss
            .map(|pl| pl.to_string())
            .unwrap_or_default();
        wtr.write_record([
            entry.signal.as_str(),
            entry.reason.as_str(),
            local(entry.entry_time, tz).as_str(),
            entry.price.to_string().as_str(),
            exit_reason.as_str(),
            exit_time.as_str(),
            exit_price.as_str(),
            profit_loss.as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trend flips as CSV.
pub fn export_trend_csv(points: &[TrendPoint], tz: Tz) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "time",
        "trend",
        "active_band",
        "upper_band",
        "lower_band",
        "open",
        "high",
        "low",
        "close",
    ])?;
    for p in points {
        wtr.write_record([
            local(p.timestamp, tz),
            p.trend.to_string(),
            p.active_band.to_string(),
            p.upper_band.to_string(),
            p.lower_band.to_string(),
            p.open.to_string(),
            p.high.to_string(),
            p.low.to_string(),
            p.close.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the report set for one instrument into `output_dir`.
///
/// Files: `<instrument>.report.json`, `<instrument>.trades.csv`,
/// `<instrument>.trend.csv`. Returns the paths written.
pub fn save_report(
    instrument: &str,
    events: &[TradeEvent],
    trends: &[TrendPoint],
    tz: Tz,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;

    let stem = file_stem(instrument);
    let report = TradeReport::build(instrument, tz, events);

    let json_path = output_dir.join(format!("{stem}.report.json"));
    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let trades_path = output_dir.join(format!("{stem}.trades.csv"));
    std::fs::write(&trades_path, export_trades_csv(&report.pairs, tz)?)
        .with_context(|| format!("failed to write {}", trades_path.display()))?;

    let trend_path = output_dir.join(format!("{stem}.trend.csv"));
    std::fs::write(&trend_path, export_trend_csv(trends, tz)?)
        .with_context(|| format!("failed to write {}", trend_path.display()))?;

    Ok(vec![json_path, trades_path, trend_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_in_report_timezone() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 3, 45, 0).unwrap();
        assert_eq!(local(ts, chrono_tz::Asia::Kolkata), "2025-03-14 09:15:00");
        assert_eq!(local(ts, chrono_tz::UTC), "2025-03-14 03:45:00");
    }

    #[test]
    fn empty_inputs_produce_headers_only() {
        let csv = export_trades_csv(&[], chrono_tz::UTC).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("signal,entry_reason"));

        let csv = export_trend_csv(&[], chrono_tz::UTC).unwrap();
        assert!(csv.starts_with("time,trend"));
    }
}
