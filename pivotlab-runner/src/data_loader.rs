//! Bar loading from CSV files.
//!
//! Files carry a `timestamp,open,high,low,close` header with RFC 3339
//! timestamps. Every row is parsed into exact decimals and validated; a bad
//! row fails the whole load with its line number.
//!
//! [`CsvMarketData`] serves loaded bars through the core `MarketDataSource`
//! trait, so the replay path is the same one a live broker source would use.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use pivotlab_core::data::{BrokerSession, DataError, MarketDataSource};
use pivotlab_core::domain::Bar;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("invalid bar at line {line}: {reason}")]
    InvalidBar { line: u64, reason: String },
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

/// Load bars from a CSV file, sorted oldest first.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let path_str = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path_str.clone(),
        source,
    })?;
    let bars = read_bars(file).map_err(|e| match e {
        LoadError::Csv { source, .. } => LoadError::Csv {
            path: path_str.clone(),
            source,
        },
        other => other,
    })?;
    debug!(path = %path_str, bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Parse bars from any reader. Used by [`load_bars_csv`] and by tests.
pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();

    for record in rdr.deserialize::<CsvBar>() {
        let row = record.map_err(|source| LoadError::Csv {
            path: String::new(),
            source,
        })?;
        let bar = Bar::new(row.timestamp, row.open, row.high, row.low, row.close);
        bar.validate().map_err(|e| LoadError::InvalidBar {
            line: bars.len() as u64 + 2,
            reason: e.to_string(),
        })?;
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// File-backed market data: daily bars for reference, intraday candles for samples.
///
/// Instruments are keyed by name; each has its own daily and intraday series.
#[derive(Debug, Default)]
pub struct CsvMarketData {
    daily: HashMap<String, Vec<Bar>>,
    intraday: HashMap<String, Vec<Bar>>,
}

impl CsvMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_daily(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.daily.insert(instrument.to_string(), bars);
        self
    }

    pub fn with_intraday(mut self, instrument: &str, bars: Vec<Bar>) -> Self {
        self.intraday.insert(instrument.to_string(), bars);
        self
    }

    /// Load both series for one instrument from disk.
    pub fn from_files(
        instrument: &str,
        daily: &Path,
        intraday: &Path,
    ) -> Result<Self, LoadError> {
        Ok(Self::new()
            .with_daily(instrument, load_bars_csv(daily)?)
            .with_intraday(instrument, load_bars_csv(intraday)?))
    }

    /// Distinct session dates present in the intraday series, ascending.
    pub fn session_dates(&self, instrument: &str) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .intraday
            .get(instrument)
            .map(|bars| bars.iter().map(|b| b.timestamp.date_naive()).collect())
            .unwrap_or_default();
        dates.sort();
        dates.dedup();
        dates
    }

    fn known(&self, instrument: &str) -> Result<(), DataError> {
        if self.daily.contains_key(instrument) || self.intraday.contains_key(instrument) {
            Ok(())
        } else {
            Err(DataError::InstrumentNotFound {
                instrument: instrument.to_string(),
            })
        }
    }
}

impl MarketDataSource for CsvMarketData {
    fn name(&self) -> &str {
        "csv"
    }

    fn reference_bar(
        &self,
        _session: &BrokerSession,
        instrument: &str,
        session_date: NaiveDate,
    ) -> Result<Option<Bar>, DataError> {
        self.known(instrument)?;
        let bar = self.daily.get(instrument).and_then(|bars| {
            bars.iter()
                .rev()
                .find(|b| b.timestamp.date_naive() < session_date)
                .cloned()
        });
        if bar.is_none() {
            warn!(instrument, %session_date, "no daily bar before session date");
        }
        Ok(bar)
    }

    fn intraday_bars(
        &self,
        _session: &BrokerSession,
        instrument: &str,
        date: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        self.known(instrument)?;
        Ok(self
            .intraday
            .get(instrument)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp.date_naive() == date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
