//! JSONL file store: append-only trade events and trend points per instrument.
//!
//! One JSON object per line, one file per instrument and record kind:
//! `<dir>/<instrument>.trades.jsonl` and `<dir>/<instrument>.trend.jsonl`.
//! Malformed lines are skipped with a warning, and an append after a torn
//! final write first terminates the fragment, so the new record always lands
//! on its own line.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pivotlab_core::domain::{TradeEvent, TrendPoint};
use pivotlab_core::store::{StoreError, TradeEventStore, TrendStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub struct JsonlStore {
    dir: PathBuf,
    // Serializes the read-compare-append sequence within this process.
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn trades_path(&self, instrument: &str) -> PathBuf {
        self.dir
            .join(format!("{}.trades.jsonl", file_stem(instrument)))
    }

    pub fn trend_path(&self, instrument: &str) -> PathBuf {
        self.dir.join(format!("{}.trend.jsonl", file_stem(instrument)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

/// Instrument name made safe for use as a file name.
///
/// ASCII letters, digits, `-` and `.` pass through; every other byte becomes
/// `_` followed by two hex digits (`NSE:INFY` -> `NSE_3AINFY`). `_` itself is
/// escaped, so distinct instruments never share a file.
pub fn file_stem(instrument: &str) -> String {
    let mut stem = String::with_capacity(instrument.len());
    for byte in instrument.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.') {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02X}"));
        }
    }
    stem
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (idx, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), line = idx + 1, error = %e, "skipping malformed line"),
        }
    }
    Ok(records)
}

fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let json =
        serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    if ends_mid_line(&mut file)? {
        warn!(path = %path.display(), "terminating torn final line before append");
        writeln!(file)?;
    }
    writeln!(file, "{json}")?;
    file.flush()?;
    Ok(())
}

/// True when the file is non-empty and its last byte is not a newline.
fn ends_mid_line(file: &mut fs::File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl TradeEventStore for JsonlStore {
    fn find_last_event(&self, instrument: &str) -> Result<Option<TradeEvent>, StoreError> {
        Ok(read_records::<TradeEvent>(&self.trades_path(instrument))?.pop())
    }

    fn append_event(
        &self,
        event: &TradeEvent,
        expected_last: Option<&TradeEvent>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let path = self.trades_path(&event.instrument);
        let current = read_records::<TradeEvent>(&path)?.pop();
        if current.as_ref() != expected_last {
            return Err(StoreError::Conflict {
                instrument: event.instrument.clone(),
            });
        }
        append_record(&path, event)
    }

    fn events(&self, instrument: &str) -> Result<Vec<TradeEvent>, StoreError> {
        read_records(&self.trades_path(instrument))
    }
}

impl TrendStore for JsonlStore {
    fn find_last_trend(&self, instrument: &str) -> Result<Option<TrendPoint>, StoreError> {
        Ok(read_records::<TrendPoint>(&self.trend_path(instrument))?.pop())
    }

    fn save_trend(&self, point: &TrendPoint) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        append_record(&self.trend_path(&point.instrument), point)
    }

    fn trends(&self, instrument: &str) -> Result<Vec<TrendPoint>, StoreError> {
        read_records(&self.trend_path(instrument))
    }
}
