//! End-to-end runner tests against temp directories.
//!
//! Tests:
//! 1. CSV replay through the JSONL store: alternation, dedup, counts, config id
//! 2. Replaying the same session twice does not double-book
//! 3. Parallel replay across instruments
//! 4. Trend job persists only flips, stamped at candle close
//! 5. Report export writes paired trades and trend tape
//! 6. Malformed store lines are skipped; appends after a torn line survive

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use pivotlab_core::data::BrokerSession;
use pivotlab_core::domain::{PositionType, Signal, Trend};
use pivotlab_core::store::{TradeEventStore, TrendStore};
use pivotlab_runner::config::{PivotConfig, TrendConfig};
use pivotlab_runner::data_loader::{load_bars_csv, CsvMarketData};
use pivotlab_runner::export::save_report;
use pivotlab_runner::replay::{replay_many, replay_session};
use pivotlab_runner::store::JsonlStore;
use pivotlab_runner::trend_job::run_trend_job;
use rust_decimal::Decimal;
use tempfile::TempDir;

const DAILY: &str = "\
timestamp,open,high,low,close
2025-03-12T10:00:00Z,90,98,85,92
2025-03-13T10:00:00Z,95,100,80,95
";

// (open, close) per 3-minute candle on 2025-03-14 from 09:15 IST.
const CANDLES: &[(&str, &str)] = &[
    ("93.5", "94"),   // slightly above TC: Buy, Entry
    ("94", "94.2"),   // Buy again: duplicate
    ("94", "89.5"),   // slightly below BC: Sell, Exit
    ("90", "91"),     // inside CPR: no action
    ("91", "94"),     // Buy, Entry
];

fn candle_csv() -> String {
    let mut out = String::from("timestamp,open,high,low,close\n");
    for (i, (open, close)) in CANDLES.iter().enumerate() {
        let o: Decimal = open.parse().unwrap();
        let c: Decimal = close.parse().unwrap();
        let minute = 45 + 3 * i;
        out.push_str(&format!(
            "2025-03-14T03:{minute:02}:00Z,{o},{},{},{c}\n",
            o.max(c) + Decimal::new(5, 1),
            o.min(c) - Decimal::new(5, 1),
        ));
    }
    out
}

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn config() -> PivotConfig {
    PivotConfig::from_toml("[levels]\nbuffer = \"1\"\n").unwrap()
}

fn source(dir: &Path, instrument: &str) -> CsvMarketData {
    let daily = write(dir, "daily.csv", DAILY);
    let candles = write(dir, "candles.csv", &candle_csv());
    CsvMarketData::from_files(instrument, &daily, &candles).unwrap()
}

// ── 1. Replay ────────────────────────────────────────────────────────

#[test]
fn replay_persists_alternating_events() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path(), "NSE:ACME");
    let store = JsonlStore::new(dir.path().join("store"));
    let config = config();

    let summary = replay_session(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config,
        "NSE:ACME",
        session_date(),
    )
    .unwrap();

    assert_eq!(summary.samples, 5);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.config_id, config.config_id());
    assert_eq!(summary.levels.tc, "93.33".parse::<Decimal>().unwrap());

    let kinds: Vec<(Signal, Option<PositionType>)> = summary
        .recorded
        .iter()
        .map(|e| (e.signal, e.position_type))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (Signal::Buy, Some(PositionType::Entry)),
            (Signal::Sell, Some(PositionType::Exit)),
            (Signal::Buy, Some(PositionType::Entry)),
        ]
    );

    let persisted = store.events("NSE:ACME").unwrap();
    assert_eq!(persisted, summary.recorded);
    assert!(store.trades_path("NSE:ACME").ends_with("NSE_3AACME.trades.jsonl"));
}

// ── 2. Idempotent replays ────────────────────────────────────────────

#[test]
fn second_replay_continues_from_stored_state() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path(), "ACME");
    let store = JsonlStore::new(dir.path().join("store"));
    let config = config();
    let broker = BrokerSession::anonymous();

    replay_session(&source, &broker, &store, &config, "ACME", session_date()).unwrap();
    let again =
        replay_session(&source, &broker, &store, &config, "ACME", session_date()).unwrap();

    // Last stored event is a Buy Entry, so the opening Buy is a duplicate.
    assert_eq!(again.recorded.first().map(|e| e.signal), Some(Signal::Sell));
    let events = store.events("ACME").unwrap();
    for pair in events.windows(2) {
        assert_ne!(pair[0].signal, pair[1].signal);
    }
}

// ── 3. Parallel replay ───────────────────────────────────────────────

#[test]
fn replay_many_runs_each_instrument() {
    let dir = TempDir::new().unwrap();
    let daily = load_bars_csv(&write(dir.path(), "daily.csv", DAILY)).unwrap();
    let candles = load_bars_csv(&write(dir.path(), "candles.csv", &candle_csv())).unwrap();
    let source = CsvMarketData::new()
        .with_daily("A", daily.clone())
        .with_intraday("A", candles.clone())
        .with_daily("B", daily)
        .with_intraday("B", candles);
    let store = JsonlStore::new(dir.path().join("store"));

    let sessions = vec![
        ("A".to_string(), session_date()),
        ("B".to_string(), session_date()),
        ("C".to_string(), session_date()),
    ];
    let results = replay_many(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config(),
        &sessions,
    );

    assert_eq!(results.len(), 3);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(store.events("A").unwrap().len(), 3);
    assert_eq!(store.events("B").unwrap().len(), 3);
    assert!(store.events("C").unwrap().is_empty());
}

// ── 4. Trend job ─────────────────────────────────────────────────────

const TREND_CANDLES: &str = "\
timestamp,open,high,low,close
2025-03-14T03:45:00Z,99,101,99,100
2025-03-14T03:48:00Z,100,102,100,101
2025-03-14T03:51:00Z,101,103,101,102
2025-03-14T03:54:00Z,102,110,102,110
";

#[test]
fn trend_job_saves_flips_only() {
    let dir = TempDir::new().unwrap();
    let candles = load_bars_csv(&write(dir.path(), "trend.csv", TREND_CANDLES)).unwrap();
    let store = JsonlStore::new(dir.path().join("store"));
    let config = TrendConfig {
        period: 3,
        multiplier: Decimal::new(5, 1),
        candle_minutes: 3,
    };

    let summary = run_trend_job(&store, &config, "ACME", &[], &candles).unwrap();
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.saved.len(), 1);

    let point = &summary.saved[0];
    assert_eq!(point.trend, Trend::Bullish);
    assert_eq!(point.upper_band, Decimal::from(108));
    assert_eq!(
        point.timestamp,
        candles[3].timestamp + chrono::Duration::minutes(3)
    );

    // Same tape again: trend unchanged, nothing new persisted.
    let again = run_trend_job(&store, &config, "ACME", &[], &candles).unwrap();
    assert!(again.saved.is_empty());
    assert_eq!(store.trends("ACME").unwrap().len(), 1);
}

#[test]
fn trend_job_uses_prior_session_to_fill_window() {
    let dir = TempDir::new().unwrap();
    let candles = load_bars_csv(&write(dir.path(), "trend.csv", TREND_CANDLES)).unwrap();
    let store = JsonlStore::new(dir.path().join("store"));
    let config = TrendConfig {
        period: 3,
        multiplier: Decimal::new(5, 1),
        candle_minutes: 3,
    };

    let summary = run_trend_job(&store, &config, "ACME", &candles[..3], &candles[3..]).unwrap();
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.evaluated, 1);
}

// ── 5. Report export ─────────────────────────────────────────────────

#[test]
fn report_writes_pairs_and_trend() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path(), "ACME");
    let store = JsonlStore::new(dir.path().join("store"));
    let config = config();
    replay_session(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config,
        "ACME",
        session_date(),
    )
    .unwrap();

    let out = dir.path().join("out");
    let events = store.events("ACME").unwrap();
    let paths = save_report(
        "ACME",
        &events,
        &[],
        config.report_timezone().unwrap(),
        &out,
    )
    .unwrap();
    assert_eq!(paths.len(), 3);

    let trades = std::fs::read_to_string(out.join("ACME.trades.csv")).unwrap();
    let rows: Vec<&str> = trades.lines().collect();
    // Header, one closed pair, one open entry.
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("Buy,"));
    assert!(rows[1].contains("2025-03-14 09:15:00"));
    assert!(rows[1].ends_with(",-4.5"));
    assert!(rows[2].ends_with(",,,,"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("ACME.report.json")).unwrap())
            .unwrap();
    assert_eq!(json["summary"]["closed"], 1);
    assert_eq!(json["summary"]["open"], 1);
}

// ── 6. Malformed lines ───────────────────────────────────────────────

#[test]
fn malformed_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path(), "ACME");
    let store = JsonlStore::new(dir.path().join("store"));
    replay_session(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config(),
        "ACME",
        session_date(),
    )
    .unwrap();

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(store.trades_path("ACME"))
        .unwrap();
    writeln!(file, "{{\"instrument\": \"ACME\", \"price\":").unwrap();

    let events = store.events("ACME").unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        store.find_last_event("ACME").unwrap().map(|e| e.signal),
        Some(Signal::Buy)
    );
}

#[test]
fn append_after_torn_line_is_readable() {
    let dir = TempDir::new().unwrap();
    let source = source(dir.path(), "ACME");
    let store = JsonlStore::new(dir.path().join("store"));
    let summary = replay_session(
        &source,
        &BrokerSession::anonymous(),
        &store,
        &config(),
        "ACME",
        session_date(),
    )
    .unwrap();
    let last = summary.recorded.last().cloned().unwrap();

    // Partial record with no trailing newline, as left by an interrupted write.
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(store.trades_path("ACME"))
        .unwrap();
    write!(file, "{{\"instrument\":\"ACME\",\"pri").unwrap();
    drop(file);

    let mut next = last.clone();
    next.signal = Signal::Sell;
    next.position_type = Some(PositionType::Exit);
    store.append_event(&next, Some(&last)).unwrap();

    let events = store.events("ACME").unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events.last().map(|e| e.signal), Some(Signal::Sell));
}
