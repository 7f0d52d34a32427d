//! PivotLab Runner: configuration, file-backed data and stores, session replay, reports.
//!
//! This crate builds on `pivotlab-core` to provide:
//! - TOML configuration with a content-addressed config id
//! - CSV bar loading and a CSV-backed market data source
//! - Append-only JSONL trade and trend stores
//! - Session replay (parallel across instruments, serial per instrument)
//! - Rolling trend job that persists trend flips
//! - Paired-trade and trend report export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod replay;
pub mod store;
pub mod trend_job;

pub use config::{ConfigError, ConfigId, PivotConfig};
pub use data_loader::{load_bars_csv, CsvMarketData, LoadError};
pub use export::{save_report, TradeReport};
pub use replay::{replay_many, replay_session, ReplayError, ReplaySummary};
pub use store::JsonlStore;
pub use trend_job::{run_trend_job, TrendJobSummary};
