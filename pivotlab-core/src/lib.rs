//! PivotLab Core: pivot levels, signal classification, position tracking and trend estimation.
//!
//! This crate contains the decision logic and nothing that touches disk or network:
//! - Domain types (bars, levels, signals, trade events, trend points)
//! - Central pivot range and outer support/resistance levels from a reference bar
//! - Two-pass signal classifier with configurable re-scan and neutral-zone policies
//! - Position state tracker (Entry/Exit alternation, duplicate suppression, exit override)
//! - ATR-banded trend estimator
//! - Store and market data traits, with an in-memory store
//! - Trade pairing for reports

pub mod classifier;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod position;
pub mod report;
pub mod store;

pub use classifier::{classify, exit_override, ClassifierPolicy, NeutralZonePolicy, RescanPolicy};
pub use engine::{Decision, DecisionEngine, EngineSettings, PriceSample, TradingSession};
pub use error::EngineError;
pub use levels::{compute_levels, Buffer, LevelRounding};
