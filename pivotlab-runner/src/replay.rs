//! Session replay: feeds one day of candles through the decision engine.
//!
//! Each candle is sampled at its close, with the candle open available to the
//! exit override. Instruments replay in parallel; the sessions of a single
//! instrument always run in date order on one worker, so the store sees at most
//! one writer per instrument.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pivotlab_core::data::{BrokerSession, DataError, MarketDataSource};
use pivotlab_core::domain::{Levels, TradeEvent};
use pivotlab_core::engine::{Decision, DecisionEngine, PriceSample, TradingSession};
use pivotlab_core::error::EngineError;
use pivotlab_core::store::TradeEventStore;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigId, PivotConfig};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("market data error for '{instrument}': {source}")]
    Data {
        instrument: String,
        #[source]
        source: DataError,
    },
}

/// What happened during one replayed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub instrument: String,
    pub session_date: NaiveDate,
    pub config_id: ConfigId,
    pub levels: Levels,
    pub buffer: Decimal,
    pub samples: usize,
    pub duplicates: usize,
    pub ignored: usize,
    /// Events persisted during this session, in order.
    pub recorded: Vec<TradeEvent>,
}

/// Replay one instrument's session.
pub fn replay_session(
    source: &dyn MarketDataSource,
    broker: &BrokerSession,
    store: &dyn TradeEventStore,
    config: &PivotConfig,
    instrument: &str,
    session_date: NaiveDate,
) -> Result<ReplaySummary, ReplayError> {
    let settings = config.engine_settings();
    let session = TradingSession::from_source(source, broker, instrument, session_date, &settings)?;
    let candles = source
        .intraday_bars(broker, instrument, session_date)
        .map_err(|source| ReplayError::Data {
            instrument: instrument.to_string(),
            source,
        })?;

    if candles.is_empty() {
        warn!(instrument, %session_date, "no intraday candles for session");
    }

    let engine = DecisionEngine::new(store, &settings);
    let mut summary = ReplaySummary {
        instrument: instrument.to_string(),
        session_date,
        config_id: config.config_id(),
        levels: session.levels,
        buffer: session.buffer.value(),
        samples: candles.len(),
        duplicates: 0,
        ignored: 0,
        recorded: Vec::new(),
    };

    for candle in &candles {
        match engine.decide(&session, &PriceSample::from_candle(candle))? {
            Decision::Recorded(event) => summary.recorded.push(event),
            Decision::NoActionTaken { .. } => summary.duplicates += 1,
            Decision::Ignored(_) => summary.ignored += 1,
        }
    }

    info!(
        instrument,
        %session_date,
        samples = summary.samples,
        recorded = summary.recorded.len(),
        duplicates = summary.duplicates,
        "session replayed"
    );
    Ok(summary)
}

/// Replay many (instrument, date) sessions.
///
/// Instruments run in parallel. Within an instrument, sessions run in date
/// order and stop at the first error, since later sessions depend on the
/// position state the earlier ones leave behind.
pub fn replay_many(
    source: &dyn MarketDataSource,
    broker: &BrokerSession,
    store: &dyn TradeEventStore,
    config: &PivotConfig,
    sessions: &[(String, NaiveDate)],
) -> Vec<Result<ReplaySummary, ReplayError>> {
    let mut by_instrument: BTreeMap<&str, Vec<NaiveDate>> = BTreeMap::new();
    for (instrument, date) in sessions {
        by_instrument.entry(instrument.as_str()).or_default().push(*date);
    }

    let work: Vec<(&str, Vec<NaiveDate>)> = by_instrument
        .into_iter()
        .map(|(instrument, mut dates)| {
            dates.sort();
            dates.dedup();
            (instrument, dates)
        })
        .collect();

    work.par_iter()
        .map(|(instrument, dates)| {
            let mut results = Vec::with_capacity(dates.len());
            for &date in dates {
                let result = replay_session(source, broker, store, config, instrument, date);
                let failed = result.is_err();
                results.push(result);
                if failed {
                    break;
                }
            }
            results
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
