//! Decision engine: level calculation, classification and position tracking
//! wired to a trade event store.
//!
//! One [`TradingSession`] is opened per instrument per reference day; its levels
//! and buffer are reused for every price sample of that day.
//!
//! The engine takes no locks. Callers must run at most one `decide` per
//! instrument at a time; the store's conditional append turns a violation of
//! that rule into `StoreError::Conflict` instead of a double-booked event.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{classify, exit_override, ClassifierPolicy};
use crate::data::{BrokerSession, MarketDataSource};
use crate::domain::{Bar, Levels, ReferenceOhlc, Signal, SignalResult, Symbol, TradeEvent};
use crate::error::EngineError;
use crate::levels::{buffer_from_bc, compute_levels, Buffer, LevelRounding, DEFAULT_BUFFER_PCT};
use crate::position::{decide_transition, LastState, Transition};
use crate::store::TradeEventStore;

/// Knobs that shape levels, buffer and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub rounding: LevelRounding,
    /// Buffer as a fraction of bc.
    pub buffer_pct: Decimal,
    /// Fixed buffer that bypasses the bc-derived width.
    pub buffer_override: Option<Decimal>,
    pub classifier: ClassifierPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            rounding: LevelRounding::default(),
            buffer_pct: DEFAULT_BUFFER_PCT,
            buffer_override: None,
            classifier: ClassifierPolicy::default(),
        }
    }
}

/// Per-instrument, per-day context: reference bar, levels and buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingSession {
    pub instrument: Symbol,
    pub reference: Bar,
    pub levels: Levels,
    pub buffer: Buffer,
}

impl TradingSession {
    /// Open a session from an already-fetched reference bar.
    ///
    /// A missing bar is `NotFound`; levels are never fabricated.
    pub fn open(
        instrument: &str,
        reference: Option<Bar>,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        if instrument.trim().is_empty() {
            return Err(EngineError::InvalidInput("instrument is required".into()));
        }
        let reference =
            reference.ok_or_else(|| EngineError::not_found("reference bar", instrument))?;
        let levels = compute_levels(&reference, settings.rounding)?;
        let width = settings
            .buffer_override
            .unwrap_or_else(|| buffer_from_bc(levels.bc, settings.buffer_pct));
        let buffer = Buffer::new(width).map_err(|_| {
            EngineError::InvalidInput(format!(
                "buffer for '{instrument}' rounds to {width} (bc {}); set an explicit buffer",
                levels.bc
            ))
        })?;

        debug!(
            instrument,
            pivot = %levels.pivot,
            bc = %levels.bc,
            tc = %levels.tc,
            buffer = %buffer.value(),
            "opened trading session"
        );

        Ok(Self {
            instrument: instrument.to_string(),
            reference,
            levels,
            buffer,
        })
    }

    /// Open a session by asking a market data source for the reference bar.
    pub fn from_source(
        source: &dyn MarketDataSource,
        broker: &BrokerSession,
        instrument: &str,
        session_date: NaiveDate,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        let reference = source.reference_bar(broker, instrument, session_date)?;
        Self::open(instrument, reference, settings)
    }

    fn reference_ohlc(&self) -> ReferenceOhlc {
        ReferenceOhlc {
            high: self.reference.high,
            low: self.reference.low,
            close: self.reference.close,
        }
    }
}

/// One observed price, optionally with the open of the candle it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// Needed for the exit override; without it only the ordinary transition runs.
    pub open: Option<Decimal>,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            timestamp,
            price,
            open: None,
        }
    }

    /// Sample a candle at its close.
    pub fn from_candle(bar: &Bar) -> Self {
        Self {
            timestamp: bar.timestamp,
            price: bar.close,
            open: Some(bar.open),
        }
    }
}

/// Outcome of one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A trade event was persisted.
    Recorded(TradeEvent),
    /// The signal repeated the last persisted one; nothing written.
    NoActionTaken { signal: Signal, reason: String },
    /// Nothing actionable for this sample.
    Ignored(SignalResult),
}

impl Decision {
    pub fn event(&self) -> Option<&TradeEvent> {
        match self {
            Decision::Recorded(event) => Some(event),
            _ => None,
        }
    }
}

pub struct DecisionEngine<'a> {
    store: &'a dyn TradeEventStore,
    policy: ClassifierPolicy,
}

impl<'a> DecisionEngine<'a> {
    pub fn new(store: &'a dyn TradeEventStore, settings: &EngineSettings) -> Self {
        Self {
            store,
            policy: settings.classifier,
        }
    }

    /// Classify one sample, run the position state machine and persist the
    /// event if one is accepted.
    pub fn decide(
        &self,
        session: &TradingSession,
        sample: &PriceSample,
    ) -> Result<Decision, EngineError> {
        if sample.price.is_sign_negative() || sample.price.is_zero() {
            return Err(EngineError::InvalidInput(format!(
                "price for '{}' must be > 0, got {}",
                session.instrument, sample.price
            )));
        }

        let classification = classify(sample.price, &session.levels, session.buffer, self.policy);
        let last = self.store.find_last_event(&session.instrument)?;

        let exit = match (&last, sample.open) {
            (Some(last), Some(open)) => Some(exit_override(
                sample.price,
                open,
                last.signal,
                &session.levels,
                session.buffer,
            )),
            _ => None,
        };

        debug!(
            instrument = %session.instrument,
            price = %sample.price,
            signal = %classification.signal,
            reason = %classification.reason,
            "classified sample"
        );

        let transition = decide_transition(
            &classification,
            last.as_ref().map(LastState::from),
            exit.as_ref(),
        );

        match transition {
            Transition::Accept {
                signal,
                position_type,
                reason,
                overridden,
            } => {
                let event = TradeEvent::new(
                    session.instrument.clone(),
                    sample.price,
                    session.reference_ohlc(),
                    session.levels,
                    session.buffer.value(),
                    signal,
                    reason,
                    Some(position_type),
                    sample.timestamp,
                );
                self.store.append_event(&event, last.as_ref())?;
                info!(
                    instrument = %event.instrument,
                    signal = %event.signal,
                    r#type = %position_type,
                    price = %event.price,
                    overridden,
                    "recorded trade event"
                );
                Ok(Decision::Recorded(event))
            }
            Transition::Duplicate { signal } => {
                debug!(instrument = %session.instrument, %signal, "duplicate signal, no action taken");
                Ok(Decision::NoActionTaken {
                    signal,
                    reason: format!("No action taken: last event is already {signal}"),
                })
            }
            Transition::Ignored { reason } => Ok(Decision::Ignored(SignalResult {
                signal: classification.signal,
                reason,
            })),
        }
    }
}
