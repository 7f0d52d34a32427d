//! Persistence traits and an in-memory implementation.
//!
//! Stores never compute fields: records arrive fully built and are kept as-is.
//! Consistency contract: read-your-writes per instrument. After `append_event`
//! returns `Ok`, `find_last_event` for that instrument returns the appended event.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::domain::{Symbol, TradeEvent, TrendPoint};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional write lost: the instrument's latest event is no longer the
    /// one the decision was based on.
    #[error("conflicting write for '{instrument}': latest event changed since it was read")]
    Conflict { instrument: String },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Trade event persistence.
pub trait TradeEventStore: Send + Sync {
    /// Most recent event for the instrument, if any.
    fn find_last_event(&self, instrument: &str) -> Result<Option<TradeEvent>, StoreError>;

    /// Append `event` only if the instrument's latest event still equals `expected_last`.
    ///
    /// Returns `StoreError::Conflict` otherwise; nothing is written in that case.
    fn append_event(
        &self,
        event: &TradeEvent,
        expected_last: Option<&TradeEvent>,
    ) -> Result<(), StoreError>;

    /// All events for the instrument in insertion order.
    fn events(&self, instrument: &str) -> Result<Vec<TradeEvent>, StoreError>;
}

/// Trend point persistence.
pub trait TrendStore: Send + Sync {
    fn find_last_trend(&self, instrument: &str) -> Result<Option<TrendPoint>, StoreError>;

    fn save_trend(&self, point: &TrendPoint) -> Result<(), StoreError>;

    fn trends(&self, instrument: &str) -> Result<Vec<TrendPoint>, StoreError>;
}

/// Process-local store backed by hash maps behind read-write locks.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: RwLock<HashMap<Symbol, Vec<TradeEvent>>>,
    trends: RwLock<HashMap<Symbol, Vec<TrendPoint>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

impl TradeEventStore for InMemoryStore {
    fn find_last_event(&self, instrument: &str) -> Result<Option<TradeEvent>, StoreError> {
        let events = self.events.read().map_err(poisoned)?;
        Ok(events.get(instrument).and_then(|v| v.last().cloned()))
    }

    fn append_event(
        &self,
        event: &TradeEvent,
        expected_last: Option<&TradeEvent>,
    ) -> Result<(), StoreError> {
        let mut events = self.events.write().map_err(poisoned)?;
        let history = events.entry(event.instrument.clone()).or_default();
        if history.last() != expected_last {
            return Err(StoreError::Conflict {
                instrument: event.instrument.clone(),
            });
        }
        history.push(event.clone());
        Ok(())
    }

    fn events(&self, instrument: &str) -> Result<Vec<TradeEvent>, StoreError> {
        let events = self.events.read().map_err(poisoned)?;
        Ok(events.get(instrument).cloned().unwrap_or_default())
    }
}

impl TrendStore for InMemoryStore {
    fn find_last_trend(&self, instrument: &str) -> Result<Option<TrendPoint>, StoreError> {
        let trends = self.trends.read().map_err(poisoned)?;
        Ok(trends.get(instrument).and_then(|v| v.last().cloned()))
    }

    fn save_trend(&self, point: &TrendPoint) -> Result<(), StoreError> {
        let mut trends = self.trends.write().map_err(poisoned)?;
        trends
            .entry(point.instrument.clone())
            .or_default()
            .push(point.clone());
        Ok(())
    }

    fn trends(&self, instrument: &str) -> Result<Vec<TrendPoint>, StoreError> {
        let trends = self.trends.read().map_err(poisoned)?;
        Ok(trends.get(instrument).cloned().unwrap_or_default())
    }
}
