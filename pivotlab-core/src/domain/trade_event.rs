//! TradeEvent: one accepted signal for one instrument, immutable once created.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::levels::Levels;
use super::signal::{PositionType, Signal};
use super::Symbol;

/// High/low/close of the reference bar the levels were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOhlc {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// A persisted trade event.
///
/// The latest event per instrument is the state the position tracker consults.
/// Field names are stable: report rendering pairs rows by `type` and computes
/// P/L from `price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub instrument: Symbol,
    pub price: Decimal,
    pub reference: ReferenceOhlc,
    pub levels: Levels,
    pub buffer: Decimal,
    pub signal: Signal,
    pub reason: String,
    #[serde(rename = "type")]
    pub position_type: Option<PositionType>,
    pub timestamp: DateTime<Utc>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
}

/// Entry and exit timestamps attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimes {
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
}

/// Derive the time fields of an event from its type and sample timestamp.
///
/// Every event carries the sample time as `entry_time`; only exits carry an
/// `exit_time`.
pub fn compute_entry_exit_times(
    position_type: Option<PositionType>,
    timestamp: DateTime<Utc>,
) -> EventTimes {
    EventTimes {
        entry_time: timestamp,
        exit_time: match position_type {
            Some(PositionType::Exit) => Some(timestamp),
            _ => None,
        },
    }
}

impl TradeEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument: impl Into<Symbol>,
        price: Decimal,
        reference: ReferenceOhlc,
        levels: Levels,
        buffer: Decimal,
        signal: Signal,
        reason: impl Into<String>,
        position_type: Option<PositionType>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let times = compute_entry_exit_times(position_type, timestamp);
        Self {
            instrument: instrument.into(),
            price,
            reference,
            levels,
            buffer,
            signal,
            reason: reason.into(),
            position_type,
            timestamp,
            entry_time: times.entry_time,
            exit_time: times.exit_time,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.position_type == Some(PositionType::Entry)
    }

    pub fn is_exit(&self) -> bool {
        self.position_type == Some(PositionType::Exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn levels() -> Levels {
        let d = Decimal::from;
        Levels {
            pivot: d(91),
            bc: d(90),
            tc: d(92),
            r1: d(100),
            r2: d(110),
            r3: d(120),
            r4: d(130),
            s1: d(80),
            s2: d(70),
            s3: d(60),
            s4: d(50),
        }
    }

    fn event(position_type: PositionType) -> TradeEvent {
        TradeEvent::new(
            "NSE:INFY",
            Decimal::from(101),
            ReferenceOhlc {
                high: Decimal::from(100),
                low: Decimal::from(80),
                close: Decimal::from(95),
            },
            levels(),
            Decimal::from(1),
            Signal::Buy,
            "Price is within buffer above R1",
            Some(position_type),
            Utc.with_ymd_and_hms(2025, 3, 14, 4, 0, 0).unwrap(),
        )
    }

    #[test]
    fn entry_has_no_exit_time() {
        let e = event(PositionType::Entry);
        assert!(e.is_entry());
        assert_eq!(e.entry_time, e.timestamp);
        assert!(e.exit_time.is_none());
    }

    #[test]
    fn exit_carries_exit_time() {
        let e = event(PositionType::Exit);
        assert!(e.is_exit());
        assert_eq!(e.exit_time, Some(e.timestamp));
    }

    #[test]
    fn type_field_uses_stable_name() {
        let json = serde_json::to_value(event(PositionType::Entry)).unwrap();
        assert_eq!(json["type"], "Entry");
        assert_eq!(json["signal"], "Buy");
        assert_eq!(json["price"], "101");
        assert!(json.get("position_type").is_none());
    }
}
