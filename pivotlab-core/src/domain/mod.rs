//! Domain types for PivotLab

pub mod bar;
pub mod levels;
pub mod signal;
pub mod trade_event;
pub mod trend_point;

pub use bar::{price_from_f64, Bar};
pub use levels::{LevelName, Levels};
pub use signal::{PositionType, Signal, SignalResult};
pub use trade_event::{compute_entry_exit_times, EventTimes, ReferenceOhlc, TradeEvent};
pub use trend_point::{Trend, TrendPoint};

/// Symbol type alias
pub type Symbol = String;
