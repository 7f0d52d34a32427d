//! Signal vocabulary shared by the classifier, the state tracker and the stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified action for one price sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Exit,
    #[serde(rename = "No Action")]
    NoAction,
}

impl Signal {
    /// Signals that may become a persisted trade event.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Signal::NoAction)
    }

    /// Buy or Sell.
    pub fn is_directional(self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Exit => "Exit",
            Signal::NoAction => "No Action",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Signal::Buy),
            "sell" => Ok(Signal::Sell),
            "exit" => Ok(Signal::Exit),
            "no action" | "no_action" | "none" => Ok(Signal::NoAction),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

/// Output of the classifier: a signal plus the human-readable reason behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal: Signal,
    pub reason: String,
}

impl SignalResult {
    pub fn new(signal: Signal, reason: impl Into<String>) -> Self {
        Self {
            signal,
            reason: reason.into(),
        }
    }

    pub fn no_action(reason: impl Into<String>) -> Self {
        Self::new(Signal::NoAction, reason)
    }
}

/// Position lifecycle label attached to an accepted signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionType {
    Entry,
    Exit,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionType::Entry => f.write_str("Entry"),
            PositionType::Exit => f.write_str("Exit"),
        }
    }
}
