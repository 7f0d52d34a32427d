//! Position state tracker: turns classified signals into Entry/Exit events.
//!
//! The tracker is a pure function of the new signal and the last persisted
//! event for the same instrument. It holds no state of its own; the store's
//! "last event per instrument" is the state.

use serde::{Deserialize, Serialize};

use crate::domain::{PositionType, Signal, SignalResult, TradeEvent};

/// Position state implied by the last persisted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    NoPosition,
    /// Last accepted event opened a position.
    Holding,
    /// Last accepted event closed a position.
    Flat,
}

impl PositionState {
    pub fn from_last(last: Option<&LastState>) -> Self {
        match last.and_then(|l| l.position_type) {
            None => PositionState::NoPosition,
            Some(PositionType::Entry) => PositionState::Holding,
            Some(PositionType::Exit) => PositionState::Flat,
        }
    }
}

/// The parts of the last event the tracker looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastState {
    pub signal: Signal,
    pub position_type: Option<PositionType>,
}

impl From<&TradeEvent> for LastState {
    fn from(event: &TradeEvent) -> Self {
        Self {
            signal: event.signal,
            position_type: event.position_type,
        }
    }
}

/// Outcome of one transition decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Persist an event with this signal and type.
    Accept {
        signal: Signal,
        position_type: PositionType,
        reason: String,
        /// True when the exit override replaced the ordinary signal.
        overridden: bool,
    },
    /// Same signal as the last event; no action taken.
    Duplicate { signal: Signal },
    /// Nothing to persist (No Action, or an exit with no prior event).
    Ignored { reason: String },
}

impl Transition {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Transition::Accept { .. })
    }

    pub fn position_type(&self) -> Option<PositionType> {
        match self {
            Transition::Accept { position_type, .. } => Some(*position_type),
            _ => None,
        }
    }
}

/// Decide whether `result` becomes a persisted event.
///
/// `exit` is the exit override computed for the same sample, if the caller ran
/// one. It takes precedence when it fires against an open directional position
/// and the ordinary signal is a different direction.
pub fn decide_transition(
    result: &SignalResult,
    last: Option<LastState>,
    exit: Option<&SignalResult>,
) -> Transition {
    if let (Some(last), Some(exit)) = (last, exit) {
        if exit.signal == Signal::Exit
            && result.signal.is_directional()
            && result.signal != last.signal
            && last.signal != Signal::Exit
        {
            return Transition::Accept {
                signal: Signal::Exit,
                position_type: PositionType::Exit,
                reason: exit.reason.clone(),
                overridden: true,
            };
        }
    }

    let signal = result.signal;
    if !signal.is_actionable() {
        return Transition::Ignored {
            reason: result.reason.clone(),
        };
    }

    let Some(last) = last else {
        if signal == Signal::Exit {
            return Transition::Ignored {
                reason: "No open position to exit".into(),
            };
        }
        return accept(result, PositionType::Entry);
    };

    if last.signal == signal {
        return Transition::Duplicate { signal };
    }

    if signal == Signal::Exit {
        return accept(result, PositionType::Exit);
    }

    let position_type = match PositionState::from_last(Some(&last)) {
        PositionState::Holding => PositionType::Exit,
        PositionState::NoPosition | PositionState::Flat => PositionType::Entry,
    };
    accept(result, position_type)
}

fn accept(result: &SignalResult, position_type: PositionType) -> Transition {
    Transition::Accept {
        signal: result.signal,
        position_type,
        reason: result.reason.clone(),
        overridden: false,
    }
}
