//! Trade pairing: folds a trade event history into round trips.
//!
//! Pure function over persisted events. An Entry immediately followed by an
//! Exit forms a closed round trip; anything else stands alone with no exit and
//! no profit/loss.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{PositionType, Signal, TradeEvent};

/// One entry and, if it was closed, its exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePair {
    pub entry: TradeEvent,
    pub exit: Option<TradeEvent>,
    /// Exit minus entry for long entries, entry minus exit otherwise.
    pub profit_loss: Option<Decimal>,
}

impl TradePair {
    pub fn is_closed(&self) -> bool {
        self.exit.is_some()
    }
}

/// Aggregate over a set of pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSummary {
    pub closed: usize,
    pub open: usize,
    pub winners: usize,
    pub losers: usize,
    pub net_profit_loss: Decimal,
}

/// Pair events in the order given.
pub fn pair_trades(events: &[TradeEvent]) -> Vec<TradePair> {
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let entry = &events[i];
        let next = events.get(i + 1);

        match next {
            Some(exit) if entry.is_entry() && exit.is_exit() => {
                pairs.push(TradePair {
                    entry: entry.clone(),
                    exit: Some(exit.clone()),
                    profit_loss: Some(profit_loss(entry, exit)),
                });
                i += 2;
            }
            _ => {
                pairs.push(TradePair {
                    entry: entry.clone(),
                    exit: None,
                    profit_loss: None,
                });
                i += 1;
            }
        }
    }

    pairs
}

fn profit_loss(entry: &TradeEvent, exit: &TradeEvent) -> Decimal {
    if entry.signal == Signal::Buy {
        exit.price - entry.price
    } else {
        entry.price - exit.price
    }
}

pub fn summarize(pairs: &[TradePair]) -> PairSummary {
    pairs
        .iter()
        .fold(PairSummary::default(), |mut acc, pair| {
            match pair.profit_loss {
                Some(pl) => {
                    acc.closed += 1;
                    acc.net_profit_loss += pl;
                    if pl > Decimal::ZERO {
                        acc.winners += 1;
                    } else if pl < Decimal::ZERO {
                        acc.losers += 1;
                    }
                }
                None if pair.entry.position_type == Some(PositionType::Entry) => acc.open += 1,
                None => {}
            }
            acc
        })
}
