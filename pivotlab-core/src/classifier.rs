//! Signal classifier: places a price sample against the level set.
//!
//! Classification runs in two passes:
//!
//! 1. An ordered zone test around the central pivot range (first matching zone wins).
//! 2. A re-scan of the eight outer levels that looks for a price sitting just
//!    above a level (Buy) or just below one (Sell).
//!
//! How the second pass interacts with the first is controlled by [`RescanPolicy`].
//! Under `LastMatchWins` the re-scan always runs and its last match replaces
//! whatever the zone test decided, including more specific CPR decisions.
//! `FallbackOnly` limits the re-scan to samples the zone test left as No Action.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{LevelName, Levels, Signal, SignalResult};
use crate::levels::Buffer;

/// What a price strictly inside the central pivot range means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralZonePolicy {
    /// Inside the CPR is No Action.
    #[default]
    Hold,
    /// Inside the CPR closes any open position.
    Exit,
}

/// How the outer-level re-scan combines with the zone test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanPolicy {
    /// Re-scan unconditionally; the last matching level overwrites the result.
    #[default]
    LastMatchWins,
    /// Re-scan only when the zone test produced No Action; first match wins.
    FallbackOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierPolicy {
    #[serde(default)]
    pub neutral_zone: NeutralZonePolicy,
    #[serde(default)]
    pub rescan: RescanPolicy,
}

const NEUTRAL_FALLBACK: &str = "Price is in a neutral zone.";

/// Classify a price against the levels.
pub fn classify(
    price: Decimal,
    levels: &Levels,
    buffer: Buffer,
    policy: ClassifierPolicy,
) -> SignalResult {
    let b = buffer.value();
    let zoned = zone_test(price, levels, b, policy.neutral_zone)
        .unwrap_or_else(|| SignalResult::no_action(NEUTRAL_FALLBACK));

    match policy.rescan {
        RescanPolicy::LastMatchWins => rescan_outer_levels(price, levels, b)
            .pop()
            .unwrap_or(zoned),
        RescanPolicy::FallbackOnly => {
            if zoned.signal == Signal::NoAction {
                rescan_outer_levels(price, levels, b)
                    .into_iter()
                    .next()
                    .unwrap_or(zoned)
            } else {
                zoned
            }
        }
    }
}

/// Ordered zone test. `None` when no zone applies.
fn zone_test(
    price: Decimal,
    levels: &Levels,
    b: Decimal,
    neutral_zone: NeutralZonePolicy,
) -> Option<SignalResult> {
    let Levels { tc, bc, .. } = *levels;

    if price > tc + b {
        let hit = levels
            .iter_named(&LevelName::RESISTANCES)
            .find(|&(_, level)| price > level && price <= level + b);
        return Some(match hit {
            Some((name, level)) => buy_above(name, level),
            None => SignalResult::no_action(
                "Price is above TC + buffer but outside the buffer of every resistance level",
            ),
        });
    }

    if price < bc - b {
        let hit = levels
            .iter_named(&LevelName::SUPPORTS)
            .find(|&(_, level)| price < level && price >= level - b);
        return Some(match hit {
            Some((name, level)) => sell_below(name, level),
            None => SignalResult::no_action(
                "Price is below BC - buffer but outside the buffer of every support level",
            ),
        });
    }

    if price > bc && price < tc {
        return Some(match neutral_zone {
            NeutralZonePolicy::Hold => SignalResult::no_action("Price is within CPR range"),
            NeutralZonePolicy::Exit => SignalResult::new(Signal::Exit, "Price is within CPR range"),
        });
    }

    if price == tc {
        return Some(SignalResult::no_action("Price is exactly at TC"));
    }
    if price == bc {
        return Some(SignalResult::no_action("Price is exactly at BC"));
    }

    if price > tc && price <= tc + b {
        return Some(SignalResult::new(Signal::Buy, "Price is slightly above TC"));
    }

    if price >= bc - b && price < bc {
        return Some(SignalResult::new(Signal::Sell, "Price is slightly below BC"));
    }

    None
}

/// Every outer level the price sits within one buffer of, in scan order (r1..r4, s1..s4).
fn rescan_outer_levels(price: Decimal, levels: &Levels, b: Decimal) -> Vec<SignalResult> {
    levels
        .iter_named(&LevelName::OUTER)
        .filter_map(|(name, level)| {
            if price > level && price - level <= b {
                Some(buy_above(name, level))
            } else if price < level && level - price <= b {
                Some(sell_below(name, level))
            } else {
                None
            }
        })
        .collect()
}

fn buy_above(name: LevelName, level: Decimal) -> SignalResult {
    SignalResult::new(
        Signal::Buy,
        format!("Price is within buffer above {name} ({level})"),
    )
}

fn sell_below(name: LevelName, level: Decimal) -> SignalResult {
    SignalResult::new(
        Signal::Sell,
        format!("Price is within buffer below {name} ({level})"),
    )
}

/// Exit check for an open position, independent of [`classify`].
///
/// Fires when the candle opened on the position's side of an outer level and
/// price has since moved through that level by more than one buffer. The first
/// such level in scan order (r1..r4, s1..s4) is cited.
pub fn exit_override(
    price: Decimal,
    open_price: Decimal,
    last_signal: Signal,
    levels: &Levels,
    buffer: Buffer,
) -> SignalResult {
    let b = buffer.value();
    for (name, level) in levels.iter_named(&LevelName::OUTER) {
        match last_signal {
            Signal::Buy if open_price > level && price < level - b => {
                return SignalResult::new(
                    Signal::Exit,
                    format!("Price fell below {name} ({level}) by more than the buffer after opening above it"),
                );
            }
            Signal::Sell if open_price < level && price > level + b => {
                return SignalResult::new(
                    Signal::Exit,
                    format!("Price rose above {name} ({level}) by more than the buffer after opening below it"),
                );
            }
            _ => {}
        }
    }
    SignalResult::no_action("No level breakdown against the open position")
}
