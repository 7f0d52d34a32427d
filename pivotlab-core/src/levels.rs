//! Level calculator: central pivot range, resistances, supports and the buffer band.
//!
//! Every derived value is rounded to [`LEVEL_DECIMALS`] places with
//! round-half-away-from-zero. Two rounding orders exist, selected by
//! [`LevelRounding`]:
//!
//! - `Independent`: each level is derived from exact intermediate values and
//!   rounded once on output.
//! - `Chained`: pivot and bc are rounded first and every later level is built
//!   from the already-rounded values it depends on (r3 from rounded r1, and so on).
//!
//! The two orders can differ by one unit in the last place whenever the pivot
//! is not exactly representable at two decimals.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Levels};
use crate::error::EngineError;

/// Decimal places every level is rounded to.
pub const LEVEL_DECIMALS: u32 = 2;

/// Default buffer width as a fraction of bc (0.06%).
pub const DEFAULT_BUFFER_PCT: Decimal = Decimal::from_parts(6, 0, 0, false, 4);

/// Order in which rounding is applied while deriving levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelRounding {
    #[default]
    Independent,
    Chained,
}

/// Round half away from zero to the level precision.
pub fn round_level(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(LEVEL_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

/// Compute levels from a reference bar.
pub fn compute_levels(bar: &Bar, rounding: LevelRounding) -> Result<Levels, EngineError> {
    bar.validate()?;
    levels_from_hlc(bar.high, bar.low, bar.close, rounding)
}

/// Compute levels from raw high/low/close.
pub fn levels_from_hlc(
    high: Decimal,
    low: Decimal,
    close: Decimal,
    rounding: LevelRounding,
) -> Result<Levels, EngineError> {
    if high < low {
        return Err(EngineError::InvalidInput(format!(
            "high {high} is below low {low}"
        )));
    }

    let range = sub(high, low)?;
    let raw_pivot = div(add(add(high, low)?, close)?, Decimal::from(3))?;
    let raw_bc = div(add(high, low)?, Decimal::TWO)?;

    let levels = match rounding {
        LevelRounding::Independent => {
            let pivot = raw_pivot;
            let r1 = sub(twice(pivot)?, low)?;
            let r2 = add(pivot, range)?;
            let s1 = sub(twice(pivot)?, high)?;
            let s2 = sub(pivot, range)?;
            Levels {
                pivot: round_level(pivot),
                bc: round_level(raw_bc),
                tc: round_level(add(pivot, sub(pivot, raw_bc)?)?),
                r1: round_level(r1),
                r2: round_level(r2),
                r3: round_level(add(r1, range)?),
                r4: round_level(add(r2, range)?),
                s1: round_level(s1),
                s2: round_level(s2),
                s3: round_level(sub(s1, range)?),
                s4: round_level(sub(s2, range)?),
            }
        }
        LevelRounding::Chained => {
            let pivot = round_level(raw_pivot);
            let bc = round_level(raw_bc);
            let r1 = round_level(sub(twice(pivot)?, low)?);
            let r2 = round_level(add(pivot, range)?);
            let s1 = round_level(sub(twice(pivot)?, high)?);
            let s2 = round_level(sub(pivot, range)?);
            Levels {
                pivot,
                bc,
                tc: round_level(add(pivot, sub(pivot, bc)?)?),
                r1,
                r2,
                r3: round_level(add(r1, range)?),
                r4: round_level(add(r2, range)?),
                s1,
                s2,
                s3: round_level(sub(s1, range)?),
                s4: round_level(sub(s2, range)?),
            }
        }
    };

    Ok(levels)
}

fn overflow(op: &str, a: Decimal, b: Decimal) -> EngineError {
    EngineError::InvalidInput(format!("level arithmetic overflowed: {a} {op} {b}"))
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_add(b).ok_or_else(|| overflow("+", a, b))
}

fn sub(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_sub(b).ok_or_else(|| overflow("-", a, b))
}

fn twice(a: Decimal) -> Result<Decimal, EngineError> {
    a.checked_mul(Decimal::TWO)
        .ok_or_else(|| overflow("*", a, Decimal::TWO))
}

fn div(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_div(b).ok_or_else(|| overflow("/", a, b))
}

/// Tolerance band around a level. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Buffer(Decimal);

impl Buffer {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "buffer must be > 0, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Buffer {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Buffer::new(value)
    }
}

impl From<Buffer> for Decimal {
    fn from(buffer: Buffer) -> Self {
        buffer.0
    }
}

/// Buffer width derived from bc.
///
/// bc (2dp) × `pct`, rounded to 2dp, then rounded to the nearest whole unit.
/// May be zero for low-priced instruments; [`Buffer::new`] rejects that.
pub fn buffer_from_bc(bc: Decimal, pct: Decimal) -> Decimal {
    let percentage = round_level(round_level(bc) * pct);
    percentage.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn reference_fixture_independent() {
        let l = levels_from_hlc(d("100"), d("80"), d("95"), LevelRounding::Independent).unwrap();
        assert_eq!(l.pivot, d("91.67"));
        assert_eq!(l.bc, d("90"));
        assert_eq!(l.tc, d("93.33"));
        assert_eq!(l.r1, d("103.33"));
        assert_eq!(l.s1, d("83.33"));
        assert_eq!(l.r2, d("111.67"));
        assert_eq!(l.r3, d("123.33"));
        assert_eq!(l.r4, d("131.67"));
        assert_eq!(l.s2, d("71.67"));
        assert_eq!(l.s3, d("63.33"));
        assert_eq!(l.s4, d("51.67"));
    }

    #[test]
    fn chained_rounding_builds_on_rounded_pivot() {
        let l = levels_from_hlc(d("100"), d("80"), d("95"), LevelRounding::Chained).unwrap();
        assert_eq!(l.pivot, d("91.67"));
        assert_eq!(l.tc, d("93.34"));
        assert_eq!(l.r1, d("103.34"));
        assert_eq!(l.r3, d("123.34"));
        assert_eq!(l.s1, d("83.34"));
        assert_eq!(l.s3, d("63.34"));
    }

    #[test]
    fn modes_agree_when_pivot_is_exact() {
        let a = levels_from_hlc(
            d("21801.45"),
            d("16828.35"),
            d("21731.4"),
            LevelRounding::Independent,
        )
        .unwrap();
        let b =
            levels_from_hlc(d("21801.45"), d("16828.35"), d("21731.4"), LevelRounding::Chained)
                .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pivot, d("20120.4"));
        assert_eq!(a.tc, d("20925.9"));
        assert_eq!(a.r1, d("23412.45"));
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(round_level(d("1.005")), d("1.01"));
        assert_eq!(round_level(d("-1.005")), d("-1.01"));
        assert_eq!(round_level(d("1.004")), d("1.00"));
    }

    #[test]
    fn rejects_inverted_bar() {
        let err = levels_from_hlc(d("80"), d("100"), d("90"), LevelRounding::Independent);
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn huge_prices_are_rejected_not_panicking() {
        let huge = d("70000000000000000000000000000");
        let err = levels_from_hlc(huge, Decimal::ZERO, huge, LevelRounding::Independent);
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
        let err = levels_from_hlc(huge, Decimal::ZERO, huge, LevelRounding::Chained);
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn buffer_is_six_basis_points_of_bc() {
        // 19314.9 * 0.0006 = 11.58894 -> 11.59 -> 12
        assert_eq!(buffer_from_bc(d("19314.9"), DEFAULT_BUFFER_PCT), d("12"));
        // 25000 * 0.0006 = 15
        assert_eq!(buffer_from_bc(d("25000"), DEFAULT_BUFFER_PCT), d("15"));
    }

    #[test]
    fn buffer_rounds_to_zero_for_small_prices() {
        assert_eq!(buffer_from_bc(d("90"), DEFAULT_BUFFER_PCT), Decimal::ZERO);
        assert!(Buffer::new(Decimal::ZERO).is_err());
    }

    #[test]
    fn buffer_rejects_negative_on_deserialize() {
        assert!(serde_json::from_str::<Buffer>("\"-3\"").is_err());
        let ok: Buffer = serde_json::from_str("\"15\"").unwrap();
        assert_eq!(ok.value(), d("15"));
    }
}
