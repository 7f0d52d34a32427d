//! Levels: the central pivot range plus four resistance and four support levels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Eleven-field level set derived from one reference bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Levels {
    pub pivot: Decimal,
    pub bc: Decimal,
    pub tc: Decimal,
    pub r1: Decimal,
    pub r2: Decimal,
    pub r3: Decimal,
    pub r4: Decimal,
    pub s1: Decimal,
    pub s2: Decimal,
    pub s3: Decimal,
    pub s4: Decimal,
}

/// Name of a single level, used for iteration order and in signal reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelName {
    Pivot,
    Bc,
    Tc,
    R1,
    R2,
    R3,
    R4,
    S1,
    S2,
    S3,
    S4,
}

impl LevelName {
    /// Resistances in ascending price order.
    pub const RESISTANCES: [LevelName; 4] =
        [LevelName::R1, LevelName::R2, LevelName::R3, LevelName::R4];

    /// Supports in descending price order.
    pub const SUPPORTS: [LevelName; 4] =
        [LevelName::S1, LevelName::S2, LevelName::S3, LevelName::S4];

    /// The eight outer levels, resistances first.
    pub const OUTER: [LevelName; 8] = [
        LevelName::R1,
        LevelName::R2,
        LevelName::R3,
        LevelName::R4,
        LevelName::S1,
        LevelName::S2,
        LevelName::S3,
        LevelName::S4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LevelName::Pivot => "Pivot",
            LevelName::Bc => "BC",
            LevelName::Tc => "TC",
            LevelName::R1 => "R1",
            LevelName::R2 => "R2",
            LevelName::R3 => "R3",
            LevelName::R4 => "R4",
            LevelName::S1 => "S1",
            LevelName::S2 => "S2",
            LevelName::S3 => "S3",
            LevelName::S4 => "S4",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Levels {
    /// Value of a named level.
    pub fn get(&self, name: LevelName) -> Decimal {
        match name {
            LevelName::Pivot => self.pivot,
            LevelName::Bc => self.bc,
            LevelName::Tc => self.tc,
            LevelName::R1 => self.r1,
            LevelName::R2 => self.r2,
            LevelName::R3 => self.r3,
            LevelName::R4 => self.r4,
            LevelName::S1 => self.s1,
            LevelName::S2 => self.s2,
            LevelName::S3 => self.s3,
            LevelName::S4 => self.s4,
        }
    }

    /// Iterate `(name, value)` pairs for the given names, in order.
    pub fn iter_named<'a>(
        &'a self,
        names: &'a [LevelName],
    ) -> impl Iterator<Item = (LevelName, Decimal)> + 'a {
        names.iter().map(move |&name| (name, self.get(name)))
    }

    /// True when resistances strictly ascend and supports strictly descend.
    pub fn is_monotonic(&self) -> bool {
        self.r1 < self.r2
            && self.r2 < self.r3
            && self.r3 < self.r4
            && self.s1 > self.s2
            && self.s2 > self.s3
            && self.s3 > self.s4
    }
}
