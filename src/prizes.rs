//! Prize table for tombola win patterns
//!
//! The pattern set is closed for this game variant: three rows, four
//! corners, and full card. Prize values are configuration, the patterns
//! are not.

use crate::config::PrizeConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Winning pattern identifiers, in evaluation priority order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WinPattern {
    Row1,
    Row2,
    Row3,
    Corners,
    Full,
}

impl WinPattern {
    /// All patterns in evaluation priority order. This order is also the
    /// emission order of the win detector.
    pub const ALL: [WinPattern; 5] = [
        WinPattern::Row1,
        WinPattern::Row2,
        WinPattern::Row3,
        WinPattern::Corners,
        WinPattern::Full,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WinPattern::Row1 => "row1",
            WinPattern::Row2 => "row2",
            WinPattern::Row3 => "row3",
            WinPattern::Corners => "corners",
            WinPattern::Full => "full",
        }
    }
}

impl fmt::Display for WinPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WinPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "row1" => Ok(WinPattern::Row1),
            "row2" => Ok(WinPattern::Row2),
            "row3" => Ok(WinPattern::Row3),
            "corners" => Ok(WinPattern::Corners),
            "full" => Ok(WinPattern::Full),
            other => Err(format!("Unknown win pattern: {}", other)),
        }
    }
}

/// Fixed mapping from win pattern to chip prize
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrizeTable {
    row1: i64,
    row2: i64,
    row3: i64,
    corners: i64,
    full: i64,
}

impl PrizeTable {
    /// Pure lookup; no error conditions.
    pub fn amount(&self, pattern: WinPattern) -> i64 {
        match pattern {
            WinPattern::Row1 => self.row1,
            WinPattern::Row2 => self.row2,
            WinPattern::Row3 => self.row3,
            WinPattern::Corners => self.corners,
            WinPattern::Full => self.full,
        }
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self {
            row1: 500,
            row2: 400,
            row3: 300,
            corners: 1000,
            full: 5000,
        }
    }
}

impl From<&PrizeConfig> for PrizeTable {
    fn from(config: &PrizeConfig) -> Self {
        Self {
            row1: config.row1,
            row2: config.row2,
            row3: config.row3,
            corners: config.corners,
            full: config.full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prizes() {
        let table = PrizeTable::default();
        assert_eq!(table.amount(WinPattern::Row1), 500);
        assert_eq!(table.amount(WinPattern::Row2), 400);
        assert_eq!(table.amount(WinPattern::Row3), 300);
        assert_eq!(table.amount(WinPattern::Corners), 1000);
        assert_eq!(table.amount(WinPattern::Full), 5000);
    }

    #[test]
    fn test_priority_order() {
        let names: Vec<&str> = WinPattern::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["row1", "row2", "row3", "corners", "full"]);
    }

    #[test]
    fn test_pattern_round_trip() {
        for pattern in WinPattern::ALL {
            let parsed: WinPattern = pattern.as_str().parse().unwrap();
            assert_eq!(parsed, pattern);
        }
        assert!("diagonal".parse::<WinPattern>().is_err());
    }
}
