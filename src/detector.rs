//! Tombola win detection
//!
//! Pure pattern evaluation over a room's cards and drawn numbers. The
//! detector has no side effects; callers must durably record returned
//! patterns as awarded before the next detection cycle, otherwise the
//! same win is re-emitted.

use crate::prizes::{PrizeTable, WinPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A player's card for one game: 15 distinct numbers arranged as a
/// 3-row by 5-column grid, flattened row-major. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub room_id: String,
    pub player_id: String,
    pub numbers: [u32; 15],
}

impl Card {
    /// Grid row `row` (1-based), as the five flattened indices
    /// `[(row-1)*5 ..= (row-1)*5+4]`.
    fn row(&self, row: usize) -> &[u32] {
        let start = (row - 1) * 5;
        &self.numbers[start..start + 5]
    }

    fn row_complete(&self, row: usize, drawn: &HashSet<u32>) -> bool {
        self.row(row).iter().all(|n| drawn.contains(n))
    }

    fn corners_complete(&self, drawn: &HashSet<u32>) -> bool {
        [0, 4, 10, 14]
            .iter()
            .all(|&i| drawn.contains(&self.numbers[i]))
    }

    fn full(&self, drawn: &HashSet<u32>) -> bool {
        self.numbers.iter().all(|n| drawn.contains(n))
    }

    fn matches(&self, pattern: WinPattern, drawn: &HashSet<u32>) -> bool {
        match pattern {
            WinPattern::Row1 => self.row_complete(1, drawn),
            WinPattern::Row2 => self.row_complete(2, drawn),
            WinPattern::Row3 => self.row_complete(3, drawn),
            WinPattern::Corners => self.corners_complete(drawn),
            WinPattern::Full => self.full(drawn),
        }
    }
}

/// A newly-qualifying win, consumed exactly once by the payout
/// coordinator and then persisted as a durable room fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetectedWin {
    pub win_type: WinPattern,
    pub player_id: String,
    pub card_id: String,
    pub prize: i64,
}

/// Evaluate all cards against the drawn numbers and return the newly
/// qualifying wins in pattern priority order.
///
/// For each pattern the first-listed matching card wins; there is no
/// ordering by arrival time or player id. Patterns in `already_awarded`
/// are skipped, and a pattern awarded earlier in the same call is never
/// awarded twice. A pattern no card satisfies is silently skipped.
pub fn detect_wins(
    cards: &[Card],
    drawn_numbers: &[u32],
    already_awarded: &HashSet<WinPattern>,
    prizes: &PrizeTable,
) -> Vec<DetectedWin> {
    let drawn: HashSet<u32> = drawn_numbers.iter().copied().collect();
    let mut awarded = already_awarded.clone();
    let mut wins = Vec::new();

    for pattern in WinPattern::ALL {
        if awarded.contains(&pattern) {
            continue;
        }
        if let Some(card) = cards.iter().find(|c| c.matches(pattern, &drawn)) {
            wins.push(DetectedWin {
                win_type: pattern,
                player_id: card.player_id.clone(),
                card_id: card.id.clone(),
                prize: prizes.amount(pattern),
            });
            awarded.insert(pattern);
        }
    }

    wins
}
