//! Payout coordination
//!
//! Glues win detection to ledger transfers: every newly detected win
//! becomes a system-to-player transfer of the pattern's prize, recorded
//! durably so re-evaluating the same draw awards nothing twice. One
//! failed payout never blocks the rest of the loop.

use crate::detector::{detect_wins, Card, DetectedWin};
use crate::errors::LedgerResult;
use crate::ledger::LedgerStore;
use crate::prizes::PrizeTable;
use crate::session::WalletSession;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one detection-and-payout cycle
#[derive(Debug, Clone, Default)]
pub struct PayoutReport {
    /// Wins paid out and durably recorded.
    pub paid: Vec<DetectedWin>,
    /// Wins whose chips were credited but whose durable record failed;
    /// the pattern may be detected and paid again on a later cycle.
    pub paid_unrecorded: Vec<DetectedWin>,
    /// Wins whose transfer failed; not recorded, so the next cycle
    /// retries them.
    pub failed: Vec<DetectedWin>,
}

impl PayoutReport {
    pub fn is_empty(&self) -> bool {
        self.paid.is_empty() && self.paid_unrecorded.is_empty() && self.failed.is_empty()
    }
}

/// Drives win detection and prize payouts for game rooms
pub struct PayoutCoordinator {
    ledger: Arc<LedgerStore>,
    prizes: PrizeTable,
}

impl PayoutCoordinator {
    pub fn new(ledger: Arc<LedgerStore>, prizes: PrizeTable) -> Self {
        Self { ledger, prizes }
    }

    /// Evaluate a room's cards against the drawn numbers and pay every
    /// newly qualifying win through `session.transfer_from_system`.
    ///
    /// The durable awarded-pattern set is loaded before detection and a
    /// win is recorded only after its transfer succeeded, which makes a
    /// repeated call with the same draw a no-op.
    ///
    /// Per-win failures never abort the loop: a failed transfer lands in
    /// `failed` and is retried on the next cycle, and a paid win whose
    /// record failed lands in `paid_unrecorded`. The latter leaves a
    /// re-award window (the pattern is absent from the durable set, so a
    /// later cycle pays it again), sibling to the crash window on
    /// `transfer_from_system` itself.
    pub async fn process_draw(
        &self,
        session: &mut WalletSession,
        room_id: &str,
        cards: &[Card],
        drawn_numbers: &[u32],
    ) -> LedgerResult<PayoutReport> {
        let awarded = self.ledger.awarded_patterns(room_id)?;
        let wins = detect_wins(cards, drawn_numbers, &awarded, &self.prizes);

        let mut report = PayoutReport::default();
        for win in wins {
            let dest = match self.ledger.get_or_create_wallet(&win.player_id).await {
                Ok(wallet) => wallet,
                Err(e) => {
                    warn!(
                        room_id,
                        player_id = %win.player_id,
                        pattern = %win.win_type,
                        error = %e,
                        "Could not resolve winner wallet, skipping payout"
                    );
                    report.failed.push(win);
                    continue;
                }
            };

            let description = format!("Payout: {} in room {}", win.win_type, room_id);
            if session
                .transfer_from_system(&dest.id, win.prize, &description)
                .await
            {
                match self.ledger.record_win(room_id, &win).await {
                    Ok(()) => {
                        info!(
                            room_id,
                            pattern = %win.win_type,
                            player_id = %win.player_id,
                            prize = win.prize,
                            "Paid out win"
                        );
                        report.paid.push(win);
                    }
                    Err(e) => {
                        warn!(
                            room_id,
                            pattern = %win.win_type,
                            player_id = %win.player_id,
                            error = %e,
                            "Paid win could not be recorded; pattern may be re-awarded"
                        );
                        report.paid_unrecorded.push(win);
                    }
                }
            } else {
                warn!(
                    room_id,
                    pattern = %win.win_type,
                    player_id = %win.player_id,
                    "Payout transfer failed, continuing with remaining wins"
                );
                report.failed.push(win);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TxCategory;
    use crate::local_wallet::LocalChipStore;
    use crate::prizes::WinPattern;
    use crate::storage::LedgerStorage;
    use tempfile::TempDir;

    fn setup(system: Option<&str>) -> (PayoutCoordinator, WalletSession, Arc<LedgerStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = LedgerStorage::open_path(dir.path().join("ledger")).unwrap();
        let ledger = Arc::new(LedgerStore::new(storage));
        let local = LocalChipStore::new(dir.path().join("local_wallet.json"));
        let session = WalletSession::new(ledger.clone(), local, system.map(str::to_string));
        let coordinator = PayoutCoordinator::new(ledger.clone(), PrizeTable::default());
        (coordinator, session, ledger, dir)
    }

    fn card(id: &str, player: &str) -> Card {
        let mut numbers = [0u32; 15];
        for (i, n) in numbers.iter_mut().enumerate() {
            *n = i as u32 + 1;
        }
        Card {
            id: id.to_string(),
            room_id: "room-1".to_string(),
            player_id: player.to_string(),
            numbers,
        }
    }

    #[tokio::test]
    async fn test_row1_paid_once() {
        let (coordinator, mut session, ledger, _dir) = setup(None);
        let cards = vec![card("c1", "alice")];

        let report = coordinator
            .process_draw(&mut session, "room-1", &cards, &[1, 2, 3, 4, 5])
            .await
            .unwrap();
        assert_eq!(report.paid.len(), 1);
        assert_eq!(report.paid[0].win_type, WinPattern::Row1);
        assert!(report.failed.is_empty());

        let wallet = ledger.find_wallet("alice").unwrap().unwrap();
        assert_eq!(wallet.balance, 500);

        // Re-processing the same draw is a no-op.
        let again = coordinator
            .process_draw(&mut session, "room-1", &cards, &[1, 2, 3, 4, 5])
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(ledger.get_balance(&wallet.id).unwrap(), 500);
    }

    #[tokio::test]
    async fn test_full_card_pays_all_patterns() {
        let (coordinator, mut session, ledger, _dir) = setup(None);
        let cards = vec![card("c1", "alice")];
        let drawn: Vec<u32> = (1..=15).collect();

        let report = coordinator
            .process_draw(&mut session, "room-1", &cards, &drawn)
            .await
            .unwrap();
        assert_eq!(report.paid.len(), 5);

        let wallet = ledger.find_wallet("alice").unwrap().unwrap();
        assert_eq!(wallet.balance, 500 + 400 + 300 + 1000 + 5000);
        assert_eq!(ledger.transactions(&wallet.id).unwrap().len(), 5);
        assert_eq!(ledger.awarded_patterns("room-1").unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_incremental_draws_award_incrementally() {
        let (coordinator, mut session, ledger, _dir) = setup(None);
        let cards = vec![card("c1", "alice")];

        let first = coordinator
            .process_draw(&mut session, "room-1", &cards, &[1, 2, 3, 4, 5])
            .await
            .unwrap();
        assert_eq!(first.paid.len(), 1);

        let drawn: Vec<u32> = (1..=10).collect();
        let second = coordinator
            .process_draw(&mut session, "room-1", &cards, &drawn)
            .await
            .unwrap();
        assert_eq!(second.paid.len(), 1);
        assert_eq!(second.paid[0].win_type, WinPattern::Row2);

        let wallet = ledger.find_wallet("alice").unwrap().unwrap();
        assert_eq!(wallet.balance, 900);
    }

    #[tokio::test]
    async fn test_payouts_funded_by_system_wallet() {
        let (coordinator, mut session, ledger, _dir) = setup(Some("house"));
        let cards = vec![card("c1", "alice")];

        coordinator
            .process_draw(&mut session, "room-1", &cards, &[1, 2, 3, 4, 5])
            .await
            .unwrap();

        let system = ledger.find_wallet("house").unwrap().unwrap();
        assert_eq!(system.balance, -500);
        let history = ledger.transactions(&system.id).unwrap();
        assert_eq!(history[0].category, TxCategory::AdminAdjustment);
    }

    #[tokio::test]
    async fn test_multi_win_draw_settles_every_win() {
        let (coordinator, mut session, ledger, _dir) = setup(None);
        // Alice completes row 1, Bob completes row 2 on his own card.
        let alice = card("c1", "alice");
        let mut bob_numbers = [0u32; 15];
        for (i, n) in bob_numbers.iter_mut().enumerate() {
            *n = i as u32 + 40;
        }
        let bob = Card {
            id: "c2".to_string(),
            room_id: "room-1".to_string(),
            player_id: "bob".to_string(),
            numbers: bob_numbers,
        };
        let cards = vec![alice, bob];

        let report = coordinator
            .process_draw(&mut session, "room-1", &cards, &[1, 2, 3, 4, 5, 45, 46, 47, 48, 49])
            .await
            .unwrap();

        // Every detected win is accounted for in exactly one bucket.
        assert_eq!(report.paid.len(), 2);
        assert!(report.paid_unrecorded.is_empty());
        assert!(report.failed.is_empty());

        let alice_wallet = ledger.find_wallet("alice").unwrap().unwrap();
        assert_eq!(alice_wallet.balance, 500);
        let bob_wallet = ledger.find_wallet("bob").unwrap().unwrap();
        assert_eq!(bob_wallet.balance, 400);
        assert_eq!(ledger.awarded_patterns("room-1").unwrap().len(), 2);
    }

    #[test]
    fn test_report_empty_only_without_any_outcome() {
        let win = DetectedWin {
            win_type: WinPattern::Row1,
            player_id: "alice".to_string(),
            card_id: "c1".to_string(),
            prize: 500,
        };

        assert!(PayoutReport::default().is_empty());
        let unrecorded = PayoutReport {
            paid_unrecorded: vec![win.clone()],
            ..Default::default()
        };
        assert!(!unrecorded.is_empty());
        let failed = PayoutReport {
            failed: vec![win],
            ..Default::default()
        };
        assert!(!failed.is_empty());
    }

    #[tokio::test]
    async fn test_no_wins_no_payouts() {
        let (coordinator, mut session, ledger, _dir) = setup(None);
        let cards = vec![card("c1", "alice")];

        let report = coordinator
            .process_draw(&mut session, "room-1", &cards, &[90, 89, 88])
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(ledger.find_wallet("alice").unwrap().is_none());
    }
}
