//! Real-time ledger event hub
//!
//! Broadcast channel that pushes balance updates and new-win inserts to
//! subscribers. A subscription detaches when its handle is dropped, no
//! matter how the owning scope exits.

use crate::detector::DetectedWin;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Ledger event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// A wallet's balance changed; carries the server-confirmed value.
    #[serde(rename = "balance_updated")]
    BalanceUpdated { wallet_id: String, balance: i64 },

    /// A win was durably recorded for a room.
    #[serde(rename = "win_recorded")]
    WinRecorded { room_id: String, win: DetectedWin },
}

/// Fan-out hub for ledger events
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<LedgerEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event to all live subscribers. Events published with no
    /// subscribers attached are dropped.
    pub fn publish(&self, event: LedgerEvent) {
        let receivers = self.tx.receiver_count();
        if receivers > 0 {
            debug!(?event, receivers, "Publishing ledger event");
        }
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped subscription handle; dropping it unsubscribes.
pub struct EventSubscription {
    rx: broadcast::Receiver<LedgerEvent>,
}

impl EventSubscription {
    /// Wait for the next event. Lag past the channel capacity skips the
    /// overwritten events and keeps receiving; `None` means the hub is
    /// gone.
    pub async fn recv(&mut self) -> Option<LedgerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event subscriber lagged, resuming");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drain any event that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<LedgerEvent> {
        self.rx.try_recv().ok()
    }
}
