//! Tombola - Chip Ledger & Win Detection Core
//!
//! Virtual-currency ledger for a bingo-style game: per-player chip
//! wallets with an append-only transaction history, an anonymous-local
//! wallet that merges into a server wallet on sign-in, a pure win
//! detector over cards and drawn numbers, and a payout coordinator that
//! turns detected wins into durable ledger credits.

pub mod config;
pub mod detector;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod local_wallet;
pub mod payout;
pub mod prizes;
pub mod session;
pub mod storage;

pub use config::{ConfigLoader, TombolaConfig};
pub use detector::{detect_wins, Card, DetectedWin};
pub use errors::{LedgerError, TombolaError, TombolaResult};
pub use events::{EventHub, LedgerEvent};
pub use ledger::{ChipTransaction, LedgerStore, TxCategory, Wallet};
pub use local_wallet::LocalChipStore;
pub use payout::{PayoutCoordinator, PayoutReport};
pub use prizes::{PrizeTable, WinPattern};
pub use session::{Identity, WalletSession};
pub use storage::LedgerStorage;
