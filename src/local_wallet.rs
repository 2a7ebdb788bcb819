//! Device-local anonymous chip wallet
//!
//! One wallet per local device/session, unscoped to any owner, persisted
//! as a small JSON file so it needs no network connection. Created lazily
//! on first access.

use crate::errors::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalWallet {
    pub id: String,
    pub balance: i64,
}

/// File-backed store for the anonymous local wallet
pub struct LocalChipStore {
    path: PathBuf,
}

impl LocalChipStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the local wallet, creating a zero-balance one on first use.
    pub fn get_wallet(&self) -> LedgerResult<LocalWallet> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| LedgerError::CorruptedData(format!("Local wallet file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let wallet = LocalWallet {
                    id: Uuid::new_v4().to_string(),
                    balance: 0,
                };
                self.write(&wallet)?;
                debug!(wallet_id = %wallet.id, "Created local wallet");
                Ok(wallet)
            }
            Err(e) => Err(LedgerError::Persistence(format!(
                "Failed to read local wallet: {}",
                e
            ))),
        }
    }

    pub fn balance(&self) -> LedgerResult<i64> {
        Ok(self.get_wallet()?.balance)
    }

    pub fn set_balance(&self, balance: i64) -> LedgerResult<()> {
        let mut wallet = self.get_wallet()?;
        wallet.balance = balance;
        self.write(&wallet)
    }

    /// Apply a signed delta to the local balance. The local wallet keeps
    /// no transaction history; only the ledger store does.
    pub fn apply(&self, amount: i64) -> LedgerResult<i64> {
        let mut wallet = self.get_wallet()?;
        let new_balance = wallet.balance + amount;
        if new_balance < 0 {
            return Err(LedgerError::InsufficientFunds {
                requested: -amount,
                available: wallet.balance,
            });
        }
        wallet.balance = new_balance;
        self.write(&wallet)?;
        Ok(new_balance)
    }

    fn write(&self, wallet: &LocalWallet) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LedgerError::Persistence(format!("Failed to create wallet directory: {}", e))
            })?;
        }
        let json = serde_json::to_string_pretty(wallet)
            .map_err(|e| LedgerError::Persistence(format!("Failed to encode wallet: {}", e)))?;
        std::fs::write(&self.path, json)
            .map_err(|e| LedgerError::Persistence(format!("Failed to write local wallet: {}", e)))
    }
}
