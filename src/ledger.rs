//! Chip ledger store
//!
//! Durable record of wallets and their append-only transaction history,
//! plus the per-room record of awarded win patterns. Every balance change
//! commits together with its transaction row in one write batch, and a
//! per-wallet lock serializes concurrent writers so the post-condition
//! balance is always computed from a consistent snapshot.
//!
//! Invariant: a wallet's balance equals the sum of its transaction
//! amounts, at all times.

use crate::detector::DetectedWin;
use crate::errors::{LedgerError, LedgerResult};
use crate::events::{EventHub, LedgerEvent};
use crate::prizes::WinPattern;
use crate::storage::LedgerStorage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Ledger transaction categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TxCategory {
    /// Player bought chips.
    Purchase,
    /// Game prize credited to a player.
    Payout,
    /// Player-initiated spend.
    Debit,
    /// Administrative balance correction; the system wallet funds payouts
    /// through these and may go negative.
    AdminAdjustment,
    /// Anonymous local balance reconciled into an authenticated wallet.
    Merge,
}

impl fmt::Display for TxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxCategory::Purchase => "purchase",
            TxCategory::Payout => "payout",
            TxCategory::Debit => "debit",
            TxCategory::AdminAdjustment => "admin_adjustment",
            TxCategory::Merge => "merge",
        };
        write!(f, "{}", name)
    }
}

/// A balance-holding account, keyed by id and indexed by owner identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    pub id: String,
    pub owner: Option<String>,
    pub balance: i64,
    next_tx_seq: u64,
}

/// An immutable signed ledger entry causally explaining a balance change.
/// Never mutated or deleted once committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChipTransaction {
    pub id: String,
    pub wallet_id: String,
    pub amount: i64,
    pub category: TxCategory,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

fn wallet_key(wallet_id: &str) -> String {
    format!("wallet:{}", wallet_id)
}

fn owner_key(owner: &str) -> String {
    format!("owner:{}", owner)
}

fn tx_key(wallet_id: &str, seq: u64) -> String {
    format!("tx:{}:{:010}", wallet_id, seq)
}

fn win_key(room_id: &str, seq: u64) -> String {
    format!("win:{}:{:04}", room_id, seq)
}

/// Durable wallet and transaction store
pub struct LedgerStore {
    storage: LedgerStorage,
    /// Hot wallet cache; only updated while holding the wallet's lock.
    wallets: DashMap<String, Wallet>,
    /// Per-key async locks serializing read-modify-write cycles.
    locks: DashMap<String, Arc<Mutex<()>>>,
    events: EventHub,
}

impl LedgerStore {
    pub fn new(storage: LedgerStorage) -> Self {
        Self {
            storage,
            wallets: DashMap::new(),
            locks: DashMap::new(),
            events: EventHub::new(),
        }
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_wallet(&self, wallet_id: &str) -> LedgerResult<Option<Wallet>> {
        match self.storage.get(wallet_key(wallet_id).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Look up a wallet by owner identity without creating one.
    pub fn find_wallet(&self, owner: &str) -> LedgerResult<Option<Wallet>> {
        match self.storage.get(owner_key(owner).as_bytes())? {
            Some(id_bytes) => {
                let wallet_id = String::from_utf8(id_bytes)
                    .map_err(|_| LedgerError::CorruptedData("Invalid owner index".to_string()))?;
                self.read_wallet(&wallet_id)
            }
            None => Ok(None),
        }
    }

    /// Resolve a wallet by id, cache first.
    pub fn get_wallet(&self, wallet_id: &str) -> LedgerResult<Wallet> {
        if let Some(wallet) = self.wallets.get(wallet_id) {
            return Ok(wallet.clone());
        }
        self.read_wallet(wallet_id)?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))
    }

    pub fn get_balance(&self, wallet_id: &str) -> LedgerResult<i64> {
        Ok(self.get_wallet(wallet_id)?.balance)
    }

    /// Get the wallet for `owner`, creating an empty one on first use.
    /// Idempotent under concurrency: the per-owner lock guarantees the
    /// second caller observes the first caller's wallet.
    pub async fn get_or_create_wallet(&self, owner: &str) -> LedgerResult<Wallet> {
        let lock = self.lock_for(&owner_key(owner));
        let _guard = lock.lock().await;

        if let Some(wallet) = self.find_wallet(owner)? {
            return Ok(wallet);
        }

        let wallet = Wallet {
            id: Uuid::new_v4().to_string(),
            owner: Some(owner.to_string()),
            balance: 0,
            next_tx_seq: 0,
        };
        self.storage.batch_write(&[
            (wallet_key(&wallet.id).into_bytes(), bincode::serialize(&wallet)?),
            (owner_key(owner).into_bytes(), wallet.id.clone().into_bytes()),
        ])?;
        self.wallets.insert(wallet.id.clone(), wallet.clone());
        info!(wallet_id = %wallet.id, %owner, "Created wallet");
        Ok(wallet)
    }

    /// Apply a signed balance delta and append the explaining transaction
    /// as one indivisible commit. Rejects debits that would drive the
    /// balance below zero.
    pub async fn apply_delta(
        &self,
        wallet_id: &str,
        amount: i64,
        category: TxCategory,
        description: &str,
    ) -> LedgerResult<Wallet> {
        self.apply_delta_with(wallet_id, amount, category, description, false)
            .await
    }

    /// Like `apply_delta`, but with an explicit choice on negative
    /// balances. The system wallet is conceptually unbounded, so its
    /// payout-funding debits pass `allow_negative = true`.
    pub async fn apply_delta_with(
        &self,
        wallet_id: &str,
        amount: i64,
        category: TxCategory,
        description: &str,
        allow_negative: bool,
    ) -> LedgerResult<Wallet> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(0));
        }

        let lock = self.lock_for(&wallet_key(wallet_id));
        let _guard = lock.lock().await;

        // Storage is authoritative inside the lock; the cache may lag.
        let mut wallet = self
            .read_wallet(wallet_id)?
            .ok_or_else(|| LedgerError::WalletNotFound(wallet_id.to_string()))?;

        let new_balance = wallet.balance + amount;
        if new_balance < 0 && !allow_negative {
            return Err(LedgerError::InsufficientFunds {
                requested: -amount,
                available: wallet.balance,
            });
        }

        let transaction = ChipTransaction {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet_id.to_string(),
            amount,
            category,
            description: description.to_string(),
            created_at: Utc::now(),
        };

        let seq = wallet.next_tx_seq;
        wallet.balance = new_balance;
        wallet.next_tx_seq += 1;

        self.storage.batch_write(&[
            (wallet_key(wallet_id).into_bytes(), bincode::serialize(&wallet)?),
            (
                tx_key(wallet_id, seq).into_bytes(),
                bincode::serialize(&transaction)?,
            ),
        ])?;
        self.wallets.insert(wallet_id.to_string(), wallet.clone());

        debug!(
            wallet_id,
            amount,
            balance = wallet.balance,
            %category,
            "Applied ledger delta"
        );
        self.events.publish(LedgerEvent::BalanceUpdated {
            wallet_id: wallet_id.to_string(),
            balance: wallet.balance,
        });

        Ok(wallet)
    }

    /// Reconcile an anonymous local balance into `owner`'s wallet. If the
    /// wallet does not exist yet it is created pre-seeded with the amount
    /// and its explaining merge transaction in one commit; otherwise the
    /// amount is credited as a regular merge-category delta.
    pub async fn merge_credit(
        &self,
        owner: &str,
        amount: i64,
        description: &str,
    ) -> LedgerResult<Wallet> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let lock = self.lock_for(&owner_key(owner));
        let _guard = lock.lock().await;

        if let Some(existing) = self.find_wallet(owner)? {
            drop(_guard);
            return self
                .apply_delta(&existing.id, amount, TxCategory::Merge, description)
                .await;
        }

        let wallet = Wallet {
            id: Uuid::new_v4().to_string(),
            owner: Some(owner.to_string()),
            balance: amount,
            next_tx_seq: 1,
        };
        let transaction = ChipTransaction {
            id: Uuid::new_v4().to_string(),
            wallet_id: wallet.id.clone(),
            amount,
            category: TxCategory::Merge,
            description: description.to_string(),
            created_at: Utc::now(),
        };

        self.storage.batch_write(&[
            (wallet_key(&wallet.id).into_bytes(), bincode::serialize(&wallet)?),
            (owner_key(owner).into_bytes(), wallet.id.clone().into_bytes()),
            (
                tx_key(&wallet.id, 0).into_bytes(),
                bincode::serialize(&transaction)?,
            ),
        ])?;
        self.wallets.insert(wallet.id.clone(), wallet.clone());

        info!(wallet_id = %wallet.id, %owner, amount, "Created wallet pre-seeded from local merge");
        self.events.publish(LedgerEvent::BalanceUpdated {
            wallet_id: wallet.id.clone(),
            balance: wallet.balance,
        });

        Ok(wallet)
    }

    /// A wallet's full transaction history in append order.
    pub fn transactions(&self, wallet_id: &str) -> LedgerResult<Vec<ChipTransaction>> {
        let prefix = format!("tx:{}:", wallet_id);
        let entries = self.storage.scan_prefix(prefix.as_bytes())?;
        entries
            .into_iter()
            .map(|(_, value)| Ok(bincode::deserialize(&value)?))
            .collect()
    }

    /// Durably record a win so the pattern is never re-awarded within the
    /// room's lifetime.
    pub async fn record_win(&self, room_id: &str, win: &DetectedWin) -> LedgerResult<()> {
        let lock = self.lock_for(&format!("win:{}", room_id));
        let _guard = lock.lock().await;

        let seq = self.wins(room_id)?.len() as u64;
        self.storage
            .put(win_key(room_id, seq).as_bytes(), &bincode::serialize(win)?)?;

        info!(
            room_id,
            pattern = %win.win_type,
            player_id = %win.player_id,
            prize = win.prize,
            "Recorded win"
        );
        self.events.publish(LedgerEvent::WinRecorded {
            room_id: room_id.to_string(),
            win: win.clone(),
        });
        Ok(())
    }

    /// All wins recorded for a room, in insertion order.
    pub fn wins(&self, room_id: &str) -> LedgerResult<Vec<DetectedWin>> {
        let prefix = format!("win:{}:", room_id);
        let entries = self.storage.scan_prefix(prefix.as_bytes())?;
        entries
            .into_iter()
            .map(|(_, value)| Ok(bincode::deserialize(&value)?))
            .collect()
    }

    /// The set of patterns already awarded in a room, fed back into the
    /// win detector as its `already_awarded` input.
    pub fn awarded_patterns(&self, room_id: &str) -> LedgerResult<HashSet<WinPattern>> {
        Ok(self
            .wins(room_id)?
            .into_iter()
            .map(|w| w.win_type)
            .collect())
    }
}
