//! Wallet session façade
//!
//! Binds to exactly one active identity at a time: anonymous (backed by
//! the device-local wallet file) or authenticated (backed by the ledger
//! store, keyed by owner identity). Identity transitions arrive as
//! explicit `sign_in` calls, not through shared global state.
//!
//! One mutation at a time per session by convention; the ledger store
//! underneath serializes concurrent writers on its own.

use crate::errors::{LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::ledger::{LedgerStore, TxCategory};
use crate::local_wallet::LocalChipStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The identity a session currently operates as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(String),
}

/// Stateful façade over the ledger for one player session
pub struct WalletSession {
    ledger: Arc<LedgerStore>,
    local: LocalChipStore,
    identity: Identity,
    system_wallet_owner: Option<String>,
    /// Server-resolved wallet id for the authenticated identity.
    wallet_id: Option<String>,
    /// Locally cached balance; realtime events overwrite it, latest wins.
    cached_balance: Option<i64>,
    /// User-visible error state with a manual retry affordance.
    last_error: Option<String>,
}

impl WalletSession {
    pub fn new(
        ledger: Arc<LedgerStore>,
        local: LocalChipStore,
        system_wallet_owner: Option<String>,
    ) -> Self {
        Self {
            ledger,
            local,
            identity: Identity::Anonymous,
            system_wallet_owner,
            wallet_id: None,
            cached_balance: None,
            last_error: None,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Resolved ledger wallet id, once authenticated and refreshed.
    pub fn wallet_id(&self) -> Option<&str> {
        self.wallet_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Re-read the authoritative balance for the current identity. The
    /// authenticated wallet is created lazily on first query.
    pub async fn refresh(&mut self) -> LedgerResult<i64> {
        let result = match self.identity.clone() {
            Identity::Anonymous => self.local.balance(),
            Identity::Authenticated(owner) => match self.ledger.get_or_create_wallet(&owner).await
            {
                Ok(wallet) => {
                    self.wallet_id = Some(wallet.id);
                    Ok(wallet.balance)
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(balance) => {
                self.cached_balance = Some(balance);
                self.last_error = None;
                Ok(balance)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Current balance, cached if available.
    pub async fn balance(&mut self) -> LedgerResult<i64> {
        match self.cached_balance {
            Some(balance) => Ok(balance),
            None => self.refresh().await,
        }
    }

    /// Credit chips to the current identity's wallet.
    pub async fn credit(&mut self, amount: i64, category: TxCategory) -> LedgerResult<i64> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.apply(amount, category, "Credit via app").await
    }

    /// Debit chips from the current identity's wallet.
    pub async fn debit(&mut self, amount: i64) -> LedgerResult<i64> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.apply(-amount, TxCategory::Debit, "Debit via app").await
    }

    async fn apply(
        &mut self,
        amount: i64,
        category: TxCategory,
        description: &str,
    ) -> LedgerResult<i64> {
        let result = match self.identity.clone() {
            Identity::Anonymous => self.local.apply(amount),
            Identity::Authenticated(_) => {
                if self.wallet_id.is_none() {
                    self.refresh().await?;
                }
                let wallet_id = self
                    .wallet_id
                    .clone()
                    .ok_or_else(|| LedgerError::WalletNotFound("unresolved session".to_string()))?;
                self.ledger
                    .apply_delta(&wallet_id, amount, category, description)
                    .await
                    .map(|wallet| wallet.balance)
            }
        };

        match result {
            Ok(balance) => {
                self.cached_balance = Some(balance);
                self.last_error = None;
                Ok(balance)
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Transition this session to an authenticated identity and reconcile
    /// the anonymous local balance into the owner's ledger wallet.
    ///
    /// The merge runs at most once per sign-in: the local wallet is zeroed
    /// only after the ledger credit is confirmed committed, so a duplicate
    /// sign-in event finds a zero local balance and merges nothing. Merge
    /// failures are logged, not surfaced; the local balance stays intact
    /// and is retried on the next sign-in event.
    pub async fn sign_in(&mut self, owner: &str) -> LedgerResult<i64> {
        self.identity = Identity::Authenticated(owner.to_string());
        self.wallet_id = None;
        self.cached_balance = None;

        match self.local.balance() {
            Ok(local_balance) if local_balance > 0 => {
                match self
                    .ledger
                    .merge_credit(owner, local_balance, "Local wallet merge")
                    .await
                {
                    Ok(wallet) => {
                        // Credit is durable; only now is it safe to zero
                        // the local wallet.
                        if let Err(e) = self.local.set_balance(0) {
                            warn!(error = %e, "Merged local balance but failed to zero local wallet");
                        }
                        info!(
                            %owner,
                            wallet_id = %wallet.id,
                            merged = local_balance,
                            "Merged local wallet on sign-in"
                        );
                    }
                    Err(e) => {
                        warn!(%owner, error = %e, "Sign-in wallet merge failed");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%owner, error = %e, "Could not read local wallet during sign-in");
            }
        }

        self.refresh().await
    }

    /// Feed an asynchronous ledger event into the session. The
    /// latest-arriving server-confirmed value is authoritative and
    /// overwrites whatever an in-flight mutation cached optimistically.
    pub fn apply_event(&mut self, event: &LedgerEvent) {
        if let LedgerEvent::BalanceUpdated { wallet_id, balance } = event {
            if self.wallet_id.as_deref() == Some(wallet_id.as_str()) {
                self.cached_balance = Some(*balance);
            }
        }
    }

    /// Issue a system-to-player chip transfer.
    ///
    /// Without a configured system wallet the destination is credited
    /// directly, as funds issued from an unbounded external source. With
    /// one configured, the system wallet is debited (allowed to go
    /// negative) and the destination credited as two separate atomic
    /// operations; a crash between them leaves the system wallet debited
    /// with no matching payout delivered.
    ///
    /// The system wallet is resolved lazily: configuring an owner with no
    /// existing wallet mints one on the first transfer instead of failing
    /// the payout.
    ///
    /// Returns success/failure instead of an error so one failed payout
    /// cannot abort the caller's win-processing loop.
    pub async fn transfer_from_system(
        &mut self,
        dest_wallet_id: &str,
        amount: i64,
        description: &str,
    ) -> bool {
        if amount <= 0 {
            return true;
        }

        if let Some(system_owner) = self.system_wallet_owner.clone() {
            let system_wallet = match self.ledger.get_or_create_wallet(&system_owner).await {
                Ok(wallet) => wallet,
                Err(e) => {
                    error!(%system_owner, error = %e, "Failed to resolve system wallet");
                    return false;
                }
            };

            if let Err(e) = self
                .ledger
                .apply_delta_with(
                    &system_wallet.id,
                    -amount,
                    TxCategory::AdminAdjustment,
                    description,
                    true,
                )
                .await
            {
                error!(error = %e, "System wallet debit failed, payout not attempted");
                return false;
            }
        }

        match self
            .ledger
            .apply_delta(dest_wallet_id, amount, TxCategory::Payout, description)
            .await
        {
            Ok(updated) => {
                if self.wallet_id.as_deref() == Some(dest_wallet_id) {
                    self.cached_balance = Some(updated.balance);
                }
                true
            }
            Err(e) => {
                // Partial payout: when a system wallet is configured its
                // debit leg has already committed at this point.
                error!(
                    dest_wallet_id,
                    amount,
                    error = %e,
                    "Payout credit failed"
                );
                false
            }
        }
    }
}
