//! Transaction engine
//!
//! Creates, validates and applies transactions against wallets. Every
//! wallet mutation runs under that wallet's lock; the lock covers exactly
//! the read-check-write-persist cycle and nothing else.

use crate::{reference, EngineError, EngineResult, LedgerEvent, Notifier};
use inkpay_fees::FeeSchedule;
use inkpay_ledger::{LedgerStore, WalletLocks};
use inkpay_types::{
    is_positive_amount, BankAccount, BankAccountId, CardDetails, CardId, Clock, PaymentMethod,
    Transaction, TransactionId, TransactionKind, TransactionStatus, UserId, Wallet,
};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Why a movement was declined by business rules
///
/// Declines are expected outcomes, not errors: the transaction record is
/// marked `Failed` with this reason rendered onto it.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclineReason {
    /// Wallet missing or inactive
    WalletUnavailable,
    /// Debit would push the balance below zero
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    /// Referenced instrument vanished or was deactivated mid-workflow
    InstrumentUnavailable { detail: String },
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletUnavailable => write!(f, "wallet not found or inactive"),
            Self::InsufficientBalance {
                available,
                requested,
            } => write!(
                f,
                "insufficient balance: available {}, requested {}",
                available, requested
            ),
            Self::InstrumentUnavailable { detail } => {
                write!(f, "instrument unavailable: {}", detail)
            }
        }
    }
}

/// Result of applying a transaction to a wallet
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Wallet delta applied; transaction is `Completed`
    Applied { new_balance: Decimal },
    /// Business rules declined the movement; transaction is `Failed` with
    /// the reason stored on the record
    Declined { reason: DeclineReason },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Outcome of a two-leg wallet-to-wallet transfer
///
/// The two legs are independent single-wallet transactions; there is no
/// cross-wallet atomicity. A declined credit leg after an applied debit leg
/// is visible here so the caller can compensate.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub debit: Transaction,
    pub debit_outcome: ApplyOutcome,
    pub credit: Option<Transaction>,
    pub credit_outcome: Option<ApplyOutcome>,
}

/// The wallet transaction engine
pub struct TransactionEngine {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub(crate) fees: FeeSchedule,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) notifier: Arc<dyn Notifier>,
    locks: WalletLocks,
}

impl TransactionEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            fees: FeeSchedule::new(),
            clock,
            notifier,
            locks: WalletLocks::new(),
        }
    }

    /// The fee schedule the engine applies
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Load the owner's wallet, creating an empty active one on first access
    pub fn wallet_or_create(&self, owner: &UserId) -> EngineResult<Wallet> {
        if let Some(wallet) = self.store.wallet(owner)? {
            return Ok(wallet);
        }
        let wallet = Wallet::new(owner.clone(), self.clock.now());
        self.store.put_wallet(wallet.clone())?;
        tracing::info!(owner = %owner, "wallet created");
        Ok(wallet)
    }

    /// Create a `Pending` transaction with fee split and unique reference.
    ///
    /// Rejects non-positive amounts and unknown/inactive/foreign
    /// instruments before anything is persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn create_transaction(
        &self,
        owner: &UserId,
        kind: TransactionKind,
        method: PaymentMethod,
        amount: Decimal,
        description: Option<String>,
        bank_account_id: Option<BankAccountId>,
        card_id: Option<CardId>,
    ) -> EngineResult<Transaction> {
        if !is_positive_amount(amount) {
            return Err(EngineError::InvalidAmount { amount });
        }
        if let Some(ref id) = bank_account_id {
            self.require_active_bank_account(owner, id)?;
        }
        if let Some(ref id) = card_id {
            self.require_active_card(owner, id)?;
        }

        let split = self.fees.assess(kind, method, amount);
        let reference =
            reference::mint_reference(self.clock.as_ref(), |r| self.store.reference_in_use(r))?;

        let transaction = Transaction {
            id: TransactionId::new(),
            owner: owner.clone(),
            kind,
            method,
            status: TransactionStatus::Pending,
            amount: split.gross,
            fee: split.fee,
            net_amount: split.net,
            bank_account_id,
            card_id,
            related_transaction_id: None,
            reference,
            description,
            failure_reason: None,
            created_at: self.clock.now(),
            processed_at: None,
        };
        self.store.put_transaction(transaction.clone())?;
        tracing::debug!(
            reference = %transaction.reference,
            kind = %kind,
            amount = %amount,
            "transaction created"
        );
        Ok(transaction)
    }

    /// Apply a pending transaction to its owner's wallet.
    ///
    /// Serialized per wallet: concurrent applications against one owner
    /// queue on the same mutex, so no two can read the same stale balance.
    /// Applying an already-terminal transaction is an error, never a second
    /// wallet delta.
    pub fn apply_to_wallet(&self, id: &TransactionId) -> EngineResult<ApplyOutcome> {
        let mut transaction = self
            .store
            .transaction(id)?
            .ok_or_else(|| EngineError::TransactionNotFound { id: id.clone() })?;
        if transaction.is_terminal() {
            return Err(Self::already_terminal(&transaction));
        }

        let lock = self.locks.for_wallet(&transaction.owner);
        let outcome = {
            let _guard = lock.lock();
            // Re-load under the lock: a concurrent caller may have driven
            // this transaction terminal while we waited on the mutex, and
            // a terminal transaction must never produce a second delta.
            transaction = self
                .store
                .transaction(id)?
                .ok_or_else(|| EngineError::TransactionNotFound { id: id.clone() })?;
            if transaction.is_terminal() {
                return Err(Self::already_terminal(&transaction));
            }
            self.apply_locked(&mut transaction)?
        };

        // Terminal state reached; notify outside the lock
        match &outcome {
            ApplyOutcome::Applied { new_balance } => {
                tracing::info!(
                    reference = %transaction.reference,
                    kind = %transaction.kind,
                    amount = %transaction.amount,
                    balance = %new_balance,
                    "transaction completed"
                );
                self.emit(LedgerEvent::TransactionCompleted {
                    owner: transaction.owner.clone(),
                    reference: transaction.reference.clone(),
                    kind: transaction.kind,
                    amount: transaction.amount,
                });
            }
            ApplyOutcome::Declined { reason } => {
                tracing::warn!(
                    reference = %transaction.reference,
                    kind = %transaction.kind,
                    %reason,
                    "transaction declined"
                );
                self.emit(LedgerEvent::TransactionFailed {
                    owner: transaction.owner.clone(),
                    reference: transaction.reference.clone(),
                    kind: transaction.kind,
                    reason: reason.to_string(),
                });
            }
        }
        Ok(outcome)
    }

    /// Convenience: create and immediately apply a credit to the wallet
    pub fn deposit(
        &self,
        owner: &UserId,
        method: PaymentMethod,
        amount: Decimal,
        description: Option<String>,
    ) -> EngineResult<(Transaction, ApplyOutcome)> {
        self.wallet_or_create(owner)?;
        let transaction = self.create_transaction(
            owner,
            TransactionKind::Deposit,
            method,
            amount,
            description,
            None,
            None,
        )?;
        let outcome = self.apply_to_wallet(&transaction.id)?;
        Ok((transaction, outcome))
    }

    /// Convenience: create and immediately apply a wallet debit
    pub fn withdraw(
        &self,
        owner: &UserId,
        method: PaymentMethod,
        amount: Decimal,
        description: Option<String>,
    ) -> EngineResult<(Transaction, ApplyOutcome)> {
        let transaction = self.create_transaction(
            owner,
            TransactionKind::Withdrawal,
            method,
            amount,
            description,
            None,
            None,
        )?;
        let outcome = self.apply_to_wallet(&transaction.id)?;
        Ok((transaction, outcome))
    }

    /// Move funds between two wallets as two linked single-wallet legs.
    ///
    /// Not atomic across wallets: the debit leg settles before the credit
    /// leg exists. Callers inspect the receipt to compensate when the
    /// credit leg declines.
    pub fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Decimal,
        description: Option<String>,
    ) -> EngineResult<TransferReceipt> {
        let debit = self.create_transaction(
            from,
            TransactionKind::Transfer,
            PaymentMethod::Wallet,
            amount,
            description.clone(),
            None,
            None,
        )?;
        let debit_outcome = self.apply_to_wallet(&debit.id)?;
        if !debit_outcome.is_applied() {
            return Ok(TransferReceipt {
                debit,
                debit_outcome,
                credit: None,
                credit_outcome: None,
            });
        }

        self.wallet_or_create(to)?;
        let mut credit = self.create_transaction(
            to,
            TransactionKind::Deposit,
            PaymentMethod::Wallet,
            amount,
            description,
            None,
            None,
        )?;
        credit.related_transaction_id = Some(debit.id.clone());
        self.store.put_transaction(credit.clone())?;
        let credit_outcome = self.apply_to_wallet(&credit.id)?;
        Ok(TransferReceipt {
            debit,
            debit_outcome,
            credit: Some(credit),
            credit_outcome: Some(credit_outcome),
        })
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn already_terminal(transaction: &Transaction) -> EngineError {
        EngineError::AlreadyTerminal {
            entity: format!("transaction {}", transaction.reference),
            status: format!("{:?}", transaction.status),
        }
    }

    /// Steps 1-4 of application; caller holds the wallet lock.
    fn apply_locked(&self, transaction: &mut Transaction) -> EngineResult<ApplyOutcome> {
        let now = self.clock.now();

        let mut wallet = match self.store.wallet(&transaction.owner)? {
            Some(w) if w.is_active => w,
            _ => return self.decline(transaction, DeclineReason::WalletUnavailable, now),
        };
        let prior = wallet.clone();

        if transaction.kind.debits_wallet() {
            if !wallet.can_debit(transaction.amount) {
                let reason = DeclineReason::InsufficientBalance {
                    available: wallet.balance,
                    requested: transaction.amount,
                };
                return self.decline(transaction, reason, now);
            }
            // Debit is always the gross amount; the fee is an internal
            // bookkeeping split, not a separate deduction.
            wallet.balance -= transaction.amount;
        } else {
            wallet.balance += transaction.net_amount;
        }
        wallet.last_transaction_at = Some(now);
        let new_balance = wallet.balance;

        if let Err(err) = self.store.put_wallet(wallet) {
            // The balance write never landed; record the failure on the
            // transaction best-effort and surface the store error.
            transaction.status = TransactionStatus::Failed;
            transaction.failure_reason = Some(err.to_string());
            transaction.processed_at = Some(now);
            let _ = self.store.put_transaction(transaction.clone());
            return Err(err.into());
        }

        transaction.status = TransactionStatus::Completed;
        transaction.processed_at = Some(now);
        if let Err(err) = self.store.put_transaction(transaction.clone()) {
            // Roll the balance back: a delta without its audit record would
            // break the applied-exactly-once invariant.
            let _ = self.store.put_wallet(prior);
            return Err(err.into());
        }

        Ok(ApplyOutcome::Applied { new_balance })
    }

    /// Mark a transaction `Failed` with an auditable reason.
    fn decline(
        &self,
        transaction: &mut Transaction,
        reason: DeclineReason,
        now: chrono::DateTime<chrono::Utc>,
    ) -> EngineResult<ApplyOutcome> {
        transaction.status = TransactionStatus::Failed;
        transaction.failure_reason = Some(reason.to_string());
        transaction.processed_at = Some(now);
        self.store.put_transaction(transaction.clone())?;
        Ok(ApplyOutcome::Declined { reason })
    }

    pub(crate) fn require_active_bank_account(
        &self,
        owner: &UserId,
        id: &BankAccountId,
    ) -> EngineResult<BankAccount> {
        match self.store.bank_account(id)? {
            Some(account) if account.is_active && &account.owner == owner => Ok(account),
            _ => Err(EngineError::UnknownInstrument {
                detail: format!("bank account {}", id),
            }),
        }
    }

    pub(crate) fn require_active_card(
        &self,
        owner: &UserId,
        id: &CardId,
    ) -> EngineResult<CardDetails> {
        match self.store.card(id)? {
            Some(card) if card.is_active && &card.owner == owner => Ok(card),
            _ => Err(EngineError::UnknownInstrument {
                detail: format!("card {}", id),
            }),
        }
    }

    pub(crate) fn emit(&self, event: LedgerEvent) {
        if let Err(err) = self.notifier.notify(&event) {
            // Notification failures never fail the financial operation
            tracing::warn!(error = %err, "notification failed");
        }
    }
}
