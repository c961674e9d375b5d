//! Inkpay Ledger Store
//!
//! Durable keyed storage for wallets, transactions, withdrawal requests and
//! payment instruments, behind the [`LedgerStore`] trait. The engine reads
//! and writes whole records; atomicity per wallet comes from the
//! [`WalletLocks`] registry, which serializes every read-check-write-persist
//! cycle against a wallet id.
//!
//! # Invariants
//!
//! 1. Writes either land completely or not at all (per record)
//! 2. Store failures are infrastructure errors, distinct from business declines
//! 3. Soft-deleted instruments stay resolvable by id

pub mod locks;
pub mod memory;

pub use locks::*;
pub use memory::*;

use inkpay_types::{
    BankAccount, BankAccountId, CardDetails, CardId, Transaction, TransactionId, UserId, Wallet,
    WithdrawalRequest, WithdrawalRequestId, WithdrawalStatus,
};
use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("write conflict on {entity}")]
    Conflict { entity: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed storage boundary for all ledger entities
///
/// Implementations must make each `put_*` atomic per record. Missing records
/// surface as `Ok(None)`, never as an error; errors mean the store itself
/// misbehaved.
pub trait LedgerStore: Send + Sync {
    // Wallets (keyed by owner; one wallet per user)
    fn wallet(&self, owner: &UserId) -> StoreResult<Option<Wallet>>;
    fn put_wallet(&self, wallet: Wallet) -> StoreResult<()>;

    // Transactions
    fn transaction(&self, id: &TransactionId) -> StoreResult<Option<Transaction>>;
    fn put_transaction(&self, transaction: Transaction) -> StoreResult<()>;
    fn transactions_for(&self, owner: &UserId) -> StoreResult<Vec<Transaction>>;
    /// Whether any stored transaction already uses this reference string
    fn reference_in_use(&self, reference: &str) -> StoreResult<bool>;

    // Withdrawal requests
    fn withdrawal_request(&self, id: &WithdrawalRequestId)
        -> StoreResult<Option<WithdrawalRequest>>;
    fn put_withdrawal_request(&self, request: WithdrawalRequest) -> StoreResult<()>;
    fn withdrawal_requests_for(&self, owner: &UserId) -> StoreResult<Vec<WithdrawalRequest>>;
    /// Atomically move a request from one of `from` into `to`, returning the
    /// updated record. `Ok(None)` when the request is missing or its status
    /// is not in `from`; concurrent claimants see exactly one winner.
    fn claim_withdrawal_request(
        &self,
        id: &WithdrawalRequestId,
        from: &[WithdrawalStatus],
        to: WithdrawalStatus,
    ) -> StoreResult<Option<WithdrawalRequest>>;

    // Payment instruments
    fn bank_account(&self, id: &BankAccountId) -> StoreResult<Option<BankAccount>>;
    fn put_bank_account(&self, account: BankAccount) -> StoreResult<()>;
    fn bank_accounts_for(&self, owner: &UserId) -> StoreResult<Vec<BankAccount>>;

    fn card(&self, id: &CardId) -> StoreResult<Option<CardDetails>>;
    fn put_card(&self, card: CardDetails) -> StoreResult<()>;
    fn cards_for(&self, owner: &UserId) -> StoreResult<Vec<CardDetails>>;
}
