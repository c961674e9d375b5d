//! Inkpay Engine - wallet transaction engine and withdrawal workflow
//!
//! The engine is the only component allowed to mutate wallet balances. It
//! creates transactions in `Pending`, applies them to wallets under a
//! per-wallet lock, and drives every record into exactly one terminal
//! status. The withdrawal workflow layers the request/review state machine
//! on top.
//!
//! # Invariants
//!
//! 1. Wallet balances never go negative
//! 2. A `Completed` transaction's wallet delta was applied exactly once
//! 3. Business declines are values with auditable reasons, not errors
//! 4. Re-processing a terminal record is an explicit error, never a second
//!    wallet delta

pub mod engine;
pub mod instruments;
pub mod notify;
pub mod withdrawal;

mod reference;

pub use engine::*;
pub use instruments::*;
pub use notify::*;
pub use withdrawal::*;

use inkpay_ledger::StoreError;
use inkpay_vault::VaultError;
use inkpay_types::{TransactionId, WithdrawalRequestId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Engine errors
///
/// Validation and idempotency violations are rejected before any mutation;
/// `Store` wraps infrastructure failures, after which no partial wallet
/// state is left behind.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid amount {amount}: must be positive")]
    InvalidAmount { amount: Decimal },

    #[error("unknown or inactive instrument: {detail}")]
    UnknownInstrument { detail: String },

    #[error("card number must be 13-19 digits")]
    InvalidCardNumber,

    #[error("account number must be digits only")]
    InvalidAccountNumber,

    #[error("transaction {id} not found")]
    TransactionNotFound { id: TransactionId },

    #[error("withdrawal request {id} not found")]
    RequestNotFound { id: WithdrawalRequestId },

    #[error("{entity} is already terminal ({status})")]
    AlreadyTerminal { entity: String, status: String },

    #[error("cannot {action} from status {from}")]
    InvalidTransition { action: &'static str, from: String },

    #[error("could not mint a unique reference after {attempts} attempts")]
    ReferenceGeneration { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

pub type EngineResult<T> = Result<T, EngineError>;
