//! Transaction types for Inkpay
//!
//! A transaction records a single money movement attempt against a wallet.
//! It is created `Pending`, transitions exactly once into a terminal status,
//! and is never revived afterwards.

use crate::{BankAccountId, CardId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Funds entering the wallet from outside
    Deposit,
    /// Funds leaving the wallet to an external instrument
    Withdrawal,
    /// Outbound leg of a wallet-to-wallet movement
    Transfer,
    /// Funds returned to the wallet
    Refund,
    /// Funds leaving the wallet to pay for an order
    Payment,
}

impl TransactionKind {
    /// Whether this kind debits the wallet (by the gross amount)
    pub fn debits_wallet(&self) -> bool {
        matches!(self, Self::Withdrawal | Self::Payment | Self::Transfer)
    }

    /// Whether this kind credits the wallet (by the net amount)
    pub fn credits_wallet(&self) -> bool {
        matches!(self, Self::Deposit | Self::Refund)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Refund => "refund",
            Self::Payment => "payment",
        };
        write!(f, "{}", s)
    }
}

/// Rail through which a movement is settled (simulated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Internal wallet balance
    Wallet,
    /// Bank transfer simulation
    BankTransfer,
    /// Card network simulation
    CardPayment,
    /// Cash on delivery / over the counter
    Cash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Wallet => "wallet",
            Self::BankTransfer => "bank transfer",
            Self::CardPayment => "card payment",
            Self::Cash => "cash",
        };
        write!(f, "{}", s)
    }
}

/// Status of a transaction in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Created, not yet applied to a wallet
    Pending,
    /// Being applied
    Processing,
    /// Wallet delta applied exactly once (final)
    Completed,
    /// Declined or errored; wallet untouched (final)
    Failed,
    /// Abandoned before application (final)
    Cancelled,
}

impl TransactionStatus {
    /// Check if this is a terminal state (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// An immutable-once-terminal record of a single money movement attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID
    pub id: TransactionId,
    /// Wallet owner this movement applies to
    pub owner: UserId,
    /// Kind of movement
    pub kind: TransactionKind,
    /// Settlement rail
    pub method: PaymentMethod,
    /// Current status
    pub status: TransactionStatus,
    /// Gross amount requested
    pub amount: Decimal,
    /// Fee assessed by the fee policy
    pub fee: Decimal,
    /// amount - fee
    pub net_amount: Decimal,
    /// Bank account involved, if any
    pub bank_account_id: Option<BankAccountId>,
    /// Card involved, if any
    pub card_id: Option<CardId>,
    /// Counterpart transaction (e.g. the credit leg of a transfer)
    pub related_transaction_id: Option<TransactionId>,
    /// Human-facing unique reference (TXN + timestamp + suffix)
    pub reference: String,
    /// Caller-supplied description
    pub description: Option<String>,
    /// Populated whenever the status is Failed; auditable on the record
    pub failure_reason: Option<String>,
    /// When the transaction was created
    pub created_at: DateTime<Utc>,
    /// When the transaction reached a terminal status
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Check if the transaction has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if the wallet delta was applied
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
