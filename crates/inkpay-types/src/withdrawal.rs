//! Withdrawal request types
//!
//! A withdrawal request wraps one outbound-transfer transaction with an
//! optional human-review step. Money only moves when the request is
//! processed; approval and rejection are reviewer bookkeeping, except that
//! rejection credits the gross amount back to the wallet.

use crate::{BankAccountId, TransactionId, UserId, WithdrawalRequestId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Status of a withdrawal request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Awaiting processing or review
    Pending,
    /// Processing has started
    Processing,
    /// Reviewer approved; funds not yet moved
    Approved,
    /// Reviewer rejected; gross amount refunded (final)
    Rejected,
    /// Processed and funds moved (final)
    Completed,
    /// Processing failed; wallet untouched (final)
    Failed,
}

impl WithdrawalStatus {
    /// Check if this is a terminal state.
    ///
    /// `Approved` is deliberately not terminal: it gates fund movement but
    /// still requires processing to complete.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Failed)
    }
}

/// A withdrawal intent, reviewed and processed as a two-phase workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Unique request ID
    pub id: WithdrawalRequestId,
    /// Requesting user
    pub owner: UserId,
    /// Target bank account
    pub bank_account_id: BankAccountId,
    /// Gross amount requested
    pub amount: Decimal,
    /// Fee assessed at request time
    pub fee: Decimal,
    /// amount - fee
    pub net_amount: Decimal,
    /// Current status
    pub status: WithdrawalStatus,
    /// Transaction created when the request was processed
    pub transaction_id: Option<TransactionId>,
    /// When the request was created
    pub requested_at: DateTime<Utc>,
    /// When the request reached a reviewer/processor decision
    pub processed_at: Option<DateTime<Utc>>,
    /// Reviewer or processor identity
    pub processed_by: Option<String>,
    /// Free-form processing notes
    pub notes: Option<String>,
    /// Populated when the request is rejected
    pub rejection_reason: Option<String>,
}

impl WithdrawalRequest {
    /// Check if the request has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
