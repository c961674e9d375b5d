//! Notification boundary
//!
//! Notifications (email/SMS) go out after a record reaches a terminal
//! state. They are best-effort: a failing notifier is logged by the engine
//! and never rolls back or fails the financial operation. The engine always
//! invokes the notifier outside the wallet lock.

use inkpay_types::{TransactionKind, UserId, WithdrawalRequestId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Terminal-state events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    TransactionCompleted {
        owner: UserId,
        reference: String,
        kind: TransactionKind,
        amount: Decimal,
    },
    TransactionFailed {
        owner: UserId,
        reference: String,
        kind: TransactionKind,
        reason: String,
    },
    WithdrawalCompleted {
        owner: UserId,
        request_id: WithdrawalRequestId,
        amount: Decimal,
    },
    WithdrawalFailed {
        owner: UserId,
        request_id: WithdrawalRequestId,
        reason: String,
    },
    WithdrawalRejected {
        owner: UserId,
        request_id: WithdrawalRequestId,
        reason: String,
    },
}

/// Notification delivery failure
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification collaborator
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LedgerEvent) -> Result<(), NotifyError>;
}

/// Notifier that drops every event (tests, headless deployments)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &LedgerEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}
