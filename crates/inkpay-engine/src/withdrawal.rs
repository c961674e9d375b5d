//! Withdrawal workflow
//!
//! Wraps one outbound-transfer transaction with a request record and an
//! optional human-review step:
//!
//! ```text
//! Pending ──process──▶ Processing ──▶ Completed | Failed
//!    │                     │
//!    ├──approve──▶ Approved┤  (gate only; still needs processing)
//!    └──reject────▶ Rejected  (refunds the gross amount, once)
//! ```
//!
//! Rejection credits the **gross** amount back: the fee was never actually
//! collected because the withdrawal transaction never completed.
//!
//! Every transition out of a reviewable state is an atomic claim on the
//! store, so concurrent processors or reviewers racing on one request get
//! exactly one winner; the losers receive a typed refusal.

use crate::{ApplyOutcome, DeclineReason, EngineError, EngineResult, LedgerEvent, TransactionEngine};
use inkpay_types::{
    BankAccountId, PaymentMethod, TransactionKind, UserId, WithdrawalRequest, WithdrawalRequestId,
    WithdrawalStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Orchestrates withdrawal requests on top of the transaction engine
pub struct WithdrawalWorkflow {
    engine: Arc<TransactionEngine>,
}

impl WithdrawalWorkflow {
    pub fn new(engine: Arc<TransactionEngine>) -> Self {
        Self { engine }
    }

    /// Create a `Pending` withdrawal request with the same fee schedule a
    /// withdrawal transaction would carry.
    pub fn create_request(
        &self,
        owner: &UserId,
        bank_account_id: &BankAccountId,
        amount: Decimal,
    ) -> EngineResult<WithdrawalRequest> {
        if !inkpay_types::is_positive_amount(amount) {
            return Err(EngineError::InvalidAmount { amount });
        }
        self.engine.require_active_bank_account(owner, bank_account_id)?;

        let split = self.engine.fees.assess(
            TransactionKind::Withdrawal,
            PaymentMethod::BankTransfer,
            amount,
        );
        let request = WithdrawalRequest {
            id: WithdrawalRequestId::new(),
            owner: owner.clone(),
            bank_account_id: bank_account_id.clone(),
            amount: split.gross,
            fee: split.fee,
            net_amount: split.net,
            status: WithdrawalStatus::Pending,
            transaction_id: None,
            requested_at: self.engine.clock.now(),
            processed_at: None,
            processed_by: None,
            notes: None,
            rejection_reason: None,
        };
        self.engine.store.put_withdrawal_request(request.clone())?;
        tracing::info!(request = %request.id, owner = %owner, amount = %amount, "withdrawal requested");
        Ok(request)
    }

    /// Drive a request to `Completed` or `Failed` by creating and applying
    /// a withdrawal transaction for the gross amount.
    ///
    /// Processing an already-terminal request is an explicit error; no
    /// second transaction is created and no funds move again.
    pub fn process(&self, id: &WithdrawalRequestId, processor: &str) -> EngineResult<ApplyOutcome> {
        // Atomic claim: of any number of concurrent processors, exactly one
        // wins the transition into Processing. A request that is already
        // Processing belongs to another processor and is refused.
        let mut request = match self.engine.store.claim_withdrawal_request(
            id,
            &[WithdrawalStatus::Pending, WithdrawalStatus::Approved],
            WithdrawalStatus::Processing,
        )? {
            Some(r) => r,
            None => return Err(self.transition_refused(id, "process")),
        };

        // Masked suffix for the transaction description; soft-deleted
        // accounts keep their identity, so this resolves for old requests too
        let suffix = self
            .engine
            .store
            .bank_account(&request.bank_account_id)?
            .map(|a| a.masked_suffix().to_string())
            .unwrap_or_else(|| "****".to_string());
        let description = format!("Withdrawal to bank account ending in {}", suffix);

        let transaction = match self.engine.create_transaction(
            &request.owner,
            TransactionKind::Withdrawal,
            PaymentMethod::BankTransfer,
            request.amount,
            Some(description),
            Some(request.bank_account_id.clone()),
            None,
        ) {
            Ok(t) => t,
            Err(EngineError::UnknownInstrument { detail }) => {
                let reason = DeclineReason::InstrumentUnavailable { detail };
                return self.fail_request(&mut request, reason, processor);
            }
            Err(err) => return Err(err),
        };

        match self.engine.apply_to_wallet(&transaction.id)? {
            ApplyOutcome::Applied { new_balance } => {
                let now = self.engine.clock.now();
                request.status = WithdrawalStatus::Completed;
                request.transaction_id = Some(transaction.id.clone());
                request.processed_at = Some(now);
                request.processed_by = Some(processor.to_string());
                self.engine.store.put_withdrawal_request(request.clone())?;
                tracing::info!(request = %request.id, balance = %new_balance, "withdrawal completed");
                self.engine.emit(LedgerEvent::WithdrawalCompleted {
                    owner: request.owner.clone(),
                    request_id: request.id.clone(),
                    amount: request.amount,
                });
                Ok(ApplyOutcome::Applied { new_balance })
            }
            ApplyOutcome::Declined { reason } => self.fail_request(&mut request, reason, processor),
        }
    }

    /// Reviewer approval: marks the request `Approved` without moving money.
    /// Fund movement still requires [`process`](Self::process).
    pub fn approve(&self, id: &WithdrawalRequestId, reviewer: &str) -> EngineResult<WithdrawalRequest> {
        let mut request = match self.engine.store.claim_withdrawal_request(
            id,
            &[WithdrawalStatus::Pending],
            WithdrawalStatus::Approved,
        )? {
            Some(r) => r,
            None => return Err(self.transition_refused(id, "approve")),
        };

        request.processed_by = Some(reviewer.to_string());
        request.processed_at = Some(self.engine.clock.now());
        self.engine.store.put_withdrawal_request(request.clone())?;
        tracing::info!(request = %request.id, reviewer, "withdrawal approved");
        Ok(request)
    }

    /// Reviewer rejection: refunds the full gross amount to the wallet and
    /// marks the request `Rejected`.
    ///
    /// Idempotent by refusal: a terminal request (including an already
    /// rejected one) returns `AlreadyTerminal` rather than refunding twice.
    pub fn reject(
        &self,
        id: &WithdrawalRequestId,
        reviewer: &str,
        reason: &str,
    ) -> EngineResult<WithdrawalRequest> {
        // Claim the terminal state first: of two concurrent rejections only
        // one wins, so the refund below is issued at most once.
        let mut request = match self.engine.store.claim_withdrawal_request(
            id,
            &[WithdrawalStatus::Pending, WithdrawalStatus::Processing],
            WithdrawalStatus::Rejected,
        )? {
            Some(r) => r,
            None => return Err(self.transition_refused(id, "reject")),
        };

        // Refund the gross amount as a zero-fee Refund transaction; the
        // wallet lock is taken inside apply_to_wallet for the credit
        let refund = self.engine.create_transaction(
            &request.owner,
            TransactionKind::Refund,
            PaymentMethod::Wallet,
            request.amount,
            Some(format!("Refund for rejected withdrawal {}", request.id)),
            None,
            None,
        )?;
        let refund_outcome = self.engine.apply_to_wallet(&refund.id)?;

        let now = self.engine.clock.now();
        request.rejection_reason = Some(reason.to_string());
        request.processed_by = Some(reviewer.to_string());
        request.processed_at = Some(now);
        if let ApplyOutcome::Declined { reason: decline } = &refund_outcome {
            // Wallet gone or inactive; the rejection stands but the refund
            // could not be applied, which must stay visible on the record
            request.notes = Some(format!("refund not applied: {}", decline));
        }
        self.engine.store.put_withdrawal_request(request.clone())?;
        tracing::info!(request = %request.id, reviewer, reason, "withdrawal rejected");
        self.engine.emit(LedgerEvent::WithdrawalRejected {
            owner: request.owner.clone(),
            request_id: request.id.clone(),
            reason: reason.to_string(),
        });
        Ok(request)
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn load(&self, id: &WithdrawalRequestId) -> EngineResult<WithdrawalRequest> {
        self.engine
            .store
            .withdrawal_request(id)?
            .ok_or_else(|| EngineError::RequestNotFound { id: id.clone() })
    }

    /// Map a lost status claim onto the matching typed error.
    fn transition_refused(&self, id: &WithdrawalRequestId, action: &'static str) -> EngineError {
        match self.load(id) {
            Ok(request) if request.is_terminal() => EngineError::AlreadyTerminal {
                entity: format!("withdrawal request {}", request.id),
                status: format!("{:?}", request.status),
            },
            Ok(request) => EngineError::InvalidTransition {
                action,
                from: format!("{:?}", request.status),
            },
            Err(err) => err,
        }
    }

    fn fail_request(
        &self,
        request: &mut WithdrawalRequest,
        reason: DeclineReason,
        processor: &str,
    ) -> EngineResult<ApplyOutcome> {
        request.status = WithdrawalStatus::Failed;
        request.notes = Some(reason.to_string());
        request.processed_at = Some(self.engine.clock.now());
        request.processed_by = Some(processor.to_string());
        self.engine.store.put_withdrawal_request(request.clone())?;
        tracing::warn!(request = %request.id, %reason, "withdrawal failed");
        self.engine.emit(LedgerEvent::WithdrawalFailed {
            owner: request.owner.clone(),
            request_id: request.id.clone(),
            reason: reason.to_string(),
        });
        Ok(ApplyOutcome::Declined { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopNotifier;
    use chrono::Utc;
    use inkpay_ledger::{LedgerStore, MemoryStore};
    use inkpay_types::{BankAccount, PaymentMethod, SystemClock, TransactionStatus};
    use rust_decimal_macros::dec;

    struct Fixture {
        workflow: WithdrawalWorkflow,
        engine: Arc<TransactionEngine>,
        store: Arc<MemoryStore>,
        owner: UserId,
        account: BankAccountId,
    }

    fn fixture(balance: Decimal) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(TransactionEngine::new(
            store.clone(),
            Arc::new(SystemClock),
            Arc::new(NoopNotifier),
        ));
        let owner = UserId::new();
        if balance > Decimal::ZERO {
            let (_, outcome) = engine
                .deposit(&owner, PaymentMethod::Wallet, balance, None)
                .unwrap();
            assert!(outcome.is_applied());
        }

        let account = BankAccount {
            id: BankAccountId::new(),
            owner: owner.clone(),
            bank_name: "First National".to_string(),
            account_holder: "A Reader".to_string(),
            account_number: "12345678".to_string(),
            is_active: true,
            is_default: true,
            created_at: Utc::now(),
        };
        let account_id = account.id.clone();
        store.put_bank_account(account).unwrap();

        Fixture {
            workflow: WithdrawalWorkflow::new(engine.clone()),
            engine,
            store,
            owner,
            account: account_id,
        }
    }

    #[test]
    fn test_create_request_carries_fee_split() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100.00))
            .unwrap();
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert_eq!(request.fee, dec!(2.50));
        assert_eq!(request.net_amount, dec!(97.50));
        assert_eq!(request.fee + request.net_amount, request.amount);
    }

    #[test]
    fn test_create_request_rejects_foreign_account() {
        let f = fixture(dec!(200));
        let stranger = UserId::new();
        let result = f.workflow.create_request(&stranger, &f.account, dec!(50));
        assert!(matches!(result, Err(EngineError::UnknownInstrument { .. })));
    }

    #[test]
    fn test_process_debits_gross_and_links_transaction() {
        let f = fixture(dec!(200.00));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100.00))
            .unwrap();

        let outcome = f.workflow.process(&request.id, "ops").unwrap();
        assert_eq!(outcome, ApplyOutcome::Applied { new_balance: dec!(100.00) });

        let stored = f.store.withdrawal_request(&request.id).unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Completed);
        assert_eq!(stored.processed_by.as_deref(), Some("ops"));
        assert!(stored.processed_at.is_some());

        // Linked transaction matches the request amount; the fee stays an
        // internal split, the wallet lost exactly the gross amount
        let txn_id = stored.transaction_id.unwrap();
        let txn = f.store.transaction(&txn_id).unwrap().unwrap();
        assert_eq!(txn.amount, stored.amount);
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert!(txn
            .description
            .as_deref()
            .unwrap()
            .contains("ending in 5678"));
    }

    #[test]
    fn test_process_insufficient_balance_fails_request() {
        let f = fixture(dec!(50.00));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100.00))
            .unwrap();

        let outcome = f.workflow.process(&request.id, "ops").unwrap();
        assert!(!outcome.is_applied());

        let stored = f.store.withdrawal_request(&request.id).unwrap().unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Failed);
        assert!(stored.notes.unwrap().contains("insufficient balance"));
        assert!(stored.transaction_id.is_none());
        // Wallet untouched
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(50.00));
    }

    #[test]
    fn test_process_twice_is_already_terminal() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();
        f.workflow.process(&request.id, "ops").unwrap();

        let before = f.store.wallet(&f.owner).unwrap().unwrap().balance;
        let count_before = f.store.transactions_for(&f.owner).unwrap().len();

        let result = f.workflow.process(&request.id, "ops");
        assert!(matches!(result, Err(EngineError::AlreadyTerminal { .. })));

        // No second transaction, no second debit
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, before);
        assert_eq!(f.store.transactions_for(&f.owner).unwrap().len(), count_before);
    }

    #[test]
    fn test_concurrent_processing_debits_once() {
        use std::sync::Barrier;

        let f = fixture(dec!(200.00));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100.00))
            .unwrap();

        let workflow = Arc::new(WithdrawalWorkflow::new(f.engine.clone()));
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let workflow = Arc::clone(&workflow);
                let id = request.id.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    workflow.process(&id, "ops")
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let applied = results
            .iter()
            .filter(|r| matches!(r, Ok(o) if o.is_applied()))
            .count();
        assert_eq!(applied, 1);

        // One debit transaction, one 100.00 delta
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(100.00));
        let debits = f
            .store
            .transactions_for(&f.owner)
            .unwrap()
            .iter()
            .filter(|t| t.kind == TransactionKind::Withdrawal)
            .count();
        assert_eq!(debits, 1);
    }

    #[test]
    fn test_concurrent_rejection_refunds_once() {
        use std::sync::Barrier;

        let f = fixture(dec!(200.00));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(75.00))
            .unwrap();

        let workflow = Arc::new(WithdrawalWorkflow::new(f.engine.clone()));
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let workflow = Arc::clone(&workflow);
                let id = request.id.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    workflow.reject(&id, "reviewer", "mismatch")
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        // Exactly one 75.00 refund landed
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(275.00));
    }

    #[test]
    fn test_process_refuses_request_owned_by_another_processor() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();
        let claimed = f
            .store
            .claim_withdrawal_request(
                &request.id,
                &[WithdrawalStatus::Pending],
                WithdrawalStatus::Processing,
            )
            .unwrap();
        assert!(claimed.is_some());

        let result = f.workflow.process(&request.id, "ops");
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(200));
    }

    #[test]
    fn test_approve_gates_without_moving_money() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();

        let approved = f.workflow.approve(&request.id, "reviewer").unwrap();
        assert_eq!(approved.status, WithdrawalStatus::Approved);
        assert_eq!(approved.processed_by.as_deref(), Some("reviewer"));
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(200));

        // Approved requests can still be processed to completion
        let outcome = f.workflow.process(&request.id, "ops").unwrap();
        assert!(outcome.is_applied());
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(100));
    }

    #[test]
    fn test_approve_only_legal_from_pending() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();
        f.workflow.approve(&request.id, "reviewer").unwrap();

        let result = f.workflow.approve(&request.id, "reviewer");
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reject_refunds_gross_exactly_once() {
        let f = fixture(dec!(200.00));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100.00))
            .unwrap();

        let rejected = f
            .workflow
            .reject(&request.id, "reviewer", "account mismatch")
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("account mismatch"));
        // Full gross amount credited back, fee bypassed
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(300.00));

        // Second rejection refuses instead of double-refunding
        let again = f.workflow.reject(&request.id, "reviewer", "again");
        assert!(matches!(again, Err(EngineError::AlreadyTerminal { .. })));
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(300.00));
    }

    #[test]
    fn test_reject_not_legal_from_approved() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();
        f.workflow.approve(&request.id, "reviewer").unwrap();

        let result = f.workflow.reject(&request.id, "reviewer", "no");
        assert!(matches!(result, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn test_reject_after_completion_refuses() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(100))
            .unwrap();
        f.workflow.process(&request.id, "ops").unwrap();

        let result = f.workflow.reject(&request.id, "reviewer", "too late");
        assert!(matches!(result, Err(EngineError::AlreadyTerminal { .. })));
        assert_eq!(f.store.wallet(&f.owner).unwrap().unwrap().balance, dec!(100));
    }

    #[test]
    fn test_terminal_requests_keep_fee_net_invariant() {
        let f = fixture(dec!(200));
        let request = f
            .workflow
            .create_request(&f.owner, &f.account, dec!(123.45))
            .unwrap();
        f.workflow.process(&request.id, "ops").unwrap();

        let stored = f.store.withdrawal_request(&request.id).unwrap().unwrap();
        assert!(stored.is_terminal());
        assert_eq!(stored.fee + stored.net_amount, stored.amount);
        let txn = f
            .store
            .transaction(&stored.transaction_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(txn.amount, stored.amount);
        assert_eq!(stored.fee, f.engine.fees().fee(
            TransactionKind::Withdrawal,
            PaymentMethod::BankTransfer,
            dec!(123.45),
        ));
    }
}
