//! In-memory reference implementation of the ledger store
//!
//! Backed by `dashmap` so independent entities never contend. Suitable for
//! tests and single-process deployments; a relational implementation plugs
//! in behind the same trait.

use crate::{LedgerStore, StoreResult};
use dashmap::{DashMap, DashSet};
use inkpay_types::{
    BankAccount, BankAccountId, CardDetails, CardId, Transaction, TransactionId, UserId, Wallet,
    WithdrawalRequest, WithdrawalRequestId, WithdrawalStatus,
};

/// Thread-safe in-memory store
#[derive(Default)]
pub struct MemoryStore {
    wallets: DashMap<UserId, Wallet>,
    transactions: DashMap<TransactionId, Transaction>,
    references: DashSet<String>,
    withdrawal_requests: DashMap<WithdrawalRequestId, WithdrawalRequest>,
    bank_accounts: DashMap<BankAccountId, BankAccount>,
    cards: DashMap<CardId, CardDetails>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn wallet(&self, owner: &UserId) -> StoreResult<Option<Wallet>> {
        Ok(self.wallets.get(owner).map(|w| w.value().clone()))
    }

    fn put_wallet(&self, wallet: Wallet) -> StoreResult<()> {
        self.wallets.insert(wallet.owner.clone(), wallet);
        Ok(())
    }

    fn transaction(&self, id: &TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.transactions.get(id).map(|t| t.value().clone()))
    }

    fn put_transaction(&self, transaction: Transaction) -> StoreResult<()> {
        self.references.insert(transaction.reference.clone());
        self.transactions.insert(transaction.id.clone(), transaction);
        Ok(())
    }

    fn transactions_for(&self, owner: &UserId) -> StoreResult<Vec<Transaction>> {
        let mut out: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }

    fn reference_in_use(&self, reference: &str) -> StoreResult<bool> {
        Ok(self.references.contains(reference))
    }

    fn withdrawal_request(
        &self,
        id: &WithdrawalRequestId,
    ) -> StoreResult<Option<WithdrawalRequest>> {
        Ok(self.withdrawal_requests.get(id).map(|r| r.value().clone()))
    }

    fn put_withdrawal_request(&self, request: WithdrawalRequest) -> StoreResult<()> {
        self.withdrawal_requests.insert(request.id.clone(), request);
        Ok(())
    }

    fn claim_withdrawal_request(
        &self,
        id: &WithdrawalRequestId,
        from: &[WithdrawalStatus],
        to: WithdrawalStatus,
    ) -> StoreResult<Option<WithdrawalRequest>> {
        // get_mut holds the shard write lock, making check-and-set atomic
        if let Some(mut entry) = self.withdrawal_requests.get_mut(id) {
            if from.contains(&entry.status) {
                entry.status = to;
                return Ok(Some(entry.value().clone()));
            }
        }
        Ok(None)
    }

    fn withdrawal_requests_for(&self, owner: &UserId) -> StoreResult<Vec<WithdrawalRequest>> {
        let mut out: Vec<WithdrawalRequest> = self
            .withdrawal_requests
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|r| r.requested_at);
        Ok(out)
    }

    fn bank_account(&self, id: &BankAccountId) -> StoreResult<Option<BankAccount>> {
        Ok(self.bank_accounts.get(id).map(|a| a.value().clone()))
    }

    fn put_bank_account(&self, account: BankAccount) -> StoreResult<()> {
        self.bank_accounts.insert(account.id.clone(), account);
        Ok(())
    }

    fn bank_accounts_for(&self, owner: &UserId) -> StoreResult<Vec<BankAccount>> {
        Ok(self
            .bank_accounts
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn card(&self, id: &CardId) -> StoreResult<Option<CardDetails>> {
        Ok(self.cards.get(id).map(|c| c.value().clone()))
    }

    fn put_card(&self, card: CardDetails) -> StoreResult<()> {
        self.cards.insert(card.id.clone(), card);
        Ok(())
    }

    fn cards_for(&self, owner: &UserId) -> StoreResult<Vec<CardDetails>> {
        Ok(self
            .cards
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn wallet(owner: &UserId, balance: Decimal) -> Wallet {
        let mut w = Wallet::new(owner.clone(), Utc::now());
        w.balance = balance;
        w
    }

    #[test]
    fn test_wallet_round_trip() {
        let store = MemoryStore::new();
        let owner = UserId::new();

        assert!(store.wallet(&owner).unwrap().is_none());

        store.put_wallet(wallet(&owner, dec!(100))).unwrap();
        let loaded = store.wallet(&owner).unwrap().unwrap();
        assert_eq!(loaded.balance, dec!(100));

        // Put replaces the record wholesale
        store.put_wallet(wallet(&owner, dec!(75))).unwrap();
        assert_eq!(store.wallet(&owner).unwrap().unwrap().balance, dec!(75));
    }

    #[test]
    fn test_reference_index_tracks_puts() {
        let store = MemoryStore::new();
        assert!(!store.reference_in_use("TXN202601021530450042").unwrap());

        let owner = UserId::new();
        let txn = Transaction {
            id: TransactionId::new(),
            owner: owner.clone(),
            kind: inkpay_types::TransactionKind::Deposit,
            method: inkpay_types::PaymentMethod::Wallet,
            status: inkpay_types::TransactionStatus::Pending,
            amount: dec!(10),
            fee: Decimal::ZERO,
            net_amount: dec!(10),
            bank_account_id: None,
            card_id: None,
            related_transaction_id: None,
            reference: "TXN202601021530450042".to_string(),
            description: None,
            failure_reason: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        store.put_transaction(txn).unwrap();
        assert!(store.reference_in_use("TXN202601021530450042").unwrap());
    }

    #[test]
    fn test_claim_withdrawal_request_has_one_winner() {
        let store = MemoryStore::new();
        let request = WithdrawalRequest {
            id: WithdrawalRequestId::new(),
            owner: UserId::new(),
            bank_account_id: BankAccountId::new(),
            amount: dec!(100),
            fee: dec!(2.50),
            net_amount: dec!(97.50),
            status: WithdrawalStatus::Pending,
            transaction_id: None,
            requested_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            notes: None,
            rejection_reason: None,
        };
        store.put_withdrawal_request(request.clone()).unwrap();

        let first = store
            .claim_withdrawal_request(
                &request.id,
                &[WithdrawalStatus::Pending],
                WithdrawalStatus::Processing,
            )
            .unwrap();
        assert_eq!(first.unwrap().status, WithdrawalStatus::Processing);

        // A second claimant from Pending loses
        let second = store
            .claim_withdrawal_request(
                &request.id,
                &[WithdrawalStatus::Pending],
                WithdrawalStatus::Processing,
            )
            .unwrap();
        assert!(second.is_none());

        // Unknown ids never claim
        let missing = store
            .claim_withdrawal_request(
                &WithdrawalRequestId::new(),
                &[WithdrawalStatus::Pending],
                WithdrawalStatus::Processing,
            )
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_query_by_owner_filters() {
        let store = MemoryStore::new();
        let alice = UserId::new();
        let bob = UserId::new();

        for owner in [&alice, &alice, &bob] {
            let account = BankAccount {
                id: BankAccountId::new(),
                owner: owner.clone(),
                bank_name: "First National".to_string(),
                account_holder: "Holder".to_string(),
                account_number: "12345678".to_string(),
                is_active: true,
                is_default: false,
                created_at: Utc::now(),
            };
            store.put_bank_account(account).unwrap();
        }

        assert_eq!(store.bank_accounts_for(&alice).unwrap().len(), 2);
        assert_eq!(store.bank_accounts_for(&bob).unwrap().len(), 1);
        assert_eq!(store.bank_accounts_for(&UserId::new()).unwrap().len(), 0);
    }
}
