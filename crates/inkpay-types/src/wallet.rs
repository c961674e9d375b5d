//! Wallet record
//!
//! One wallet per user, holding the platform-internal balance. Wallets are
//! created lazily on first access, mutated only by the transaction engine,
//! and deactivated rather than deleted.

use crate::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's internal, platform-held monetary balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning user
    pub owner: UserId,
    /// Current balance; invariant: never negative
    pub balance: Decimal,
    /// Inactive wallets refuse all money movement
    pub is_active: bool,
    /// When the wallet was created
    pub created_at: DateTime<Utc>,
    /// When the wallet last had a transaction applied
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// Create a fresh, empty, active wallet
    pub fn new(owner: UserId, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            balance: Decimal::ZERO,
            is_active: true,
            created_at: now,
            last_transaction_at: None,
        }
    }

    /// Whether a debit of `amount` would keep the balance non-negative
    pub fn can_debit(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_wallet_is_empty_and_active() {
        let wallet = Wallet::new(UserId::new(), Utc::now());
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert!(wallet.is_active);
        assert!(wallet.last_transaction_at.is_none());
    }

    #[test]
    fn test_can_debit_boundary() {
        let mut wallet = Wallet::new(UserId::new(), Utc::now());
        wallet.balance = dec!(50);
        assert!(wallet.can_debit(dec!(50)));
        assert!(!wallet.can_debit(dec!(50.01)));
    }
}
