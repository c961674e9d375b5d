//! Inkpay Fee Policy
//!
//! Pure, deterministic fee computation: `(kind, method, amount) -> fee`.
//! No I/O, no side effects, no floats.
//!
//! # Fee Structure
//!
//! | Kind       | Rate  | Cap (by method)                               |
//! |------------|-------|-----------------------------------------------|
//! | Withdrawal | 2.5%  | BankTransfer 25.00, CardPayment 15.00, else 10.00 |
//! | all others | 0     | -                                             |
//!
//! Fees round half-up to the currency minor unit; `net = gross - fee`.
//! Non-positive amounts are rejected by the engine before this policy runs.

use inkpay_types::{round_minor, PaymentMethod, TransactionKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Withdrawal fee rate (2.5%)
const WITHDRAWAL_RATE: Decimal = dec!(0.025);

/// Gross/fee/net split for one movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Amount requested by the caller
    pub gross: Decimal,
    /// Fee retained by the platform
    pub fee: Decimal,
    /// gross - fee
    pub net: Decimal,
}

/// The platform fee schedule
///
/// Stateless and cheap to copy; a single schedule is shared by the engine
/// and the withdrawal workflow so both always agree on the split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule;

impl FeeSchedule {
    pub fn new() -> Self {
        Self
    }

    /// Fee cap for a withdrawal over the given rail
    pub fn fee_cap(&self, method: PaymentMethod) -> Decimal {
        match method {
            PaymentMethod::BankTransfer => dec!(25.00),
            PaymentMethod::CardPayment => dec!(15.00),
            PaymentMethod::Wallet | PaymentMethod::Cash => dec!(10.00),
        }
    }

    /// Fee for a movement; zero for every kind except Withdrawal
    pub fn fee(&self, kind: TransactionKind, method: PaymentMethod, amount: Decimal) -> Decimal {
        match kind {
            TransactionKind::Withdrawal => {
                let pct = round_minor(amount * WITHDRAWAL_RATE);
                pct.min(self.fee_cap(method))
            }
            _ => Decimal::ZERO,
        }
    }

    /// Full gross/fee/net split for a movement
    pub fn assess(
        &self,
        kind: TransactionKind,
        method: PaymentMethod,
        amount: Decimal,
    ) -> FeeBreakdown {
        let fee = self.fee(kind, method, amount);
        FeeBreakdown {
            gross: amount,
            fee,
            net: amount - fee,
        }
    }
}
