//! Inkpay Types - Canonical domain types for the wallet & withdrawal ledger
//!
//! This crate contains all foundational types for Inkpay with zero dependencies
//! on other inkpay crates. It defines:
//!
//! - Identity types (UserId, TransactionId, WithdrawalRequestId, ...)
//! - Money helpers over exact fixed-point decimals
//! - Wallet, Transaction and WithdrawalRequest records
//! - Payment instrument records (BankAccount, CardDetails)
//! - The injected Clock abstraction
//!
//! # Architectural Invariants
//!
//! 1. Wallet balances never go negative
//! 2. A transaction transitions exactly once into a terminal status
//! 3. Instruments referenced by historical records are soft-deleted only
//! 4. All money values are exact decimals; no floats anywhere

pub mod clock;
pub mod identity;
pub mod instrument;
pub mod money;
pub mod transaction;
pub mod wallet;
pub mod withdrawal;

pub use clock::*;
pub use identity::*;
pub use instrument::*;
pub use money::*;
pub use transaction::*;
pub use wallet::*;
pub use withdrawal::*;

/// Version of the Inkpay types schema
pub const TYPES_VERSION: &str = "0.1.0";
