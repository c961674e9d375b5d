//! Payment instrument records
//!
//! Bank accounts and cards are owned by a user and soft-deleted via
//! `is_active = false` so historical transactions and withdrawal requests
//! keep a resolvable reference. Card records never hold the plaintext PAN;
//! only the vault ciphertext plus a last-four/brand display projection.

use crate::{BankAccountId, CardId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card brand derived from the leading digit of the PAN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    MasterCard,
    AmericanExpress,
    Discover,
    Other,
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Visa => "Visa",
            Self::MasterCard => "MasterCard",
            Self::AmericanExpress => "American Express",
            Self::Discover => "Discover",
            Self::Other => "Other",
        };
        write!(f, "{}", s)
    }
}

/// A stored external bank account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique account ID
    pub id: BankAccountId,
    /// Owning user
    pub owner: UserId,
    /// Display name of the bank
    pub bank_name: String,
    /// Name on the account
    pub account_holder: String,
    /// Account number (simulated rail; not a card PAN)
    pub account_number: String,
    /// Soft-delete flag
    pub is_active: bool,
    /// Preferred account for withdrawals
    pub is_default: bool,
    /// When the account was stored
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    /// Last four characters of the account number, for display.
    /// Shorter numbers are returned whole.
    pub fn masked_suffix(&self) -> &str {
        let chars = self.account_number.chars().count();
        match self
            .account_number
            .char_indices()
            .nth(chars.saturating_sub(4))
        {
            Some((idx, _)) => &self.account_number[idx..],
            None => &self.account_number,
        }
    }
}

/// A stored card, with the PAN held only as vault ciphertext
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    /// Unique card ID
    pub id: CardId,
    /// Owning user
    pub owner: UserId,
    /// Name on the card
    pub holder_name: String,
    /// Vault ciphertext of the full PAN; never plaintext
    pub encrypted_number: String,
    /// Display projection: last four characters of the PAN
    pub last_four: String,
    /// Display projection: brand from the IIN prefix
    pub brand: CardBrand,
    /// Expiry month (1-12)
    pub expiry_month: u8,
    /// Expiry year (four digits)
    pub expiry_year: u16,
    /// Soft-delete flag
    pub is_active: bool,
    /// Preferred card for payments
    pub is_default: bool,
    /// When the card was stored
    pub created_at: DateTime<Utc>,
    /// When the card was last charged
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CardDetails {
    /// Display label, e.g. "Visa •••• 4242"
    pub fn display_label(&self) -> String {
        format!("{} \u{2022}\u{2022}\u{2022}\u{2022} {}", self.brand, self.last_four)
    }
}
