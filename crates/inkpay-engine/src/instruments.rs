//! Payment instrument management
//!
//! Registration and soft-deletion of bank accounts and cards. Card numbers
//! pass through the vault at registration and are persisted only as
//! ciphertext plus the last-four/brand display projection. Instruments are
//! never deleted; `is_active = false` keeps historical records resolvable.

use crate::{EngineError, EngineResult};
use inkpay_ledger::LedgerStore;
use inkpay_types::{BankAccount, BankAccountId, CardDetails, CardId, Clock, UserId};
use inkpay_vault::CardVault;
use std::sync::Arc;

/// Manages stored bank accounts and cards for wallet owners
pub struct InstrumentManager {
    store: Arc<dyn LedgerStore>,
    vault: CardVault,
    clock: Arc<dyn Clock>,
}

impl InstrumentManager {
    pub fn new(store: Arc<dyn LedgerStore>, vault: CardVault, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            vault,
            clock,
        }
    }

    /// Store a bank account for withdrawals.
    ///
    /// The owner's first active account is always the default; passing
    /// `make_default` demotes the previous default.
    pub fn register_bank_account(
        &self,
        owner: &UserId,
        bank_name: &str,
        account_holder: &str,
        account_number: &str,
        make_default: bool,
    ) -> EngineResult<BankAccount> {
        let digits =
            !account_number.is_empty() && account_number.chars().all(|c| c.is_ascii_digit());
        if !digits {
            return Err(EngineError::InvalidAccountNumber);
        }

        let existing = self.active_bank_accounts(owner)?;
        let is_default = make_default || existing.is_empty();
        if is_default {
            for mut account in existing {
                if account.is_default {
                    account.is_default = false;
                    self.store.put_bank_account(account)?;
                }
            }
        }

        let account = BankAccount {
            id: BankAccountId::new(),
            owner: owner.clone(),
            bank_name: bank_name.to_string(),
            account_holder: account_holder.to_string(),
            account_number: account_number.to_string(),
            is_active: true,
            is_default,
            created_at: self.clock.now(),
        };
        self.store.put_bank_account(account.clone())?;
        tracing::info!(owner = %owner, account = %account.id, "bank account registered");
        Ok(account)
    }

    /// Encrypt and store a card.
    ///
    /// The plaintext PAN exists only for the duration of this call; the
    /// record carries the vault blob and the last-four/brand projection.
    pub fn register_card(
        &self,
        owner: &UserId,
        holder_name: &str,
        pan: &str,
        expiry_month: u8,
        expiry_year: u16,
        make_default: bool,
    ) -> EngineResult<CardDetails> {
        let digits = pan.chars().all(|c| c.is_ascii_digit());
        if !digits || !(13..=19).contains(&pan.len()) {
            return Err(EngineError::InvalidCardNumber);
        }

        let existing = self.active_cards(owner)?;
        let is_default = make_default || existing.is_empty();
        if is_default {
            for mut card in existing {
                if card.is_default {
                    card.is_default = false;
                    self.store.put_card(card)?;
                }
            }
        }

        let encrypted_number = self.vault.encrypt(pan)?;
        let card = CardDetails {
            id: CardId::new(),
            owner: owner.clone(),
            holder_name: holder_name.to_string(),
            encrypted_number,
            last_four: inkpay_vault::last_four(pan).to_string(),
            brand: inkpay_vault::classify(pan),
            expiry_month,
            expiry_year,
            is_active: true,
            is_default,
            created_at: self.clock.now(),
            last_used_at: None,
        };
        self.store.put_card(card.clone())?;
        tracing::info!(owner = %owner, card = %card.id, brand = %card.brand, "card registered");
        Ok(card)
    }

    /// Soft-delete a bank account; the most recently added remaining active
    /// account inherits the default flag.
    pub fn deactivate_bank_account(&self, owner: &UserId, id: &BankAccountId) -> EngineResult<()> {
        let mut account = match self.store.bank_account(id)? {
            Some(a) if a.is_active && &a.owner == owner => a,
            _ => {
                return Err(EngineError::UnknownInstrument {
                    detail: format!("bank account {}", id),
                })
            }
        };
        let was_default = account.is_default;
        account.is_active = false;
        account.is_default = false;
        self.store.put_bank_account(account)?;

        if was_default {
            if let Some(mut next) = self.active_bank_accounts(owner)?.pop() {
                next.is_default = true;
                self.store.put_bank_account(next)?;
            }
        }
        tracing::info!(owner = %owner, account = %id, "bank account deactivated");
        Ok(())
    }

    /// Soft-delete a card, promoting a replacement default like
    /// [`deactivate_bank_account`](Self::deactivate_bank_account).
    pub fn deactivate_card(&self, owner: &UserId, id: &CardId) -> EngineResult<()> {
        let mut card = match self.store.card(id)? {
            Some(c) if c.is_active && &c.owner == owner => c,
            _ => {
                return Err(EngineError::UnknownInstrument {
                    detail: format!("card {}", id),
                })
            }
        };
        let was_default = card.is_default;
        card.is_active = false;
        card.is_default = false;
        self.store.put_card(card)?;

        if was_default {
            if let Some(mut next) = self.active_cards(owner)?.pop() {
                next.is_default = true;
                self.store.put_card(next)?;
            }
        }
        tracing::info!(owner = %owner, card = %id, "card deactivated");
        Ok(())
    }

    /// Active bank accounts, oldest first
    fn active_bank_accounts(&self, owner: &UserId) -> EngineResult<Vec<BankAccount>> {
        let mut accounts: Vec<_> = self
            .store
            .bank_accounts_for(owner)?
            .into_iter()
            .filter(|a| a.is_active)
            .collect();
        accounts.sort_by_key(|a| a.created_at);
        Ok(accounts)
    }

    /// Active cards, oldest first
    fn active_cards(&self, owner: &UserId) -> EngineResult<Vec<CardDetails>> {
        let mut cards: Vec<_> = self
            .store
            .cards_for(owner)?
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }
}
