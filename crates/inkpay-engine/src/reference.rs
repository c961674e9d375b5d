//! Transaction reference minting
//!
//! References are human-facing and globally unique:
//! `TXN` + 14-digit timestamp (yyyymmddhhmmss) + 4-digit random suffix.
//! Uniqueness is enforced against the store, regenerating on collision,
//! rather than trusting the random suffix alone.

use crate::{EngineError, EngineResult};
use inkpay_ledger::StoreResult;
use inkpay_types::Clock;
use rand::Rng;

const MAX_ATTEMPTS: u32 = 16;

/// Mint a reference that `in_use` reports as free.
pub(crate) fn mint_reference<F>(clock: &dyn Clock, in_use: F) -> EngineResult<String>
where
    F: Fn(&str) -> StoreResult<bool>,
{
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ATTEMPTS {
        let stamp = clock.now().format("%Y%m%d%H%M%S");
        let suffix: u16 = rng.gen_range(0..10_000);
        let reference = format!("TXN{}{:04}", stamp, suffix);
        if !in_use(&reference)? {
            return Ok(reference);
        }
    }
    Err(EngineError::ReferenceGeneration {
        attempts: MAX_ATTEMPTS,
    })
}
