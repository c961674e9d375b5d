//! Money helpers over exact fixed-point decimals
//!
//! Inkpay stores all money values as `rust_decimal::Decimal` with two
//! minor-unit digits. Floats are never used in fee or balance arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of minor-unit digits for the platform currency
pub const MINOR_UNIT_DP: u32 = 2;

/// Round a money value to the currency's minor unit, half-up.
///
/// Half-up (midpoint away from zero) keeps fee rounding neutral across
/// callers instead of systematically under- or over-charging.
pub fn round_minor(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Check that an amount is a positive money value.
pub fn is_positive_amount(value: Decimal) -> bool {
    value > Decimal::ZERO
}
