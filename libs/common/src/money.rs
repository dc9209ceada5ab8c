//! Fixed-point helpers for hours and currency
//!
//! Amounts are persisted as `f64` but every arithmetic step goes through
//! `Decimal` so that sums of rounded parts stay exact.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for hours and money
pub const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round a decimal to two places, midpoint away from zero
#[inline]
pub fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_decimal(value).to_f64().unwrap_or_default()
}

/// Round an f64 to two decimal places
#[inline]
pub fn round2(value: f64) -> f64 {
    to_f64(to_decimal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_midpoint_goes_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(37.5), 37.5);
        assert_eq!(round2(8.333333), 8.33);
    }

    #[test]
    fn test_decimal_sums_stay_exact() {
        let parts = [0.1, 0.2, 0.3];
        let sum: Decimal = parts.iter().map(|p| to_decimal(*p)).sum();
        assert_eq!(to_f64(sum), 0.6);
    }
}
