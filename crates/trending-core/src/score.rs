// crates/trending-core/src/score.rs
//
// Score codec: canonicalizes arbitrary-precision scores into the fixed
// 9-fractional-digit form used for storage and conditional comparisons.
//
// Two mathematically equal scores must be byte-identical once stored, so
// every score written by the engine passes through `quantize`. Expected
// scores supplied for exact-match conditions are NOT re-quantized: they must
// be the canonical value previously read back from the store.

use bigdecimal::{BigDecimal, RoundingMode};

/// Number of fractional digits kept in a canonical score.
pub const PRECISION_DIGITS: i64 = 9;

/// Returns `true` if `score` is below zero.
pub fn is_negative(score: &BigDecimal) -> bool {
    *score < BigDecimal::from(0)
}

/// Round `score` to 9 fractional digits (half-even) and strip insignificant
/// trailing zeros.
///
/// # Panics
///
/// Panics if `score` is negative. Scores are never negative; a negative input
/// is a programming error in the caller.
pub fn quantize(score: &BigDecimal) -> BigDecimal {
    assert!(!is_negative(score), "Score cannot be negative");
    score
        .with_scale_round(PRECISION_DIGITS, RoundingMode::HalfEven)
        .normalized()
}

/// Whether `score` is already canonical: non-negative with at most 9
/// significant fractional digits.
pub fn is_canonical(score: &BigDecimal) -> bool {
    if is_negative(score) {
        return false;
    }
    let (_, scale) = score.normalized().as_bigint_and_exponent();
    scale <= PRECISION_DIGITS
}
