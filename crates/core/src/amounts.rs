//! U256 helpers for turning raw token amounts into display units.

use alloy::primitives::U256;

/// 2^64 as f64, for limb recombination.
const LIMB_BASE: f64 = 18_446_744_073_709_551_616.0;

/// 10^exp as U256.
#[inline(always)]
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Convert a U256 to the nearest f64.
#[inline(always)]
pub fn u256_to_f64(value: U256) -> f64 {
    if value <= U256::from(u128::MAX) {
        let v: u128 = value.to();
        return v as f64;
    }
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * LIMB_BASE + limb as f64)
}

/// Scale a smallest-unit amount by `10^decimals`.
///
/// The integer and fractional parts are converted separately so that
/// 8-decimal amounts keep full precision.
pub fn scale_amount(raw: U256, decimals: u8) -> f64 {
    if decimals == 0 {
        return u256_to_f64(raw);
    }
    let unit = pow10(decimals);
    let whole = raw / unit;
    let frac = raw % unit;
    u256_to_f64(whole) + u256_to_f64(frac) / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), U256::from(1u64));
        assert_eq!(pow10(8), U256::from(100_000_000u64));
        assert_eq!(pow10(18), U256::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn test_scale_btc_amount() {
        // 2.5 BTC at 8 decimals
        let raw = U256::from(250_000_000u64);
        assert_eq!(scale_amount(raw, 8), 2.5);

        // One satoshi
        assert!((scale_amount(U256::from(1u64), 8) - 1e-8).abs() < 1e-20);
        assert_eq!(scale_amount(U256::ZERO, 8), 0.0);
    }

    #[test]
    fn test_scale_18_decimals() {
        // 1500 tokens with 18 decimals overflows u64 in raw form
        let raw = U256::from(1_500u64) * pow10(18);
        assert!((scale_amount(raw, 18) - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_large_values() {
        let big = U256::from(u128::MAX) * U256::from(4u64);
        let expected = u128::MAX as f64 * 4.0;
        assert!((u256_to_f64(big) / expected - 1.0).abs() < 1e-12);
    }
}
